use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ::config::{Config, Environment, File, FileFormat};
use drphil_core::math::parse_percent;
use drphil_core::{Credential, Weight};
use serde::Deserialize;
use strategy::rules::{AccountLists, ReputationFloor, VotingMode, VotingRules};

pub const DEFAULT_CONFIG_PATH: &str = "drphil.yml";
const ENV_PREFIX: &str = "DRPHIL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config Build Error: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("Not found: {path} ({source})")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("No voters configured")]
    NoVoters,
    #[error("Voter entry for {0} has no credential")]
    MalformedVoter(String),
    #[error("Invalid {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
pub enum ExecutionMode {
    #[default]
    Simulation, // 🛡️ votes are logged, never broadcast
    Live,
}

/// A YAML scalar that may arrive as a number or as text (`"100.0 %"`).
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    fn text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    fn hundredths(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some((n * 100.0).round() as i64),
            Self::Text(s) => parse_percent(s),
        }
    }
}

/// A list setting: a path to a file of tokens, an inline whitespace
/// separated string, or a YAML sequence.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ListSource {
    Entries(Vec<String>),
    Text(String),
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawVotingRules {
    pub mode: Option<String>,
    pub vote_weight: Option<Scalar>,
    pub favorites_vote_weight: Option<Scalar>,
    pub following_vote_weight: Option<Scalar>,
    pub followers_vote_weight: Option<Scalar>,
    #[serde(default)]
    pub enable_comments: bool,
    #[serde(default)]
    pub only_first_posts: bool,
    #[serde(default)]
    pub only_fully_powered_up: bool,
    #[serde(default)]
    pub min_wait: u64,
    #[serde(default)]
    pub max_wait: u64,
    pub min_rep: Option<Scalar>,
    pub max_rep: Option<Scalar>,
    pub min_voting_power: Option<Scalar>,
    pub unique_author: Option<u64>,
    pub max_votes_per_post: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainOptions {
    pub url: String,
}

/// Redis relay publishing comment operations.
#[derive(Debug, Deserialize, Clone)]
pub struct RelayOptions {
    pub url: String,
    #[serde(default = "default_relay_channel")]
    pub channel: String,
}

fn default_relay_channel() -> String {
    drphil_core::constants::DEFAULT_RELAY_CHANNEL.to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DrphilConfig {
    #[serde(default)]
    pub voting_rules: RawVotingRules,
    pub voters: Option<ListSource>,
    pub favorite_accounts: Option<ListSource>,
    pub skip_accounts: Option<ListSource>,
    pub skip_tags: Option<ListSource>,
    pub only_tags: Option<ListSource>,
    pub skip_apps: Option<ListSource>,
    pub only_apps: Option<ListSource>,
    pub flag_signals: Option<ListSource>,
    pub vote_signals: Option<ListSource>,
    pub chain_options: ChainOptions,
    pub meeseeker_options: Option<RelayOptions>,
    pub signer_url: Option<String>,
    #[serde(default)]
    pub execution_mode: ExecutionMode,
    pub metrics_port: Option<u16>,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl DrphilConfig {
    /// YAML file at `path`, overridden by `DRPHIL__SECTION__KEY` variables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml).required(true))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Validates configuration values at startup (Fail Fast)
    pub fn validate(&self) -> Result<(), ConfigError> {
        let credentials = self.credentials()?;
        if credentials.is_empty() {
            return Err(ConfigError::NoVoters);
        }

        self.to_rules()?;
        if self.voting_rules.min_wait > self.voting_rules.max_wait {
            return Err(ConfigError::Invalid {
                key: "min_wait",
                value: format!("{} is above max_wait {}", self.voting_rules.min_wait, self.voting_rules.max_wait),
            });
        }

        if !self.chain_options.url.starts_with("http") {
            return Err(ConfigError::Invalid {
                key: "chain_options.url",
                value: format!("must start with http/https. Got: {}", self.chain_options.url),
            });
        }
        if let Some(relay) = &self.meeseeker_options {
            if !relay.url.starts_with("redis://") {
                return Err(ConfigError::Invalid {
                    key: "meeseeker_options.url",
                    value: format!("must start with redis://. Got: {}", relay.url),
                });
            }
        }

        if self.execution_mode == ExecutionMode::Live {
            match self.signer_url.as_deref() {
                Some(url) if url.starts_with("http") => {}
                other => {
                    return Err(ConfigError::Invalid {
                        key: "signer_url",
                        value: format!("Live mode needs an http(s) signer. Got: {:?}", other),
                    })
                }
            }
        }

        Ok(())
    }

    /// Voter name to posting key.
    pub fn credentials(&self) -> Result<HashMap<String, Credential>, ConfigError> {
        let lines: Vec<String> = match &self.voters {
            None => return Err(ConfigError::NoVoters),
            Some(ListSource::Text(path)) => {
                let contents = fs::read_to_string(path)
                    .map_err(|source| ConfigError::Io { path: path.clone(), source })?;
                contents.lines().map(str::to_string).collect()
            }
            Some(ListSource::Entries(entries)) => entries.clone(),
        };

        let mut voters = HashMap::new();
        for line in &lines {
            let mut parts = line.split_whitespace();
            let Some(name) = parts.next() else { continue };
            match parts.next() {
                Some(key) => {
                    voters.insert(name.to_string(), Credential::new(key));
                }
                None => return Err(ConfigError::MalformedVoter(name.to_string())),
            }
        }

        Ok(voters)
    }

    pub fn to_rules(&self) -> Result<VotingRules, ConfigError> {
        let raw = &self.voting_rules;

        let mode = match raw.mode.as_deref() {
            Some(mode) => mode
                .parse::<VotingMode>()
                .map_err(|value| ConfigError::Invalid { key: "mode", value })?,
            None => VotingMode::FullWeight,
        };

        let vote_weight = weight("vote_weight", raw.vote_weight.as_ref(), 10_000)?;
        let tier = |key, value: Option<&Scalar>| weight(key, value, vote_weight);

        let min_rep = match &raw.min_rep {
            Some(value) => value
                .text()
                .parse::<ReputationFloor>()
                .map_err(|value| ConfigError::Invalid { key: "min_rep", value })?,
            None => ReputationFloor::Fixed(25.0),
        };

        let max_rep = match &raw.max_rep {
            Some(value) => value.text().trim().parse::<f64>().map_err(|_| ConfigError::Invalid {
                key: "max_rep",
                value: value.text(),
            })?,
            None => 99.9,
        };

        let min_voting_power = match &raw.min_voting_power {
            Some(value) => value.hundredths().ok_or_else(|| ConfigError::Invalid {
                key: "min_voting_power",
                value: value.text(),
            })?,
            None => 0,
        };
        if !(0..=10_000).contains(&min_voting_power) {
            return Err(ConfigError::Invalid {
                key: "min_voting_power",
                value: format!("{} (must be 0 % to 100 %)", min_voting_power),
            });
        }

        let rules = VotingRules {
            mode,
            vote_weight: vote_weight as Weight,
            favorites_vote_weight: tier("favorites_vote_weight", raw.favorites_vote_weight.as_ref())? as Weight,
            following_vote_weight: tier("following_vote_weight", raw.following_vote_weight.as_ref())? as Weight,
            followers_vote_weight: tier("followers_vote_weight", raw.followers_vote_weight.as_ref())? as Weight,
            enable_comments: raw.enable_comments,
            only_first_posts: raw.only_first_posts,
            only_fully_powered_up: raw.only_fully_powered_up,
            min_wait: raw.min_wait,
            max_wait: raw.max_wait,
            min_rep,
            max_rep,
            min_voting_power: min_voting_power as u16,
            unique_author: raw.unique_author,
            max_votes_per_post: raw.max_votes_per_post,
        };

        Ok(rules.normalized())
    }

    pub fn to_lists(&self) -> Result<AccountLists, ConfigError> {
        let mut lists = AccountLists::default();
        lists.set_favorites(parse_list(self.favorite_accounts.as_ref())?);
        lists.skip_accounts = parse_list(self.skip_accounts.as_ref())?.into_iter().collect();
        lists.skip_tags = parse_list(self.skip_tags.as_ref())?.into_iter().collect();
        lists.only_tags = parse_list(self.only_tags.as_ref())?.into_iter().collect();
        lists.skip_apps = parse_list(self.skip_apps.as_ref())?.into_iter().collect();
        lists.only_apps = parse_list(self.only_apps.as_ref())?.into_iter().collect();
        lists.flag_signals = parse_list(self.flag_signals.as_ref())?.into_iter().collect();
        lists.vote_signals = parse_list(self.vote_signals.as_ref())?.into_iter().collect();
        Ok(lists)
    }
}

/// Percent setting to hundredths, within -100 % ..= 100 %.
fn weight(key: &'static str, value: Option<&Scalar>, default: i64) -> Result<i64, ConfigError> {
    let Some(value) = value else { return Ok(default) };

    let hundredths = value
        .hundredths()
        .ok_or_else(|| ConfigError::Invalid { key, value: value.text() })?;

    if !(-10_000..=10_000).contains(&hundredths) {
        return Err(ConfigError::Invalid {
            key,
            value: format!("{} (must be -100 % to 100 %)", value.text()),
        });
    }
    Ok(hundredths)
}

/// Tokens of a list setting. A string naming an existing file is read as
/// whitespace separated tokens, deduplicated.
pub fn parse_list(source: Option<&ListSource>) -> Result<Vec<String>, ConfigError> {
    let tokens: Vec<String> = match source {
        None => Vec::new(),
        Some(ListSource::Entries(entries)) => entries
            .iter()
            .flat_map(|entry| entry.split_whitespace())
            .map(str::to_string)
            .collect(),
        Some(ListSource::Text(text)) if Path::new(text.trim()).is_file() => {
            let path = text.trim();
            let contents = fs::read_to_string(path)
                .map_err(|source| ConfigError::Io { path: path.to_string(), source })?;

            let mut seen = std::collections::HashSet::new();
            contents
                .split_whitespace()
                .filter(|token| seen.insert(token.to_string()))
                .map(str::to_string)
                .collect()
        }
        Some(ListSource::Text(text)) => text.split_whitespace().map(str::to_string).collect(),
    };

    Ok(tokens)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
