use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use drphil_core::math::parse_percent;
use drphil_core::Weight;
use tracing::warn;

/// How the managed pool spends its votes on a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VotingMode {
    /// One randomly chosen account votes at full weight (`drphil`).
    #[default]
    FullWeight,
    /// Every account votes in turn, usually at a low weight (`winfrey`).
    RotatingLowWeight,
    /// Never votes (`seinfeld`).
    Disabled,
}

impl FromStr for VotingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "drphil" => Ok(Self::FullWeight),
            "winfrey" => Ok(Self::RotatingLowWeight),
            "seinfeld" => Ok(Self::Disabled),
            other => Err(format!("unknown voting mode: {}", other)),
        }
    }
}

impl fmt::Display for VotingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FullWeight => "drphil",
            Self::RotatingLowWeight => "winfrey",
            Self::Disabled => "seinfeld",
        })
    }
}

/// Lower reputation bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReputationFloor {
    /// Display-scale score, e.g. `25.0`.
    Fixed(f64),
    /// Lowest raw reputation among up to `sample` trending posts.
    Dynamic { sample: u32 },
}

impl FromStr for ReputationFloor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(limit) = s.strip_prefix("dynamic:") {
            return limit
                .parse::<u32>()
                .map(|sample| Self::Dynamic { sample })
                .map_err(|_| format!("invalid dynamic reputation sample: {}", s));
        }
        s.parse::<f64>()
            .map(Self::Fixed)
            .map_err(|_| format!("invalid reputation: {}", s))
    }
}

/// Immutable voting configuration snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct VotingRules {
    pub mode: VotingMode,
    pub vote_weight: Weight,
    pub favorites_vote_weight: Weight,
    pub following_vote_weight: Weight,
    pub followers_vote_weight: Weight,
    pub enable_comments: bool,
    pub only_first_posts: bool,
    pub only_fully_powered_up: bool,
    /// Minutes.
    pub min_wait: u64,
    /// Minutes.
    pub max_wait: u64,
    pub min_rep: ReputationFloor,
    pub max_rep: f64,
    /// Hundredths of a percent.
    pub min_voting_power: u16,
    /// Minutes between votes for the same author; `None` disables the check.
    pub unique_author: Option<u64>,
    pub max_votes_per_post: Option<u32>,
}

impl Default for VotingRules {
    fn default() -> Self {
        Self {
            mode: VotingMode::FullWeight,
            vote_weight: 10_000,
            favorites_vote_weight: 10_000,
            following_vote_weight: 10_000,
            followers_vote_weight: 10_000,
            enable_comments: false,
            only_first_posts: false,
            only_fully_powered_up: false,
            min_wait: 0,
            max_wait: 0,
            min_rep: ReputationFloor::Fixed(25.0),
            max_rep: 99.9,
            min_voting_power: 0,
            unique_author: None,
            max_votes_per_post: None,
        }
    }
}

impl VotingRules {
    /// A bot with every weight at zero can never vote. Park it in
    /// `seinfeld` so nothing gets scheduled.
    pub fn normalized(mut self) -> Self {
        let all_zero = self.vote_weight == 0
            && self.favorites_vote_weight == 0
            && self.following_vote_weight == 0
            && self.followers_vote_weight == 0;

        if all_zero && self.mode != VotingMode::Disabled {
            warn!("⚠️ All vote weights are zero. This is a bot that does nothing.");
            self.mode = VotingMode::Disabled;
        }
        self
    }

    pub fn is_rotating(&self) -> bool {
        self.mode == VotingMode::RotatingLowWeight
    }

    pub fn wait_range(&self) -> RangeInclusive<u64> {
        self.min_wait..=self.max_wait.max(self.min_wait)
    }

    pub fn unique_author_cooldown(&self) -> Option<chrono::Duration> {
        self.unique_author
            .map(|minutes| chrono::Duration::minutes(minutes as i64))
    }
}

/// Allow/deny lists and favorite weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountLists {
    pub favorites: HashSet<String>,
    pub favorite_weights: HashMap<String, Weight>,
    pub skip_accounts: HashSet<String>,
    pub skip_tags: HashSet<String>,
    pub only_tags: HashSet<String>,
    pub skip_apps: HashSet<String>,
    pub only_apps: HashSet<String>,
    pub flag_signals: HashSet<String>,
    pub vote_signals: HashSet<String>,
}

impl AccountLists {
    /// Installs favorites from `name` or `name:weight` tokens.
    pub fn set_favorites<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let (favorites, weights) = parse_favorites(tokens);
        self.favorites = favorites;
        self.favorite_weights = weights;
    }

    pub fn is_favorite(&self, author: &str) -> bool {
        self.favorites.contains(author)
    }
}

/// Splits `name:weight` tokens into the favorite set and the override map.
/// Weights are percents; tokens without a usable weight only join the set.
pub fn parse_favorites<I, S>(tokens: I) -> (HashSet<String>, HashMap<String, Weight>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut favorites = HashSet::new();
    let mut weights = HashMap::new();

    for token in tokens {
        let token = token.as_ref().trim();
        if token.is_empty() {
            continue;
        }

        let mut parts = token.splitn(2, ':');
        let name = parts.next().unwrap_or_default().to_string();

        if let Some(raw_weight) = parts.next() {
            match parse_percent(raw_weight) {
                Some(weight) => {
                    weights.insert(name.clone(), weight.clamp(-10_000, 10_000) as Weight);
                }
                None => warn!("Ignoring unreadable favorite weight: {}", token),
            }
        }
        favorites.insert(name);
    }

    (favorites, weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("drphil".parse::<VotingMode>().unwrap(), VotingMode::FullWeight);
        assert_eq!("winfrey".parse::<VotingMode>().unwrap(), VotingMode::RotatingLowWeight);
        assert_eq!("seinfeld".parse::<VotingMode>().unwrap(), VotingMode::Disabled);
        assert!("oprah".parse::<VotingMode>().is_err());
    }

    #[test]
    fn test_reputation_floor_parsing() {
        assert_eq!("25".parse::<ReputationFloor>().unwrap(), ReputationFloor::Fixed(25.0));
        assert_eq!(
            "dynamic:100".parse::<ReputationFloor>().unwrap(),
            ReputationFloor::Dynamic { sample: 100 }
        );
        assert!("dynamic:lots".parse::<ReputationFloor>().is_err());
    }

    #[test]
    fn test_all_zero_weights_force_seinfeld() {
        let rules = VotingRules {
            vote_weight: 0,
            favorites_vote_weight: 0,
            following_vote_weight: 0,
            followers_vote_weight: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(rules.mode, VotingMode::Disabled);

        let one_weight = VotingRules {
            vote_weight: 0,
            favorites_vote_weight: 500,
            following_vote_weight: 0,
            followers_vote_weight: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(one_weight.mode, VotingMode::FullWeight);
    }

    #[test]
    fn test_favorites_with_weights() {
        let (favorites, weights) = parse_favorites(["alice:50", "bob", "carol:12.5 %", ""]);
        assert_eq!(favorites.len(), 3);
        assert!(favorites.contains("alice") && favorites.contains("bob") && favorites.contains("carol"));
        assert_eq!(weights.get("alice"), Some(&5_000));
        assert_eq!(weights.get("carol"), Some(&1_250));
        assert!(!weights.contains_key("bob"));
    }

    #[test]
    fn test_wait_range_never_inverted() {
        let rules = VotingRules { min_wait: 10, max_wait: 5, ..Default::default() };
        assert_eq!(rules.wait_range(), 10..=10);
    }
}
