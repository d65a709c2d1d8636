use std::path::PathBuf;

use clap::Parser;

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(name = "drphil", version, about = "Votes on new posts from a pool of managed accounts")]
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Replay the last N irreversible blocks before streaming
    #[arg(long, value_name = "BLOCKS")]
    pub replay: Option<u64>,

    /// Replay only, exit once every replayed vote has finished
    #[arg(long)]
    pub no_stream: bool,

    /// `replay:N` and `stream:false`, as older deployments pass them
    #[arg(value_name = "TOKEN")]
    pub legacy: Vec<String>,
}

impl Cli {
    pub fn replay_blocks(&self) -> u64 {
        let legacy = self
            .legacy
            .iter()
            .filter_map(|token| token.strip_prefix("replay:"))
            .filter_map(|n| n.parse::<u64>().ok())
            .last();

        self.replay.or(legacy).unwrap_or(0)
    }

    pub fn streaming(&self) -> bool {
        !self.no_stream && !self.legacy.iter().any(|token| token == "stream:false")
    }
}
