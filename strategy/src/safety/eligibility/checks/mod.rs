use std::fmt;

use chrono::{DateTime, Utc};

pub mod content;
pub mod reputation;
pub mod signals;

pub use content::{app_allowed, tags_allowed};
pub use reputation::{refresh_trending_floor, should_resample};
pub use signals::intersecting;

/// Why a scheduled post was not voted.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    CashoutPassed(DateTime<Utc>),
    NotFirstPost,
    AuthorLookupFailed(String),
    NotFullyPoweredUp,
    PayoutDeclined,
    NoEligibleVoters,
    LowReputation(f64),
    LowDynamicReputation(f64),
    HighReputation(f64),
    FlagSignal(Vec<String>),
    VoteSignal(Vec<String>),
    AlreadyVoted,
    AuthorCooldown { author: String, minutes: u64 },
}

impl SkipReason {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::CashoutPassed(_) => "cashout_passed",
            SkipReason::NotFirstPost => "not_first_post",
            SkipReason::AuthorLookupFailed(_) => "author_lookup_failed",
            SkipReason::NotFullyPoweredUp => "not_fully_powered_up",
            SkipReason::PayoutDeclined => "payout_declined",
            SkipReason::NoEligibleVoters => "no_eligible_voters",
            SkipReason::LowReputation(_) => "low_reputation",
            SkipReason::LowDynamicReputation(_) => "low_dynamic_reputation",
            SkipReason::HighReputation(_) => "high_reputation",
            SkipReason::FlagSignal(_) => "flag_signal",
            SkipReason::VoteSignal(_) => "vote_signal",
            SkipReason::AlreadyVoted => "already_voted",
            SkipReason::AuthorCooldown { .. } => "author_cooldown",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SkipReason::CashoutPassed(at) => write!(f, "cashout time has passed ({})", at),
            SkipReason::NotFirstPost => write!(f, "not first post"),
            SkipReason::AuthorLookupFailed(msg) => write!(f, "could not look up author: {}", msg),
            SkipReason::NotFullyPoweredUp => write!(f, "reward not fully powered up"),
            SkipReason::PayoutDeclined => write!(f, "payout declined"),
            SkipReason::NoEligibleVoters => write!(f, "everyone already voted"),
            SkipReason::LowReputation(rep) => write!(f, "due to low rep ({:.3})", rep),
            SkipReason::LowDynamicReputation(rep) => write!(f, "due to low dynamic rep ({:.3})", rep),
            SkipReason::HighReputation(rep) => write!(f, "due to high rep ({:.3})", rep),
            SkipReason::FlagSignal(names) => write!(f, "flag signals ({} flagged)", names.join(" ")),
            SkipReason::VoteSignal(names) => write!(f, "vote signals ({} voted)", names.join(" ")),
            SkipReason::AlreadyVoted => write!(f, "already voted"),
            SkipReason::AuthorCooldown { author, minutes } => {
                write!(f, "already voted for @{} within {} minutes", author, minutes)
            }
        }
    }
}
