use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use drphil_core::math::{as_percent, regenerate};
use tracing::{debug, info};

use crate::ports::{ChainPort, TelemetryPort};
use crate::state::SharedStateHandle;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerSummary {
    pub min: u16,
    pub max: u16,
    pub average: f64,
    pub accounts: usize,
}

/// Keeps the regenerated vote power of every managed account in shared state.
pub struct VotePowerTracker {
    chain: Arc<dyn ChainPort>,
    state: SharedStateHandle,
    voters: Vec<String>,
    min_voting_power: u16,
    telemetry: Option<Arc<dyn TelemetryPort>>,
}

impl VotePowerTracker {
    pub fn new(
        chain: Arc<dyn ChainPort>,
        state: SharedStateHandle,
        voters: Vec<String>,
        min_voting_power: u16,
        telemetry: Option<Arc<dyn TelemetryPort>>,
    ) -> Self {
        Self { chain, state, voters, min_voting_power, telemetry }
    }

    pub async fn poll(&self) -> Result<()> {
        self.poll_at(Utc::now()).await
    }

    /// Fetches every voter and commits the whole pool in one critical section.
    pub async fn poll_at(&self, now: DateTime<Utc>) -> Result<()> {
        let accounts = self.chain.get_accounts(&self.voters).await?;

        let mut fresh = Vec::with_capacity(accounts.len());
        let mut wasted_total: u32 = 0;

        for account in &accounts {
            let elapsed = (now - account.last_vote_time).num_seconds();
            let regenerated = regenerate(account.voting_power, elapsed);

            if regenerated.wasted > 0 {
                info!(
                    "Vote power wasted for {}: {:.2} %",
                    account.name,
                    as_percent(regenerated.wasted as i64)
                );
                wasted_total = wasted_total.saturating_add(regenerated.wasted);
            }
            fresh.push((account.name.clone(), regenerated.power));
        }

        {
            let mut state = self.state.lock();
            for (name, power) in fresh {
                state.voting_power.insert(name, power);
            }
        }

        if let Some(tel) = &self.telemetry {
            tel.log_wasted_power(wasted_total);
        }
        debug!("Polled vote power for {} accounts", accounts.len());
        Ok(())
    }

    pub fn power(&self, account: &str) -> Option<u16> {
        self.state.lock().voting_power.get(account).copied()
    }

    /// Unknown accounts are treated as charged.
    pub fn is_recharging(&self, account: &str) -> bool {
        self.power(account)
            .map(|power| power < self.min_voting_power)
            .unwrap_or(false)
    }

    pub fn recharging(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut names: Vec<String> = self
            .voters
            .iter()
            .filter(|name| {
                state
                    .voting_power
                    .get(name.as_str())
                    .map(|power| *power < self.min_voting_power)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn summary(&self) -> Option<PowerSummary> {
        let state = self.state.lock();
        let powers: Vec<u16> = self
            .voters
            .iter()
            .filter_map(|name| state.voting_power.get(name).copied())
            .collect();

        let min = *powers.iter().min()?;
        let max = *powers.iter().max()?;
        let total: u64 = powers.iter().map(|p| *p as u64).sum();

        Some(PowerSummary {
            min,
            max,
            average: total as f64 / powers.len() as f64,
            accounts: powers.len(),
        })
    }

    /// One-line pool summary for the log.
    pub fn describe(&self) -> String {
        let Some(s) = self.summary() else {
            return "vote power unknown".to_string();
        };

        let mut parts = Vec::with_capacity(3);
        if s.accounts > 1 {
            parts.push(format!("Average remaining voting power: {:.3} %", s.average / 100.0));
            if s.max > self.min_voting_power {
                parts.push(format!("highest account: {:.3} %", as_percent(s.max as i64)));
            }
        } else {
            parts.push(format!("Remaining voting power: {:.3} %", s.average / 100.0));
        }
        parts.push(format!(
            "recharging when below: {:.3} %",
            as_percent(self.min_voting_power as i64)
        ));

        parts.join("; ")
    }
}
