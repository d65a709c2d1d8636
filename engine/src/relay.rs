//! Comment operations republished through Redis.
//!
//! The relay announces each operation on a pub/sub channel with a small
//! notice naming a key; the operation itself is stored under that key.

use anyhow::{anyhow, Context, Result};
use drphil_core::Candidate;
use futures_util::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::RelayOptions;
use crate::listener::{EventSource, StreamEvent};

#[derive(Debug, Deserialize)]
struct Notice {
    key: String,
}

#[derive(Debug, Deserialize)]
struct StoredOperation {
    value: Candidate,
}

pub struct RedisRelay {
    url: String,
    channel: String,
}

impl RedisRelay {
    pub fn new(options: &RelayOptions) -> Self {
        Self { url: options.url.clone(), channel: options.channel.clone() }
    }
}

pub fn decode_notice(payload: &str) -> Result<String> {
    let notice: Notice = serde_json::from_str(payload).context("Failed to parse relay notice")?;
    Ok(notice.key)
}

pub fn decode_operation(json: &str) -> Result<Candidate> {
    let stored: StoredOperation =
        serde_json::from_str(json).context("Failed to parse relayed operation")?;
    Ok(stored.value)
}

#[async_trait::async_trait]
impl EventSource for RedisRelay {
    fn describe(&self) -> &'static str {
        "streaming with relay"
    }

    async fn run(&self, tx: &mpsc::Sender<StreamEvent>) -> Result<()> {
        let client = redis::Client::open(self.url.as_str())?;
        let mut store = client
            .get_async_connection()
            .await
            .context("Failed to establish Redis connection")?;
        let mut pubsub = client
            .get_async_connection()
            .await
            .context("Failed to establish Redis connection")?
            .into_pubsub();
        pubsub
            .subscribe(&self.channel)
            .await
            .with_context(|| format!("Failed to subscribe to {}", self.channel))?;

        let mut messages = pubsub.on_message();
        while let Some(message) = messages.next().await {
            let payload: String = message.get_payload()?;
            let key = match decode_notice(&payload) {
                Ok(key) => key,
                Err(e) => {
                    warn!("{:#}: {}", e, payload);
                    continue;
                }
            };

            let stored: Option<String> = redis::cmd("GET")
                .arg(&key)
                .query_async(&mut store)
                .await
                .context("Failed to retrieve operation from Redis")?;
            let Some(stored) = stored else {
                debug!("Relay key {} already expired", key);
                continue;
            };

            match decode_operation(&stored) {
                Ok(candidate) => {
                    if tx.send(StreamEvent::live(candidate)).await.is_err() {
                        return Ok(());
                    }
                }
                Err(e) => warn!("{:#}", e),
            }
        }

        Err(anyhow!("relay subscription to {} closed", self.channel))
    }
}
