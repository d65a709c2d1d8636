use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use drphil_core::constants::{BLOCK_INTERVAL, STREAM_RETRY_DELAY};
use drphil_core::Candidate;
use strategy::ports::ChainPort;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::metrics::BotMetrics;

/// A comment operation on its way to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    pub candidate: Candidate,
    /// Age of the operation when it is already known (replay).
    pub wait_offset: Option<Duration>,
}

impl StreamEvent {
    pub fn live(candidate: Candidate) -> Self {
        Self { candidate, wait_offset: None }
    }
}

/// A long-running producer of comment operations.
///
/// `run` returns `Ok(())` only when the receiving side has gone away; any
/// error is handed to [`supervise`], which restarts the source.
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    fn describe(&self) -> &'static str;

    async fn run(&self, tx: &mpsc::Sender<StreamEvent>) -> Result<()>;
}

/// Follows the head of the chain block by block.
pub struct NodeStream {
    chain: Arc<dyn ChainPort>,
    interval: Duration,
}

impl NodeStream {
    pub fn new(chain: Arc<dyn ChainPort>) -> Self {
        Self { chain, interval: BLOCK_INTERVAL }
    }
}

#[async_trait::async_trait]
impl EventSource for NodeStream {
    fn describe(&self) -> &'static str {
        "streaming directly on node"
    }

    async fn run(&self, tx: &mpsc::Sender<StreamEvent>) -> Result<()> {
        let mut next = self.chain.get_dynamic_global_properties().await?.head_block_number;
        debug!("Streaming from block {}", next);

        loop {
            let head = self.chain.get_dynamic_global_properties().await?.head_block_number;

            while next <= head {
                let Some(block) = self.chain.get_block(next).await? else {
                    break;
                };

                for comment in block.comment_operations() {
                    if tx.send(StreamEvent::live(comment.clone())).await.is_err() {
                        return Ok(());
                    }
                }
                next += 1;
            }

            if tx.is_closed() {
                return Ok(());
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Runs `source` forever, restarting it five seconds after every failure.
pub async fn supervise(source: Arc<dyn EventSource>, tx: mpsc::Sender<StreamEvent>, metrics: Arc<BotMetrics>) {
    loop {
        info!("Now waiting for new posts ({}).", source.describe());

        match source.run(&tx).await {
            Ok(()) => {
                debug!("Event receiver closed, stopping source");
                return;
            }
            Err(e) => {
                warn!(
                    "Unable to stream on current node.  Retrying in {} seconds.  Error: {:#}",
                    STREAM_RETRY_DELAY.as_secs(),
                    e
                );
                metrics.log_stream_reconnect();
                tokio::time::sleep(STREAM_RETRY_DELAY).await;
            }
        }
    }
}
