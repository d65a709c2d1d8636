use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use strategy::ports::ChainPort;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::listener::StreamEvent;

/// Re-reads the last `blocks` irreversible blocks and forwards their comment
/// operations with the block age as the wait offset. Returns how many
/// operations were forwarded.
pub async fn replay(chain: Arc<dyn ChainPort>, blocks: u64, tx: mpsc::Sender<StreamEvent>) -> Result<usize> {
    let properties = chain.get_dynamic_global_properties().await?;
    let last_irreversible = properties.last_irreversible_block_num;
    let first = last_irreversible.saturating_sub(blocks);

    info!("Replaying from block number {} ...", first);

    let mut forwarded = 0;
    for number in first..=last_irreversible {
        let block = match chain.get_block(number).await {
            Ok(Some(block)) => block,
            Ok(None) => continue,
            Err(e) => {
                warn!("Could not read block {}: {:#}", number, e);
                continue;
            }
        };

        let elapsed = (Utc::now() - block.timestamp).to_std().unwrap_or_default();
        for comment in block.comment_operations() {
            let event = StreamEvent { candidate: comment.clone(), wait_offset: Some(elapsed) };
            if tx.send(event).await.is_err() {
                return Ok(forwarded);
            }
            forwarded += 1;
        }
    }

    info!("Done replaying.");
    Ok(forwarded)
}
