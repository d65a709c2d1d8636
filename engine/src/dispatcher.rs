use std::future::Future;
use std::sync::Arc;

use strategy::scheduler::TaskOutcome;
use strategy::VoteEngine;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::listener::StreamEvent;

/// Hands every streamed or replayed operation to the vote engine.
pub struct StreamDispatcher {
    engine: Arc<VoteEngine>,
}

impl StreamDispatcher {
    pub fn new(engine: Arc<VoteEngine>) -> Self {
        Self { engine }
    }

    pub async fn dispatch(&self, event: StreamEvent) -> Option<JoinHandle<TaskOutcome>> {
        self.engine.process_event(event.candidate, event.wait_offset).await
    }

    /// Consumes events until every sender is gone or `shutdown` fires.
    /// Returns the vote tasks that were still running at that point.
    pub async fn run(
        &self,
        mut rx: mpsc::Receiver<StreamEvent>,
        shutdown: impl Future<Output = ()>,
    ) -> Vec<JoinHandle<TaskOutcome>> {
        tokio::pin!(shutdown);
        let mut tasks: Vec<JoinHandle<TaskOutcome>> = Vec::new();

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => {
                        if let Some(task) = self.dispatch(event).await {
                            tasks.retain(|t| !t.is_finished());
                            tasks.push(task);
                        }
                    }
                    None => break,
                },
                _ = &mut shutdown => {
                    info!("🛑 Shutdown signal received");
                    break;
                }
            }
        }

        tasks.retain(|t| !t.is_finished());
        tasks
    }
}
