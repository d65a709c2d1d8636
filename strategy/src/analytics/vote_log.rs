use anyhow::{Context, Result};
use chrono::Utc;
use drphil_core::VoteOperation;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::warn;

/// Append-only CSV journal of cast votes:
/// `timestamp,voter,author,permlink,weight,transaction,mode`.
pub struct VoteJournal {
    sender: mpsc::Sender<String>,
}

impl VoteJournal {
    /// Opens the file and spawns a background writer for it.
    pub async fn new(file_path: &str) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)
            .await
            .with_context(|| format!("Failed to open vote journal {}", file_path))?;

        let (tx, mut rx) = mpsc::channel::<String>(100);

        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                if let Err(e) = file.write_all(entry.as_bytes()).await {
                    warn!("❌ Journal Error: {}", e);
                }
            }
            let _ = file.flush().await;
        });

        Ok(Self { sender: tx })
    }

    pub fn log_vote(&self, vote: &VoteOperation, transaction: &str, mode: &str) {
        let entry = format!(
            "{},{},{},{},{},{},{}\n",
            Utc::now().to_rfc3339(),
            vote.voter,
            vote.author,
            vote.permlink,
            vote.weight,
            transaction,
            mode
        );

        // Full buffer drops the entry rather than stalling the vote task.
        if self.sender.try_send(entry).is_err() {
            warn!("Vote journal is backed up, dropping entry for @{}/{}", vote.author, vote.permlink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_journal_appends_csv_line() {
        let path = std::env::temp_dir().join(format!("drphil-journal-{}.csv", std::process::id()));
        let path_str = path.to_string_lossy().to_string();
        let _ = std::fs::remove_file(&path);

        let journal = VoteJournal::new(&path_str).await.unwrap();
        journal.log_vote(
            &VoteOperation { voter: "bot".into(), author: "alice".into(), permlink: "p".into(), weight: 10_000 },
            "abc123",
            "drphil",
        );
        drop(journal);

        let mut contents = String::new();
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            contents = std::fs::read_to_string(&path).unwrap_or_default();
            if !contents.is_empty() {
                break;
            }
        }
        assert!(contents.ends_with(",bot,alice,p,10000,abc123,drphil\n"), "got {:?}", contents);
        let _ = std::fs::remove_file(&path);
    }
}
