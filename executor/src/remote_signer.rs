//! Vote broadcaster backed by an external signing service
//!
//! The service receives the posting key and the operation, signs the
//! transaction and broadcasts it to the network. Node errors come back as
//! text and are classified here so the voting loop can tell benign
//! duplicates from real failures.

use std::time::Duration;

use anyhow::{Context, Result};
use drphil_core::{Credential, VoteOperation};
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strategy::ports::{BroadcastError, VoteBroadcastPort};
use tracing::{debug, info};

#[derive(Serialize)]
struct SignRequest<'a> {
    credential: &'a str,
    operation: (&'static str, &'a VoteOperation),
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl SignResponse {
    /// Transaction id from `{"id": …}` or from the broadcast result.
    fn transaction_id(&self) -> Option<String> {
        if let Some(id) = &self.id {
            return Some(id.clone());
        }
        match self.result.as_ref()? {
            Value::String(id) => Some(id.clone()),
            Value::Object(map) => Some(
                ["id", "trx_id"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_str))
                    .unwrap_or("unknown")
                    .to_string(),
            ),
            _ => Some("unknown".to_string()),
        }
    }
}

pub struct RemoteSigner {
    client: Client,
    url: String,
}

impl RemoteSigner {
    pub fn new(url: &str) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build signer HTTP client")?;

        Ok(Self { client, url: url.to_string() })
    }
}

#[async_trait::async_trait]
impl VoteBroadcastPort for RemoteSigner {
    async fn broadcast_vote(
        &self,
        credential: &Credential,
        vote: &VoteOperation,
    ) -> std::result::Result<String, BroadcastError> {
        let request = SignRequest {
            credential: credential.expose(),
            operation: ("vote", vote),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BroadcastError::Transport(e.to_string()))?;

        let status = response.status();
        let body: Option<SignResponse> = response.json().await.ok();
        debug!("Signer answered {} for {}", status, vote.voter);

        match body {
            Some(SignResponse { error: Some(error), .. }) => Err(classify(&error_message(&error))),
            Some(response) if status.is_success() && response.transaction_id().is_some() => {
                let id = response.transaction_id().unwrap_or_default();
                info!("📡 Broadcast {} for @{}/{}", id, vote.author, vote.permlink);
                Ok(id)
            }
            _ if !status.is_success() => Err(BroadcastError::Transport(format!("HTTP error: {}", status))),
            _ => Err(BroadcastError::Rejected("signer returned no transaction id".to_string())),
        }
    }
}

/// Node error text to a broadcast failure class.
pub fn classify(message: &str) -> BroadcastError {
    if message.contains("identical to this vote") || message.contains("already voted in a similar way") {
        BroadcastError::DuplicateVote
    } else if message.contains("Duplicate transaction check failed") {
        BroadcastError::DuplicateTransaction
    } else {
        BroadcastError::Rejected(message.to_string())
    }
}

// `"error": "text"` or `"error": {"message": "text", ...}`.
fn error_message(error: &Value) -> String {
    match error {
        Value::String(text) => text.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) fn request_body(credential: &Credential, vote: &VoteOperation) -> Value {
    serde_json::to_value(SignRequest { credential: credential.expose(), operation: ("vote", vote) })
        .unwrap_or(Value::Null)
}

#[cfg(test)]
pub(crate) fn transaction_id_of(body: &str) -> Option<String> {
    serde_json::from_str::<SignResponse>(body).ok()?.transaction_id()
}

#[cfg(test)]
pub(crate) fn message_of(error: &Value) -> String {
    error_message(error)
}
