use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use drphil_core::{
    AccountSnapshot, Candidate, FollowEntry, GlobalProperties, HistoryItem, SignedBlock,
};
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strategy::ports::ChainPort;
use tracing::debug;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    message: String,
}

/// `condenser_api` client over HTTP JSON-RPC.
pub struct JsonRpcClient {
    url: String,
    client: Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { url: url.to_string(), client, next_id: AtomicU64::new(1) })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!("➡️ {} {}", method, request.params);

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("{} request failed", method))?;

        if !response.status().is_success() {
            return Err(anyhow!("{} HTTP error: {}", method, response.status()));
        }

        let body: RpcResponse<T> = response
            .json()
            .await
            .with_context(|| format!("{} returned an unreadable response", method))?;

        if let Some(error) = body.error {
            return Err(anyhow!("{} error {}: {}", method, error.code, error.message));
        }
        Ok(body.result)
    }

    async fn call_required<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        self.call(method, params)
            .await?
            .ok_or_else(|| anyhow!("{} returned no result", method))
    }
}

#[async_trait::async_trait]
impl ChainPort for JsonRpcClient {
    async fn get_content(&self, author: &str, permlink: &str) -> Result<Candidate> {
        let content: Candidate = self
            .call_required("condenser_api.get_content", json!([author, permlink]))
            .await?;

        // Unknown posts come back as an empty object.
        if content.author.is_empty() {
            return Err(anyhow!("content not found: @{}/{}", author, permlink));
        }
        Ok(content)
    }

    async fn get_accounts(&self, names: &[String]) -> Result<Vec<AccountSnapshot>> {
        self.call_required("condenser_api.get_accounts", json!([names])).await
    }

    async fn get_account_history(
        &self,
        account: &str,
        start: i64,
        limit: u32,
    ) -> Result<Vec<(u64, HistoryItem)>> {
        self.call_required("condenser_api.get_account_history", json!([account, start, limit]))
            .await
    }

    async fn get_following(
        &self,
        account: &str,
        start_after: Option<&str>,
        kind: &str,
        limit: u32,
    ) -> Result<Vec<FollowEntry>> {
        self.call_required("condenser_api.get_following", json!([account, start_after, kind, limit]))
            .await
    }

    async fn get_followers(
        &self,
        account: &str,
        start_after: Option<&str>,
        kind: &str,
        limit: u32,
    ) -> Result<Vec<FollowEntry>> {
        self.call_required("condenser_api.get_followers", json!([account, start_after, kind, limit]))
            .await
    }

    async fn get_discussions_by_trending(&self, tag: &str, limit: u32) -> Result<Vec<Candidate>> {
        self.call_required(
            "condenser_api.get_discussions_by_trending",
            json!([{ "tag": tag, "limit": limit }]),
        )
        .await
    }

    async fn get_dynamic_global_properties(&self) -> Result<GlobalProperties> {
        self.call_required("condenser_api.get_dynamic_global_properties", json!([])).await
    }

    async fn get_block(&self, number: u64) -> Result<Option<SignedBlock>> {
        self.call("condenser_api.get_block", json!([number])).await
    }
}
