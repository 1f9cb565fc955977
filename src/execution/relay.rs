//! Private relay client
//!
//! Submits a signed raw transaction with `eth_sendPrivateTransaction`. The
//! relay either answers with a transaction hash in `result` or the caller
//! falls back to public broadcast.
//!
//! Created: 2026-02-05

use alloy::primitives::{Bytes, B256};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const RELAY_TIMEOUT_SECS: u64 = 10;

#[async_trait]
pub trait RelayClient: Send + Sync {
    /// `Ok(Some(hash))` when the relay accepted the transaction, `Ok(None)`
    /// when it answered without a result.
    async fn send_private(&self, url: &str, raw: &Bytes) -> Result<Option<B256>>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

pub fn private_tx_payload(raw: &Bytes) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "eth_sendPrivateTransaction",
        "params": [{ "tx": raw.to_string() }]
    })
}

/// Tx hash from a relay response body. A non-hash result string is ignored.
pub fn extract_tx_hash(body: &str) -> Result<Option<B256>> {
    let resp: RpcResponse = serde_json::from_str(body).context("relay response is not JSON-RPC")?;
    if let Some(err) = resp.error {
        return Err(anyhow!("relay error: {}", err));
    }
    Ok(resp
        .result
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<B256>().ok()))
}

pub struct HttpRelay {
    http: reqwest::Client,
}

impl HttpRelay {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(RELAY_TIMEOUT_SECS))
            .build()
            .context("Failed to build relay HTTP client")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl RelayClient for HttpRelay {
    async fn send_private(&self, url: &str, raw: &Bytes) -> Result<Option<B256>> {
        let resp = self
            .http
            .post(url)
            .json(&private_tx_payload(raw))
            .send()
            .await
            .context("relay POST failed")?;
        let status = resp.status();
        let body = resp.text().await.context("relay body unreadable")?;
        if !status.is_success() {
            return Err(anyhow!("relay HTTP {}", status));
        }
        extract_tx_hash(&body)
    }
}
