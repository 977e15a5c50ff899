//! JSON-RPC ledger-read client.
//!
//! Thin reqwest-based client for the three read operations the pipeline
//! needs: balance, transaction count, and bytecode. One instance targets one
//! endpoint; endpoint failover is the rotator's job, so this client retries
//! only briefly (transient-glitch cover) before surfacing the error.

use alloy_primitives::U256;
use eyre::{eyre, Result};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT_VALUE: &str = "wallet-sentry/0.1";

/// In-endpoint retries before handing the failure to the rotator
const MAX_RETRIES: u32 = 2;
const BASE_RETRY_MS: u64 = 250;
const RETRY_JITTER_PERCENT: u64 = 20;

/// An endpoint descriptor for the provider rotator
#[derive(Debug, Clone)]
pub struct ProviderEndpoint {
    pub name: String,
    pub url: String,
    /// Lower value = tried first
    pub priority: u8,
}

impl ProviderEndpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>, priority: u8) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            priority,
        }
    }
}

/// JSON-RPC client bound to a single endpoint
pub struct RpcClient {
    name: String,
    url: String,
    client: reqwest::Client,
}

impl RpcClient {
    pub fn new(endpoint: &ProviderEndpoint, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            name: endpoint.name.clone(),
            url: endpoint.url.clone(),
            client,
        })
    }

    /// Execute a JSON-RPC call with a short jittered retry
    pub async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let base = BASE_RETRY_MS * 2_u64.pow(attempt - 1);
                let jitter_range = (base * RETRY_JITTER_PERCENT) / 100;
                let jitter: i64 =
                    rand::thread_rng().gen_range(-(jitter_range as i64)..=(jitter_range as i64));
                let delay = (base as i64 + jitter).max(50) as u64;
                debug!("⏳ {} retry {}/{} after {}ms", self.name, attempt, MAX_RETRIES, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            match self.execute_call::<T>(&payload).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!("⚠️ RPC call {} failed on {}: {}", method, self.name, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| eyre!("RPC call failed with no error recorded")))
    }

    async fn execute_call<T: for<'de> Deserialize<'de>>(
        &self,
        payload: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| eyre!("Request failed: {}", e))?;

        let status = response.status();
        if status == 429 {
            return Err(eyre!("Rate limited (HTTP 429)"));
        }
        if !status.is_success() {
            return Err(eyre!("HTTP error: {}", status));
        }

        let json: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| eyre!("Failed to parse response: {}", e))?;

        if let Some(error) = json.error {
            return Err(eyre!("RPC error: {} (code: {})", error.message, error.code));
        }
        json.result.ok_or_else(|| eyre!("No result in response"))
    }

    /// eth_getBalance, returned in wei
    pub async fn get_balance(&self, address: &str) -> Result<U256> {
        let params = serde_json::json!([address, "latest"]);
        let hex: String = self.call("eth_getBalance", params).await?;
        parse_hex_u256(&hex)
    }

    /// eth_getTransactionCount (nonce)
    pub async fn get_transaction_count(&self, address: &str) -> Result<u64> {
        let params = serde_json::json!([address, "latest"]);
        let hex: String = self.call("eth_getTransactionCount", params).await?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| eyre!("Invalid tx count {}: {}", hex, e))
    }

    /// eth_getCode. An externally owned account returns "0x".
    pub async fn get_code(&self, address: &str) -> Result<String> {
        let params = serde_json::json!([address, "latest"]);
        self.call::<String>("eth_getCode", params).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint URL with any key path segment hidden, safe for logs
    pub fn masked_url(&self) -> String {
        if let Some((base, _)) = self.url.split_once("/v2/") {
            return format!("{}/v2/***HIDDEN***", base);
        }
        self.url.clone()
    }
}

fn parse_hex_u256(hex: &str) -> Result<U256> {
    U256::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| eyre!("Invalid hex quantity {}: {}", hex, e))
}

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    #[allow(dead_code)]
    jsonrpc: String,
    result: Option<T>,
    error: Option<RpcError>,
}

/// JSON-RPC error object
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u256() {
        assert_eq!(parse_hex_u256("0x0").unwrap(), U256::ZERO);
        assert_eq!(
            parse_hex_u256("0xde0b6b3a7640000").unwrap(),
            U256::from(1_000_000_000_000_000_000u128)
        );
        assert!(parse_hex_u256("0xzz").is_err());
    }

    #[test]
    fn test_masked_url() {
        let endpoint = ProviderEndpoint::new(
            "alchemy",
            "https://eth-mainnet.g.alchemy.com/v2/secret-key",
            0,
        );
        let client = RpcClient::new(&endpoint, Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.masked_url(),
            "https://eth-mainnet.g.alchemy.com/v2/***HIDDEN***"
        );

        let public = ProviderEndpoint::new("llama", "https://eth.llamarpc.com", 1);
        let client = RpcClient::new(&public, Duration::from_secs(5)).unwrap();
        assert_eq!(client.masked_url(), "https://eth.llamarpc.com");
    }
}
