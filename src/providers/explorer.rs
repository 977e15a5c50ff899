//! Block-explorer HTTP API client.
//!
//! Etherscan-compatible account endpoints: paginated transaction, internal
//! transaction, and token transfer lists, plus balance and bytecode lookups
//! and a dedicated earliest-transaction query. Every request first acquires
//! a slot from the shared call limiter to respect the published quota.
//!
//! All numeric fields arrive as decimal strings and are kept that way where
//! precision matters (values), parsed leniently otherwise.

use alloy_primitives::U256;
use eyre::{eyre, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::limiter::CallRateLimiter;
use crate::models::{TokenTransfer, Transaction};

pub struct ExplorerClient {
    base_url: String,
    api_key: Option<String>,
    chain_id: u64,
    client: reqwest::Client,
    limiter: Arc<CallRateLimiter>,
}

impl ExplorerClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        chain_id: u64,
        timeout: Duration,
        limiter: Arc<CallRateLimiter>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key,
            chain_id,
            client,
            limiter,
        })
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<ExplorerEnvelope> {
        self.limiter.acquire().await;

        let chain_id = self.chain_id.to_string();
        let mut query: Vec<(&str, &str)> = vec![("chainid", chain_id.as_str())];
        query.extend_from_slice(params);
        if let Some(key) = &self.api_key {
            query.push(("apikey", key.as_str()));
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| eyre!("Explorer request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(eyre!("Explorer HTTP error: {}", response.status()));
        }
        response
            .json::<ExplorerEnvelope>()
            .await
            .map_err(|e| eyre!("Failed to parse explorer response: {}", e))
    }

    /// Fetch a paginated list-shaped result. "No transactions found" is an
    /// empty list, not an error.
    async fn get_list<T: for<'de> Deserialize<'de>>(
        &self,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let envelope = self.get(params).await?;
        if envelope.status == "0" {
            if envelope.message.to_lowercase().contains("no transactions") {
                return Ok(Vec::new());
            }
            return Err(eyre!("Explorer error: {}", envelope.message));
        }
        serde_json::from_value(envelope.result)
            .map_err(|e| eyre!("Unexpected explorer payload: {}", e))
    }

    /// Most recent transactions, newest first, bounded to `limit`
    pub async fn transactions(&self, address: &str, limit: usize) -> Result<Vec<Transaction>> {
        let offset = limit.to_string();
        let raw: Vec<RawTransaction> = self
            .get_list(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address),
                ("page", "1"),
                ("offset", offset.as_str()),
                ("sort", "desc"),
            ])
            .await?;
        info!("📜 Explorer: {} transactions for {}", raw.len(), address);
        Ok(raw.into_iter().map(Transaction::from).collect())
    }

    /// Internal (message-call) transactions, newest first
    pub async fn internal_transactions(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<Transaction>> {
        let offset = limit.to_string();
        let raw: Vec<RawTransaction> = self
            .get_list(&[
                ("module", "account"),
                ("action", "txlistinternal"),
                ("address", address),
                ("page", "1"),
                ("offset", offset.as_str()),
                ("sort", "desc"),
            ])
            .await?;
        debug!("📜 Explorer: {} internal txs for {}", raw.len(), address);
        Ok(raw.into_iter().map(Transaction::from).collect())
    }

    /// ERC-20 transfer events, newest first
    pub async fn token_transfers(&self, address: &str, limit: usize) -> Result<Vec<TokenTransfer>> {
        let offset = limit.to_string();
        let raw: Vec<RawTokenTransfer> = self
            .get_list(&[
                ("module", "account"),
                ("action", "tokentx"),
                ("address", address),
                ("page", "1"),
                ("offset", offset.as_str()),
                ("sort", "desc"),
            ])
            .await?;
        debug!("🪙 Explorer: {} token transfers for {}", raw.len(), address);
        Ok(raw.into_iter().map(TokenTransfer::from).collect())
    }

    /// Account balance in wei.
    /// Note: this source reports zero both for a genuine zero balance and as
    /// its own error fallback; callers must cross-check zero elsewhere.
    pub async fn balance(&self, address: &str) -> Result<U256> {
        let envelope = self
            .get(&[
                ("module", "account"),
                ("action", "balance"),
                ("address", address),
                ("tag", "latest"),
            ])
            .await?;
        let text = envelope
            .result
            .as_str()
            .ok_or_else(|| eyre!("Balance result is not a string"))?
            .to_string();
        U256::from_str_radix(&text, 10).map_err(|e| eyre!("Invalid balance {}: {}", text, e))
    }

    /// Contract bytecode via the proxy endpoint. "0x" means externally owned.
    /// Same zero/failure ambiguity as `balance`.
    pub async fn get_code(&self, address: &str) -> Result<String> {
        let envelope = self
            .get(&[
                ("module", "proxy"),
                ("action", "eth_getCode"),
                ("address", address),
                ("tag", "latest"),
            ])
            .await?;
        envelope
            .result
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| eyre!("Code result is not a string"))
    }

    /// Earliest transaction for the address, sourced separately from the
    /// bounded recent page so it stays accurate for heavily active accounts.
    pub async fn first_transaction(&self, address: &str) -> Result<Option<Transaction>> {
        let raw: Vec<RawTransaction> = self
            .get_list(&[
                ("module", "account"),
                ("action", "txlist"),
                ("address", address),
                ("page", "1"),
                ("offset", "1"),
                ("sort", "asc"),
            ])
            .await?;
        Ok(raw.into_iter().next().map(Transaction::from))
    }
}

/// Standard explorer response envelope
#[derive(Debug, Deserialize)]
struct ExplorerEnvelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    result: serde_json::Value,
}

/// Raw transaction record; all fields arrive as strings
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    #[serde(default)]
    block_number: String,
    #[serde(default)]
    time_stamp: String,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    gas: String,
    #[serde(default)]
    gas_used: String,
    #[serde(default)]
    is_error: String,
    #[serde(default)]
    function_name: String,
    #[serde(default)]
    contract_address: String,
    #[serde(default)]
    input: String,
}

impl From<RawTransaction> for Transaction {
    fn from(raw: RawTransaction) -> Self {
        Self {
            block_number: raw.block_number.parse().unwrap_or(0),
            timestamp: raw.time_stamp.parse().unwrap_or(0),
            hash: raw.hash,
            from: raw.from.to_lowercase(),
            to: non_empty(raw.to).map(|s| s.to_lowercase()),
            value: raw.value,
            gas: raw.gas.parse().unwrap_or(0),
            gas_used: raw.gas_used.parse().unwrap_or(0),
            is_error: raw.is_error == "1",
            function_name: non_empty(raw.function_name),
            contract_created: non_empty(raw.contract_address).map(|s| s.to_lowercase()),
            input: raw.input,
        }
    }
}

/// Raw ERC-20 transfer record
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTokenTransfer {
    #[serde(default)]
    block_number: String,
    #[serde(default)]
    time_stamp: String,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    contract_address: String,
    #[serde(default)]
    token_name: String,
    #[serde(default)]
    token_symbol: String,
    #[serde(default)]
    token_decimal: String,
}

impl From<RawTokenTransfer> for TokenTransfer {
    fn from(raw: RawTokenTransfer) -> Self {
        Self {
            block_number: raw.block_number.parse().unwrap_or(0),
            timestamp: raw.time_stamp.parse().unwrap_or(0),
            hash: raw.hash,
            from: raw.from.to_lowercase(),
            to: non_empty(raw.to).map(|s| s.to_lowercase()),
            value: raw.value,
            token_address: raw.contract_address.to_lowercase(),
            token_name: raw.token_name,
            token_symbol: raw.token_symbol,
            token_decimals: raw.token_decimal.parse().unwrap_or(18),
        }
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_transaction_conversion() {
        let raw: RawTransaction = serde_json::from_value(serde_json::json!({
            "blockNumber": "18000000",
            "timeStamp": "1693000000",
            "hash": "0xdeadbeef",
            "from": "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
            "to": "0xBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB",
            "value": "1000000000000000000",
            "gas": "21000",
            "gasUsed": "21000",
            "isError": "0",
            "functionName": "",
            "contractAddress": "",
            "input": "0x"
        }))
        .unwrap();
        let tx = Transaction::from(raw);
        assert_eq!(tx.block_number, 18_000_000);
        assert_eq!(tx.from, "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        assert_eq!(tx.to.as_deref(), Some("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"));
        assert!(!tx.is_error);
        assert!(tx.function_name.is_none());
        assert!(tx.contract_created.is_none());
    }

    #[test]
    fn test_token_transfer_conversion() {
        let raw: RawTokenTransfer = serde_json::from_value(serde_json::json!({
            "blockNumber": "18000001",
            "timeStamp": "1693000100",
            "hash": "0xfeed",
            "from": "0xcccccccccccccccccccccccccccccccccccccccc",
            "to": "0xdddddddddddddddddddddddddddddddddddddddd",
            "value": "5000000",
            "contractAddress": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            "tokenName": "USD Coin",
            "tokenSymbol": "USDC",
            "tokenDecimal": "6"
        }))
        .unwrap();
        let transfer = TokenTransfer::from(raw);
        assert_eq!(transfer.token_symbol, "USDC");
        assert_eq!(transfer.token_decimals, 6);
        assert_eq!(
            transfer.token_address,
            "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
        );
    }

    #[test]
    fn test_lenient_numeric_parsing() {
        let raw: RawTransaction = serde_json::from_value(serde_json::json!({
            "blockNumber": "garbage",
            "timeStamp": "",
            "hash": "0x1",
            "from": "0xe",
            "to": "",
            "value": "0",
            "gas": "",
            "gasUsed": "",
            "isError": "1",
            "input": "0x"
        }))
        .unwrap();
        let tx = Transaction::from(raw);
        assert_eq!(tx.block_number, 0);
        assert_eq!(tx.timestamp, 0);
        assert!(tx.is_error);
        assert!(tx.to.is_none());
    }
}
