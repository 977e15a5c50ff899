//! Multi-source data aggregation.
//!
//! Fetches transaction history, token transfers, balance, contract
//! classification, scam flags, and the first-transaction timestamp for one
//! address concurrently, tolerating independent failure of each source. A
//! single source outage never fails the aggregation; the affected field
//! degrades to an empty/zero/null default.

use alloy_primitives::{Address, U256};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::address;
use crate::config::Config;
use crate::models::{ScamFlag, TokenTransfer, Transaction, WalletSnapshot};
use crate::providers::{ExplorerClient, ProviderRotator};
use crate::registry::ScamRegistry;

pub struct WalletAggregator {
    explorer: Arc<ExplorerClient>,
    rotator: Arc<ProviderRotator>,
    registry: Arc<ScamRegistry>,
    tx_page_size: usize,
    internal_page_size: usize,
    token_page_size: usize,
}

impl WalletAggregator {
    pub fn new(
        explorer: Arc<ExplorerClient>,
        rotator: Arc<ProviderRotator>,
        registry: Arc<ScamRegistry>,
        config: &Config,
    ) -> Self {
        Self {
            explorer,
            rotator,
            registry,
            tx_page_size: config.tx_page_size,
            internal_page_size: config.internal_page_size,
            token_page_size: config.token_page_size,
        }
    }

    /// Build a `WalletSnapshot` for the validated address. Never fails
    /// outright: each branch degrades independently.
    pub async fn fetch(&self, addr: &Address) -> WalletSnapshot {
        let key = address::key(addr);
        let checksummed = address::checksum(addr);
        info!("🔎 Aggregating on-chain data for {}", checksummed);

        let (transactions, internal, tokens, balance, is_contract, mut scam_flags, first_tx, nonce) =
            tokio::join!(
                self.fetch_transactions(&key),
                self.fetch_internal(&key),
                self.fetch_token_transfers(&key),
                self.fetch_balance(&key),
                self.fetch_is_contract(&key),
                self.registry.check(&key),
                self.fetch_first_tx_timestamp(&key),
                self.fetch_tx_count(&key),
            );

        // One-hop interaction check over every counterpart seen
        let counterparts = collect_counterparts(&key, &transactions, &internal, &tokens);
        let interaction_matches = self.registry.batch_check_local(&counterparts);
        for (matched, entry) in &interaction_matches {
            scam_flags.push(ScamFlag {
                source: "interaction".to_string(),
                category: entry.category,
                description: format!(
                    "Interacted with flagged address {} ({})",
                    matched, entry.description
                ),
                reported_at: None,
            });
        }
        if !interaction_matches.is_empty() {
            warn!(
                "🚩 {} flagged counterparts for {}",
                interaction_matches.len(),
                checksummed
            );
        }

        let first_tx_timestamp = first_tx.or_else(|| min_observed_timestamp(&transactions, &internal, &tokens));
        let account_age_secs = first_tx_timestamp
            .map(|ts| (chrono::Utc::now().timestamp() - ts).max(0));

        let tx_count = nonce.unwrap_or(transactions.len() as u64);

        WalletSnapshot {
            address: checksummed,
            balance_wei: balance,
            tx_count,
            transactions,
            internal_transactions: internal,
            token_transfers: tokens,
            account_age_secs,
            first_tx_timestamp,
            is_contract,
            scam_flags,
        }
    }

    async fn fetch_transactions(&self, key: &str) -> Vec<Transaction> {
        match self.explorer.transactions(key, self.tx_page_size).await {
            Ok(txs) => txs,
            Err(e) => {
                warn!("⚠️ Transaction history unavailable: {}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_internal(&self, key: &str) -> Vec<Transaction> {
        match self
            .explorer
            .internal_transactions(key, self.internal_page_size)
            .await
        {
            Ok(txs) => txs,
            Err(e) => {
                warn!("⚠️ Internal transaction history unavailable: {}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_token_transfers(&self, key: &str) -> Vec<TokenTransfer> {
        match self.explorer.token_transfers(key, self.token_page_size).await {
            Ok(transfers) => transfers,
            Err(e) => {
                warn!("⚠️ Token transfer history unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// Balance with the zero cross-check: the explorer reports zero both for
    /// a genuine zero balance and as its error fallback, so a zero answer is
    /// confirmed against the rotating RPC providers before acceptance.
    async fn fetch_balance(&self, key: &str) -> U256 {
        match self.explorer.balance(key).await {
            Ok(balance) if balance > U256::ZERO => balance,
            Ok(_) => {
                debug!("🤔 Explorer reports zero balance, cross-checking via RPC");
                self.rpc_balance(key).await.unwrap_or(U256::ZERO)
            }
            Err(e) => {
                warn!("⚠️ Explorer balance unavailable: {}", e);
                self.rpc_balance(key).await.unwrap_or(U256::ZERO)
            }
        }
    }

    async fn rpc_balance(&self, key: &str) -> Option<U256> {
        let key = key.to_string();
        match self
            .rotator
            .with_fallback(|client| {
                let addr = key.clone();
                async move { client.get_balance(&addr).await }
            })
            .await
        {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!("⚠️ RPC balance cross-check failed: {}", e);
                None
            }
        }
    }

    /// Contract classification with the same empty/failure ambiguity policy
    /// as the balance branch.
    async fn fetch_is_contract(&self, key: &str) -> bool {
        match self.explorer.get_code(key).await {
            Ok(code) if has_bytecode(&code) => true,
            Ok(_) => {
                debug!("🤔 Explorer reports no bytecode, cross-checking via RPC");
                self.rpc_code(key).await.map(|c| has_bytecode(&c)).unwrap_or(false)
            }
            Err(e) => {
                warn!("⚠️ Explorer code lookup unavailable: {}", e);
                self.rpc_code(key).await.map(|c| has_bytecode(&c)).unwrap_or(false)
            }
        }
    }

    async fn rpc_code(&self, key: &str) -> Option<String> {
        let key = key.to_string();
        match self
            .rotator
            .with_fallback(|client| {
                let addr = key.clone();
                async move { client.get_code(&addr).await }
            })
            .await
        {
            Ok(code) => Some(code),
            Err(e) => {
                warn!("⚠️ RPC code cross-check failed: {}", e);
                None
            }
        }
    }

    /// Dedicated earliest-transaction lookup, independent of the bounded
    /// recent page so a heavily active address keeps an accurate age.
    async fn fetch_first_tx_timestamp(&self, key: &str) -> Option<i64> {
        match self.explorer.first_transaction(key).await {
            Ok(Some(tx)) => Some(tx.timestamp),
            Ok(None) => None,
            Err(e) => {
                warn!("⚠️ First-transaction lookup unavailable: {}", e);
                None
            }
        }
    }

    async fn fetch_tx_count(&self, key: &str) -> Option<u64> {
        let key_owned = key.to_string();
        match self
            .rotator
            .with_fallback(|client| {
                let addr = key_owned.clone();
                async move { client.get_transaction_count(&addr).await }
            })
            .await
        {
            Ok(count) => Some(count),
            Err(e) => {
                warn!("⚠️ Transaction count unavailable: {}", e);
                None
            }
        }
    }
}

/// Every counterpart address seen across transactions and token transfers,
/// lowercased, excluding the wallet itself.
fn collect_counterparts(
    own_key: &str,
    transactions: &[Transaction],
    internal: &[Transaction],
    tokens: &[TokenTransfer],
) -> HashSet<String> {
    let mut set = HashSet::new();
    for tx in transactions.iter().chain(internal.iter()) {
        set.insert(tx.from.clone());
        if let Some(to) = &tx.to {
            set.insert(to.clone());
        }
    }
    for transfer in tokens {
        set.insert(transfer.from.clone());
        if let Some(to) = &transfer.to {
            set.insert(to.clone());
        }
    }
    set.remove(own_key);
    set
}

fn min_observed_timestamp(
    transactions: &[Transaction],
    internal: &[Transaction],
    tokens: &[TokenTransfer],
) -> Option<i64> {
    transactions
        .iter()
        .chain(internal.iter())
        .map(|tx| tx.timestamp)
        .chain(tokens.iter().map(|t| t.timestamp))
        .filter(|ts| *ts > 0)
        .min()
}

fn has_bytecode(code: &str) -> bool {
    let stripped = code.trim_start_matches("0x");
    !stripped.is_empty() && stripped.chars().any(|c| c != '0')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(from: &str, to: &str, ts: i64) -> Transaction {
        Transaction {
            block_number: 1,
            timestamp: ts,
            hash: "0xh".into(),
            from: from.into(),
            to: Some(to.into()),
            value: "0".into(),
            gas: 21000,
            gas_used: 21000,
            is_error: false,
            function_name: None,
            contract_created: None,
            input: "0x".into(),
        }
    }

    #[test]
    fn test_collect_counterparts_excludes_self() {
        let own = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let txs = vec![
            tx(own, "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb", 10),
            tx("0xcccccccccccccccccccccccccccccccccccccccc", own, 20),
        ];
        let set = collect_counterparts(own, &txs, &[], &[]);
        assert_eq!(set.len(), 2);
        assert!(!set.contains(own));
    }

    #[test]
    fn test_min_observed_timestamp_skips_zero() {
        let txs = vec![
            tx("0xa", "0xb", 0), // unparsed timestamp must not win
            tx("0xa", "0xb", 500),
            tx("0xa", "0xb", 300),
        ];
        assert_eq!(min_observed_timestamp(&txs, &[], &[]), Some(300));
        assert_eq!(min_observed_timestamp(&[], &[], &[]), None);
    }

    #[test]
    fn test_has_bytecode() {
        assert!(!has_bytecode("0x"));
        assert!(!has_bytecode(""));
        assert!(!has_bytecode("0x0000"));
        assert!(has_bytecode("0x6080604052"));
    }
}
