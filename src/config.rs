//! Configuration, environment-driven.
//!
//! Every knob has a production-sensible default so the analyzer runs with
//! zero configuration against public endpoints. API keys are read from the
//! environment and never logged.

use std::time::Duration;
use tracing::info;

use crate::formatter::DEFAULT_MAX_BYTES;
use crate::providers::ProviderEndpoint;

#[derive(Debug, Clone)]
pub struct Config {
    pub chain_id: u64,
    pub chain_name: String,
    /// Ordered ledger-read endpoints for the rotator
    pub providers: Vec<ProviderEndpoint>,
    pub explorer_base_url: String,
    pub explorer_api_key: Option<String>,
    /// Optional community scam registry; None disables remote lookups
    pub remote_registry_url: Option<String>,
    /// Per-call timeout for RPC and explorer requests
    pub http_timeout: Duration,
    /// Timeout for the best-effort remote registry lookup
    pub remote_registry_timeout: Duration,
    pub tx_page_size: usize,
    pub internal_page_size: usize,
    pub token_page_size: usize,
    pub cache_ttl: Duration,
    /// Explorer quota: max calls per window
    pub explorer_max_calls: usize,
    pub explorer_window: Duration,
    /// Per-identity query quota
    pub query_limit: usize,
    pub query_window: Duration,
    pub report_max_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        let providers = match std::env::var("ETH_RPC_URLS") {
            Ok(urls) if !urls.trim().is_empty() => urls
                .split(',')
                .enumerate()
                .map(|(i, url)| {
                    ProviderEndpoint::new(format!("provider-{}", i + 1), url.trim(), i as u8)
                })
                .collect(),
            _ => vec![
                ProviderEndpoint::new("llamarpc", "https://eth.llamarpc.com", 0),
                ProviderEndpoint::new("publicnode", "https://ethereum-rpc.publicnode.com", 1),
                ProviderEndpoint::new("ankr", "https://rpc.ankr.com/eth", 2),
            ],
        };

        let explorer_api_key = std::env::var("ETHERSCAN_API_KEY")
            .ok()
            .filter(|k| !k.is_empty() && k != "YOUR_API_KEY");
        if explorer_api_key.is_some() {
            info!("🔑 ETHERSCAN_API_KEY configured (key hidden)");
        }

        Self {
            chain_id: 1,
            chain_name: "Ethereum".to_string(),
            providers,
            explorer_base_url: std::env::var("EXPLORER_URL")
                .unwrap_or_else(|_| "https://api.etherscan.io/v2/api".to_string()),
            explorer_api_key,
            remote_registry_url: std::env::var("SCAM_REGISTRY_URL").ok().filter(|u| !u.is_empty()),
            http_timeout: Duration::from_secs(8),
            remote_registry_timeout: Duration::from_secs(3),
            tx_page_size: 100,
            internal_page_size: 50,
            token_page_size: 100,
            cache_ttl: Duration::from_secs(300),
            explorer_max_calls: 5,
            explorer_window: Duration::from_secs(1),
            query_limit: 10,
            query_window: Duration::from_secs(60),
            report_max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}
