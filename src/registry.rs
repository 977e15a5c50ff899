//! Scam address registry.
//!
//! A process-wide in-memory table seeded at startup from a fixed dataset,
//! plus an optional best-effort remote lookup per request. A separate
//! whitelist of verified-good infrastructure addresses suppresses false
//! positives during batch interaction checks.
//!
//! All stored and queried keys are normalized to lowercase at the boundary.

use dashmap::DashMap;
use eyre::{eyre, Result};
use lazy_static::lazy_static;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info};

use crate::address;
use crate::models::{RegistryEntry, ScamCategory, ScamFlag, WhitelistEntry};

pub struct ScamRegistry {
    local: DashMap<String, RegistryEntry>,
    whitelist: DashMap<String, WhitelistEntry>,
    remote_url: Option<String>,
    remote_timeout: Duration,
    client: reqwest::Client,
}

impl ScamRegistry {
    pub fn new(remote_url: Option<String>, remote_timeout: Duration) -> Self {
        Self {
            local: DashMap::new(),
            whitelist: DashMap::new(),
            remote_url,
            remote_timeout,
            client: reqwest::Client::new(),
        }
    }

    /// Registry seeded with the built-in datasets
    pub fn with_defaults(remote_url: Option<String>, remote_timeout: Duration) -> Result<Self> {
        let registry = Self::new(remote_url, remote_timeout);
        registry.seed_whitelist(DEFAULT_WHITELIST.clone());
        registry.seed(DEFAULT_SCAM_ENTRIES.clone())?;
        Ok(registry)
    }

    /// Bulk-load entries, normalizing addresses to lowercase. Idempotent:
    /// re-seeding overwrites matching keys and adds new ones. Fails loudly
    /// when the load would contradict the whitelist.
    pub fn seed(&self, entries: Vec<RegistryEntry>) -> Result<()> {
        for mut entry in entries {
            entry.address = address::key_of(&entry.address);
            self.local.insert(entry.address.clone(), entry);
        }
        self.verify_disjoint()?;
        info!("📋 Scam registry seeded: {} entries", self.local.len());
        Ok(())
    }

    pub fn seed_whitelist(&self, entries: Vec<WhitelistEntry>) {
        for mut entry in entries {
            entry.address = address::key_of(&entry.address);
            self.whitelist.insert(entry.address.clone(), entry);
        }
        info!("✅ Whitelist seeded: {} entries", self.whitelist.len());
    }

    /// Curation consistency check: an address present in both the scam table
    /// and the whitelist indicates a broken seed dataset.
    pub fn verify_disjoint(&self) -> Result<()> {
        for entry in self.local.iter() {
            if self.whitelist.contains_key(entry.key()) {
                return Err(eyre!(
                    "Registry curation conflict: {} is both whitelisted and flagged",
                    entry.key()
                ));
            }
        }
        Ok(())
    }

    /// All flags for an address: any local match plus any remote matches.
    /// The remote call is best-effort; every failure collapses to no flags.
    pub async fn check(&self, addr: &str) -> Vec<ScamFlag> {
        let key = address::key_of(addr);
        let mut flags = Vec::new();

        if let Some(entry) = self.local.get(&key) {
            flags.push(ScamFlag {
                source: "local".to_string(),
                category: entry.category,
                description: entry.description.clone(),
                reported_at: None,
            });
        }

        flags.extend(self.check_remote(&key).await);
        flags
    }

    /// Local-only lookup without the whitelist guard
    pub fn check_local(&self, addr: &str) -> Option<RegistryEntry> {
        self.local.get(&address::key_of(addr)).map(|e| e.clone())
    }

    /// Local-only batch check over counterpart addresses. Whitelisted
    /// addresses are skipped entirely; the returned map contains only the
    /// addresses that actually matched.
    pub fn batch_check_local(&self, addrs: &HashSet<String>) -> HashMap<String, RegistryEntry> {
        let mut matches = HashMap::new();
        for addr in addrs {
            let key = address::key_of(addr);
            if self.whitelist.contains_key(&key) {
                continue;
            }
            if let Some(entry) = self.local.get(&key) {
                matches.insert(key, entry.clone());
            }
        }
        matches
    }

    pub fn is_whitelisted(&self, addr: &str) -> bool {
        self.whitelist.contains_key(&address::key_of(addr))
    }

    /// Label for a known-good infrastructure address, if any
    pub fn whitelist_label(&self, addr: &str) -> Option<String> {
        self.whitelist
            .get(&address::key_of(addr))
            .map(|e| e.label.clone())
    }

    pub fn local_len(&self) -> usize {
        self.local.len()
    }

    /// Query the remote community registry. Bounded timeout; network errors,
    /// non-2xx statuses, and malformed payloads all degrade to empty.
    async fn check_remote(&self, key: &str) -> Vec<ScamFlag> {
        let Some(base) = &self.remote_url else {
            return Vec::new();
        };
        let url = format!("{}/{}", base.trim_end_matches('/'), key);

        let response = match self
            .client
            .get(&url)
            .timeout(self.remote_timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                debug!("📡 Remote registry unreachable: {}", e);
                return Vec::new();
            }
        };
        if !response.status().is_success() {
            debug!("📡 Remote registry returned {}", response.status());
            return Vec::new();
        }
        let payload: RemoteLookupResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                debug!("📡 Remote registry payload malformed: {}", e);
                return Vec::new();
            }
        };

        payload
            .flags
            .into_iter()
            .map(|record| ScamFlag {
                source: "remote".to_string(),
                category: ScamCategory::parse(&record.category),
                description: record.description,
                reported_at: record.reported_at,
            })
            .collect()
    }
}

/// Remote registry lookup payload
#[derive(Debug, Deserialize)]
struct RemoteLookupResponse {
    #[serde(default)]
    flags: Vec<RemoteFlagRecord>,
}

#[derive(Debug, Deserialize)]
struct RemoteFlagRecord {
    #[serde(default)]
    category: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    reported_at: Option<i64>,
}

lazy_static! {
    /// Built-in known-bad dataset. Curation lives in the seed data, not in
    /// runtime logic.
    pub static ref DEFAULT_SCAM_ENTRIES: Vec<RegistryEntry> = vec![
        RegistryEntry {
            address: "0x098b716b8aaf21512996dc57eb0615e2383e2f96".into(),
            category: ScamCategory::Exploiter,
            description: "Ronin bridge exploiter".into(),
        },
        RegistryEntry {
            address: "0xc8a65fadf0e0ddaf421f28feab69bf6e2e589963".into(),
            category: ScamCategory::Exploiter,
            description: "Poly Network exploiter".into(),
        },
        RegistryEntry {
            address: "0xd90e2f925da726b50c4ed8d0fb90ad053324f31b".into(),
            category: ScamCategory::Mixer,
            description: "Tornado Cash router".into(),
        },
        RegistryEntry {
            address: "0x722122df12d4e14e13ac3b6895a86e84145b6967".into(),
            category: ScamCategory::Mixer,
            description: "Tornado Cash proxy".into(),
        },
        RegistryEntry {
            address: "0x0000db5c8b030ae20308ac975898e09741e70000".into(),
            category: ScamCategory::Drainer,
            description: "Inferno drainer fee wallet".into(),
        },
        RegistryEntry {
            address: "0x000000000000000000000000000000000000dead".into(),
            category: ScamCategory::Burn,
            description: "Burn address".into(),
        },
        RegistryEntry {
            address: "0x0000000000000000000000000000000000000000".into(),
            category: ScamCategory::Burn,
            description: "Null address".into(),
        },
    ];

    /// Verified-good infrastructure contracts exempt from interaction flags
    pub static ref DEFAULT_WHITELIST: Vec<WhitelistEntry> = vec![
        WhitelistEntry {
            address: "0x7a250d5630b4cf539739df2c5dacb4c659f2488d".into(),
            label: "Uniswap V2 Router".into(),
            category: "dex".into(),
        },
        WhitelistEntry {
            address: "0xe592427a0aece92de3edee1f18e0157c05861564".into(),
            label: "Uniswap V3 Router".into(),
            category: "dex".into(),
        },
        WhitelistEntry {
            address: "0x1111111254eeb25477b68fb85ed929f73a960582".into(),
            label: "1inch Router V5".into(),
            category: "dex".into(),
        },
        WhitelistEntry {
            address: "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2".into(),
            label: "Wrapped Ether".into(),
            category: "token".into(),
        },
        WhitelistEntry {
            address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".into(),
            label: "USD Coin".into(),
            category: "token".into(),
        },
        WhitelistEntry {
            address: "0xdac17f958d2ee523a2206206994597c13d831ec7".into(),
            label: "Tether USD".into(),
            category: "token".into(),
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ScamRegistry {
        ScamRegistry::with_defaults(None, Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_local_lookup_case_insensitive() {
        let registry = registry();
        let upper = "0x098B716B8AAF21512996DC57EB0615E2383E2F96";
        let entry = registry.check_local(upper).unwrap();
        assert_eq!(entry.category, ScamCategory::Exploiter);
    }

    #[tokio::test]
    async fn test_check_without_remote() {
        let registry = registry();
        let flags = registry.check("0x098b716b8aaf21512996dc57eb0615e2383e2f96").await;
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].source, "local");

        let clean = registry.check("0x1234567890123456789012345678901234567890").await;
        assert!(clean.is_empty());
    }

    #[tokio::test]
    async fn test_remote_failure_swallowed() {
        // Unreachable endpoint must degrade to "no remote flags", not error
        let registry = ScamRegistry::with_defaults(
            Some("http://127.0.0.1:1".into()),
            Duration::from_millis(200),
        )
        .unwrap();
        let flags = registry.check("0x1234567890123456789012345678901234567890").await;
        assert!(flags.is_empty());
    }

    #[test]
    fn test_batch_check_skips_whitelist() {
        let registry = registry();
        // Force a curation contradiction directly (bypassing seed's check)
        registry.local.insert(
            "0x7a250d5630b4cf539739df2c5dacb4c659f2488d".to_string(),
            RegistryEntry {
                address: "0x7a250d5630b4cf539739df2c5dacb4c659f2488d".into(),
                category: ScamCategory::Scam,
                description: "misconfigured seed".into(),
            },
        );

        let mut addrs = HashSet::new();
        addrs.insert("0x7A250d5630B4cF539739dF2C5dAcb4c659F2488D".to_string()); // whitelisted
        addrs.insert("0x098b716b8aaf21512996dc57eb0615e2383e2f96".to_string()); // flagged
        addrs.insert("0x1234567890123456789012345678901234567890".to_string()); // clean

        let matches = registry.batch_check_local(&addrs);
        // Whitelisted address never matches, even when it also exists in the table
        assert!(!matches.contains_key("0x7a250d5630b4cf539739df2c5dacb4c659f2488d"));
        assert!(matches.contains_key("0x098b716b8aaf21512996dc57eb0615e2383e2f96"));
        // Clean addresses are absent, not present-with-null
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_seed_rejects_curation_conflict() {
        let registry = registry();
        let result = registry.seed(vec![RegistryEntry {
            address: "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".into(), // WETH, whitelisted
            category: ScamCategory::Scam,
            description: "bad seed".into(),
        }]);
        assert!(result.is_err());
    }

    #[test]
    fn test_reseed_is_idempotent() {
        let registry = registry();
        let before = registry.local_len();
        registry.seed(DEFAULT_SCAM_ENTRIES.clone()).unwrap();
        assert_eq!(registry.local_len(), before);
    }

    #[test]
    fn test_whitelist_label() {
        let registry = registry();
        assert_eq!(
            registry.whitelist_label("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            Some("Wrapped Ether".to_string())
        );
        assert!(registry
            .whitelist_label("0x1234567890123456789012345678901234567890")
            .is_none());
    }
}
