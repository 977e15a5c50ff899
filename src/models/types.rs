//! Core data model: snapshots, flags, signals, and reports.
//!
//! A `WalletSnapshot` is the immutable aggregated evidence for one address at
//! one analysis instant. It is built once by the aggregator, consumed by the
//! scoring engine, and discarded; only the derived `RiskReport` is cached.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Risk tier, totally ordered: LOW < MEDIUM < HIGH
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Classify a 0-100 score into a tier.
    /// Boundaries: <=30 LOW, <=60 MEDIUM, else HIGH.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=30 => Self::Low,
            31..=60 => Self::Medium,
            _ => Self::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Marker used in rendered reports
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Low => "🟢",
            Self::Medium => "🟡",
            Self::High => "🔴",
        }
    }
}

/// Closed set of scam categories recognized by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScamCategory {
    Phishing,
    Drainer,
    Rugpull,
    Exploiter,
    Mixer,
    Scam,
    Burn,
}

impl ScamCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phishing => "phishing",
            Self::Drainer => "drainer",
            Self::Rugpull => "rugpull",
            Self::Exploiter => "exploiter",
            Self::Mixer => "mixer",
            Self::Scam => "scam",
            Self::Burn => "burn",
        }
    }

    /// Parse a category string from a remote registry payload.
    /// Unknown categories collapse to the generic `scam` bucket.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "phishing" => Self::Phishing,
            "drainer" => Self::Drainer,
            "rugpull" | "rug-pull" => Self::Rugpull,
            "exploiter" | "exploit" | "hack" => Self::Exploiter,
            "mixer" | "tumbler" => Self::Mixer,
            "burn" => Self::Burn,
            _ => Self::Scam,
        }
    }
}

/// A single flag against an address. Flags from different sources are kept
/// separate and never deduplicated; corroboration across sources is itself
/// a signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScamFlag {
    /// Source identifier ("local", "interaction", or a named remote registry)
    pub source: String,
    pub category: ScamCategory,
    pub description: String,
    /// Unix timestamp of the original report, when known
    pub reported_at: Option<i64>,
}

/// One on-chain transaction as seen by the block explorer.
/// Value is kept as a decimal string to preserve precision beyond u64.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub block_number: u64,
    pub timestamp: i64,
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    pub gas: u64,
    pub gas_used: u64,
    pub is_error: bool,
    /// Decoded function name when the explorer could resolve it
    pub function_name: Option<String>,
    /// Address of a contract created by this transaction
    pub contract_created: Option<String>,
    /// Raw calldata as a 0x-prefixed hex string. Needed to detect approval
    /// selectors when the decoded name is absent.
    pub input: String,
}

impl Transaction {
    /// Parse the value string into wei. Malformed values count as zero.
    pub fn value_wei(&self) -> U256 {
        U256::from_str_radix(&self.value, 10).unwrap_or(U256::ZERO)
    }
}

/// An ERC-20 transfer event, scoped to a specific token contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub block_number: u64,
    pub timestamp: i64,
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    pub token_address: String,
    pub token_name: String,
    pub token_symbol: String,
    pub token_decimals: u8,
}

/// Aggregated evidence for one address at one point in time.
/// Constructed once per analysis request, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSnapshot {
    /// Checksummed display form of the analyzed address
    pub address: String,
    /// Balance in wei
    pub balance_wei: U256,
    /// Total transaction count (nonce-derived when available)
    pub tx_count: u64,
    /// Most recent transactions, newest first, bounded by config
    pub transactions: Vec<Transaction>,
    pub internal_transactions: Vec<Transaction>,
    pub token_transfers: Vec<TokenTransfer>,
    /// Seconds since the first transaction. None = no history found.
    pub account_age_secs: Option<i64>,
    /// Independently sourced first-transaction timestamp. Stays accurate even
    /// when the bounded transaction page is truncated.
    pub first_tx_timestamp: Option<i64>,
    pub is_contract: bool,
    pub scam_flags: Vec<ScamFlag>,
}

impl WalletSnapshot {
    /// A snapshot with no observed activity. Used as the degraded default
    /// when every source fails, and as a test fixture base.
    pub fn empty(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            balance_wei: U256::ZERO,
            tx_count: 0,
            transactions: Vec::new(),
            internal_transactions: Vec::new(),
            token_transfers: Vec::new(),
            account_age_secs: None,
            first_tx_timestamp: None,
            is_contract: false,
            scam_flags: Vec::new(),
        }
    }
}

/// One of the seven independently computed sub-scores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSignal {
    pub name: String,
    /// Fraction of 1.0; the seven weights sum to exactly 1.0
    pub weight: f64,
    /// 0-100
    pub score: u8,
    pub description: String,
    /// Raw facts supporting the score, for transparency
    pub evidence: Vec<String>,
}

/// A frequently seen counterpart address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopInteraction {
    pub address: String,
    /// Whitelist label when the counterpart is known infrastructure
    pub label: Option<String>,
    pub tx_count: u64,
}

/// The final, cacheable analysis result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    /// Checksummed address
    pub address: String,
    pub chain: String,
    pub tier: RiskTier,
    /// 0-100 inclusive
    pub score: u8,
    /// 0-100, derived from data availability
    pub confidence: u8,
    pub signals: Vec<RiskSignal>,
    pub summary: String,
    pub key_findings: Vec<String>,
    pub top_interactions: Vec<TopInteraction>,
    pub recommendations: Vec<String>,
    pub disclaimer: String,
    /// Unix timestamp of the analysis
    pub analyzed_at: i64,
    pub elapsed_ms: u64,
}

/// A known-bad address in the local scam table (stored lowercase)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub address: String,
    pub category: ScamCategory,
    pub description: String,
}

/// A verified-good address exempted from flag matching (stored lowercase)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub address: String,
    pub label: String,
    pub category: String,
}
