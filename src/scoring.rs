//! Risk scoring engine.
//!
//! Computes seven independent signal scores from an aggregated snapshot,
//! combines them by fixed weights plus a corroboration boost, and classifies
//! the result into a tier. Pure function of the snapshot: no randomness, no
//! wall-clock reads; account age is a property of the snapshot, stamped by
//! the aggregator.

use alloy_primitives::U256;

use crate::models::{RiskSignal, RiskTier, WalletSnapshot};

// The seven weights sum to exactly 1.0
const W_ACCOUNT_AGE: f64 = 0.10;
const W_TX_VOLUME: f64 = 0.15;
const W_SCAM_DB: f64 = 0.25;
const W_LARGE_TRANSFERS: f64 = 0.15;
const W_APPROVALS: f64 = 0.15;
const W_FUNDING: f64 = 0.10;
const W_TOKEN_DIVERSITY: f64 = 0.10;

/// ERC-20 approve(address,uint256) selector
const APPROVE_SELECTOR: &str = "0x095ea7b3";

const DAY_SECS: i64 = 86_400;
const CLUSTER_WINDOW_SECS: i64 = 3_600;

/// Scoring result: exactly seven signals, always
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub score: u8,
    pub tier: RiskTier,
    pub confidence: u8,
    pub signals: Vec<RiskSignal>,
}

pub struct RiskEngine;

impl RiskEngine {
    /// Score a snapshot. Deterministic: byte-identical input produces
    /// byte-identical output.
    pub fn score(snapshot: &WalletSnapshot) -> ScoreOutcome {
        let own_key = snapshot.address.to_lowercase();

        let signals = vec![
            Self::account_age_signal(snapshot),
            Self::tx_volume_signal(snapshot),
            Self::scam_db_signal(snapshot),
            Self::large_transfer_signal(snapshot, &own_key),
            Self::approval_signal(snapshot, &own_key),
            Self::funding_signal(snapshot, &own_key),
            Self::token_diversity_signal(snapshot),
        ];

        let weighted: f64 = signals
            .iter()
            .map(|s| s.score as f64 * s.weight)
            .sum();
        let boost = Self::corroboration_boost(snapshot.scam_flags.len());
        let raw = weighted + boost as f64;
        let mut score = raw.clamp(0.0, 100.0).round() as u8;

        // A flagged wallet can never rate LOW; heavy corroboration pins HIGH.
        let flag_count = snapshot.scam_flags.len();
        if flag_count >= 3 {
            score = score.max(61);
        } else if flag_count >= 1 {
            score = score.max(31);
        }

        ScoreOutcome {
            score,
            tier: RiskTier::from_score(score),
            confidence: Self::confidence(snapshot),
            signals,
        }
    }

    /// Extra score for multiple independently sourced flags, beyond what the
    /// weight-capped Scam Database signal alone can contribute.
    fn corroboration_boost(flag_count: usize) -> u8 {
        match flag_count {
            0 => 0,
            1 => 10,
            2 => 15,
            _ => 20,
        }
    }

    /// Confidence from data availability, not from the score itself
    fn confidence(snapshot: &WalletSnapshot) -> u8 {
        let mut confidence: u8 = 30;
        if !snapshot.transactions.is_empty() {
            confidence += 20;
        }
        if snapshot.account_age_secs.is_some() {
            confidence += 15;
        }
        if snapshot.tx_count > 0 {
            confidence += 10;
        }
        if !snapshot.token_transfers.is_empty() {
            confidence += 10;
        }
        if !snapshot.internal_transactions.is_empty() {
            confidence += 5;
        }
        confidence.min(95)
    }

    fn account_age_signal(snapshot: &WalletSnapshot) -> RiskSignal {
        let (score, description) = match snapshot.account_age_secs {
            None => (70, "No transaction history found, account age unknown".to_string()),
            Some(age) => {
                let days = age / DAY_SECS;
                let score = if days < 7 {
                    90
                } else if days < 30 {
                    60
                } else if days < 180 {
                    30
                } else {
                    10
                };
                (score, format!("Account is {} days old", days))
            }
        };
        let evidence = snapshot
            .first_tx_timestamp
            .map(|ts| vec![format!("first_tx_timestamp={}", ts)])
            .unwrap_or_default();
        RiskSignal {
            name: "Account Age".to_string(),
            weight: W_ACCOUNT_AGE,
            score,
            description,
            evidence,
        }
    }

    fn tx_volume_signal(snapshot: &WalletSnapshot) -> RiskSignal {
        let count = snapshot.tx_count;
        let (score, description) = if count == 0 {
            (50, "No transactions recorded".to_string())
        } else if count < 5 {
            (60, format!("Very low activity: {} transactions", count))
        } else if count < 20 {
            (30, format!("Low activity: {} transactions", count))
        } else if count > 500 {
            (40, format!("Extremely high activity: {} transactions (bot or mixer pattern)", count))
        } else {
            (10, format!("Normal activity: {} transactions", count))
        };
        RiskSignal {
            name: "Transaction Volume".to_string(),
            weight: W_TX_VOLUME,
            score,
            description,
            evidence: vec![format!("tx_count={}", count)],
        }
    }

    fn scam_db_signal(snapshot: &WalletSnapshot) -> RiskSignal {
        let count = snapshot.scam_flags.len();
        let score = if count == 0 {
            0
        } else {
            (count as u64 * 40).min(100) as u8
        };
        let description = if count == 0 {
            "No scam database matches".to_string()
        } else {
            format!("{} scam database flag(s)", count)
        };
        let evidence = snapshot
            .scam_flags
            .iter()
            .map(|f| format!("{}: {} ({})", f.source, f.description, f.category.as_str()))
            .collect();
        RiskSignal {
            name: "Scam Database".to_string(),
            weight: W_SCAM_DB,
            score,
            description,
            evidence,
        }
    }

    fn large_transfer_signal(snapshot: &WalletSnapshot, own_key: &str) -> RiskSignal {
        if snapshot.transactions.is_empty() {
            return RiskSignal {
                name: "Large Transfers".to_string(),
                weight: W_LARGE_TRANSFERS,
                score: 20,
                description: "No transactions to inspect".to_string(),
                evidence: Vec::new(),
            };
        }

        let one_native_unit = U256::from(1_000_000_000_000_000_000u128);
        let mut large_out: Vec<&crate::models::Transaction> = snapshot
            .transactions
            .iter()
            .filter(|tx| tx.from == own_key && !tx.is_error && tx.value_wei() > one_native_unit)
            .collect();
        large_out.sort_by_key(|tx| tx.timestamp);

        let clustered = large_out
            .windows(2)
            .any(|pair| pair[1].timestamp - pair[0].timestamp <= CLUSTER_WINDOW_SECS);

        let count = large_out.len();
        let (score, description) = if count >= 2 && clustered {
            (80, format!("{} large outgoing transfers clustered within one hour", count))
        } else if count > 5 {
            (50, format!("{} large outgoing transfers", count))
        } else if count >= 1 {
            (20, format!("{} large outgoing transfer(s)", count))
        } else {
            (5, "No large outgoing transfers".to_string())
        };

        let evidence = large_out
            .iter()
            .take(5)
            .map(|tx| format!("{} wei out at {}", tx.value, tx.timestamp))
            .collect();
        RiskSignal {
            name: "Large Transfers".to_string(),
            weight: W_LARGE_TRANSFERS,
            score,
            description,
            evidence,
        }
    }

    fn approval_signal(snapshot: &WalletSnapshot, own_key: &str) -> RiskSignal {
        let approvals: Vec<&crate::models::Transaction> = snapshot
            .transactions
            .iter()
            .filter(|tx| tx.from == own_key && is_approval(tx))
            .collect();
        let unlimited = approvals.iter().filter(|tx| is_unlimited_approval(tx)).count();
        let total = approvals.len();

        let (score, description) = if unlimited > 5 {
            (70, format!("{} unlimited token approvals", unlimited))
        } else if total > 10 {
            (50, format!("{} token approvals", total))
        } else if total > 0 {
            (15, format!("{} token approval(s), {} unlimited", total, unlimited))
        } else {
            (5, "No token approvals".to_string())
        };

        let evidence = approvals
            .iter()
            .take(5)
            .map(|tx| format!("approval tx {} to {:?}", tx.hash, tx.to))
            .collect();
        RiskSignal {
            name: "Contract Approvals".to_string(),
            weight: W_APPROVALS,
            score,
            description,
            evidence,
        }
    }

    fn funding_signal(snapshot: &WalletSnapshot, own_key: &str) -> RiskSignal {
        let incoming: Vec<&crate::models::Transaction> = snapshot
            .transactions
            .iter()
            .filter(|tx| tx.to.as_deref() == Some(own_key))
            .collect();

        if incoming.is_empty() {
            return RiskSignal {
                name: "Funding Source".to_string(),
                weight: W_FUNDING,
                score: 40,
                description: "No incoming transactions observed".to_string(),
                evidence: Vec::new(),
            };
        }

        let descriptions: Vec<String> = snapshot
            .scam_flags
            .iter()
            .map(|f| f.description.to_lowercase())
            .collect();
        let tainted_sender = incoming.iter().find(|tx| {
            descriptions.iter().any(|d| d.contains(&tx.from))
        });

        match tainted_sender {
            Some(tx) => RiskSignal {
                name: "Funding Source".to_string(),
                weight: W_FUNDING,
                score: 90,
                description: "Funded by an address matched in scam flags".to_string(),
                evidence: vec![format!("tainted sender {}", tx.from)],
            },
            None => RiskSignal {
                name: "Funding Source".to_string(),
                weight: W_FUNDING,
                score: 10,
                description: format!("{} incoming transactions, none from flagged senders", incoming.len()),
                evidence: Vec::new(),
            },
        }
    }

    fn token_diversity_signal(snapshot: &WalletSnapshot) -> RiskSignal {
        let distinct: std::collections::HashSet<&str> = snapshot
            .token_transfers
            .iter()
            .map(|t| t.token_address.as_str())
            .collect();
        let count = distinct.len();

        let (score, description) = if count == 0 {
            (15, "No token transfer history".to_string())
        } else if count > 50 {
            (60, format!("{} distinct tokens transferred (airdrop-farm pattern)", count))
        } else if count > 20 {
            (30, format!("{} distinct tokens transferred", count))
        } else {
            (10, format!("{} distinct token(s) transferred", count))
        };
        RiskSignal {
            name: "Token Diversity".to_string(),
            weight: W_TOKEN_DIVERSITY,
            score,
            description,
            evidence: vec![format!("distinct_tokens={}", count)],
        }
    }
}

fn is_approval(tx: &crate::models::Transaction) -> bool {
    if let Some(name) = &tx.function_name {
        if name.to_lowercase().contains("approve") {
            return true;
        }
    }
    tx.input.to_lowercase().starts_with(APPROVE_SELECTOR)
}

/// Max-uint256 amount argument: the calldata ends in 64 'f' nibbles
fn is_unlimited_approval(tx: &crate::models::Transaction) -> bool {
    is_approval(tx) && tx.input.to_lowercase().ends_with(&"f".repeat(64))
}
