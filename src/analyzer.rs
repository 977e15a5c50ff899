//! Pipeline façade.
//!
//! Wires the aggregator, scoring engine, registry, cache, and limiters into
//! the single `analyze` operation exposed to calling surfaces. Callers
//! always receive either a complete `RiskReport` or a typed error, never a
//! half-built report.

use eyre::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::address;
use crate::aggregator::WalletAggregator;
use crate::cache::TtlCache;
use crate::config::Config;
use crate::formatter::{ReportFormatter, DISCLAIMER};
use crate::limiter::{CallRateLimiter, QueryRateLimiter};
use crate::models::{AppError, AppResult, RiskReport, RiskTier, TopInteraction, WalletSnapshot};
use crate::providers::{ExplorerClient, ProviderRotator};
use crate::registry::ScamRegistry;
use crate::scoring::{RiskEngine, ScoreOutcome};
use crate::summary::{redact_unknown_addresses, Summarizer, TemplateSummarizer};

pub struct WalletAnalyzer {
    chain_name: String,
    aggregator: WalletAggregator,
    registry: Arc<ScamRegistry>,
    cache: TtlCache<RiskReport>,
    query_limiter: QueryRateLimiter,
    summarizer: Box<dyn Summarizer + Send + Sync>,
    formatter: ReportFormatter,
}

impl WalletAnalyzer {
    /// Construct the full pipeline from config. Registries are owned service
    /// objects built here, not ambient globals, so tests can construct fresh
    /// instances.
    pub fn new(config: &Config) -> Result<Self> {
        let explorer_limiter = Arc::new(CallRateLimiter::new(
            config.explorer_max_calls,
            config.explorer_window,
        ));
        let explorer = Arc::new(ExplorerClient::new(
            config.explorer_base_url.clone(),
            config.explorer_api_key.clone(),
            config.chain_id,
            config.http_timeout,
            explorer_limiter,
        )?);
        let rotator = Arc::new(ProviderRotator::new(
            config.providers.clone(),
            config.http_timeout,
        )?);
        let registry = Arc::new(ScamRegistry::with_defaults(
            config.remote_registry_url.clone(),
            config.remote_registry_timeout,
        )?);

        Ok(Self {
            chain_name: config.chain_name.clone(),
            aggregator: WalletAggregator::new(explorer, rotator, Arc::clone(&registry), config),
            registry,
            cache: TtlCache::new(config.cache_ttl),
            query_limiter: QueryRateLimiter::new(config.query_limit, config.query_window),
            summarizer: Box::new(TemplateSummarizer),
            formatter: ReportFormatter::new(config.report_max_bytes),
        })
    }

    /// Swap in a different summary backend (must redact through the same
    /// post-processor; `analyze` applies it unconditionally).
    pub fn with_summarizer(mut self, summarizer: Box<dyn Summarizer + Send + Sync>) -> Self {
        self.summarizer = summarizer;
        self
    }

    /// The single exposed operation: full pipeline for one address.
    pub async fn analyze(&self, input: &str) -> AppResult<RiskReport> {
        let addr = address::parse(input)?;
        let key = address::key(&addr);

        if let Some(report) = self.cache.get(&key) {
            info!("✅ Serving cached report for {}", report.address);
            return Ok(report);
        }

        let started = Instant::now();
        let snapshot = self.aggregator.fetch(&addr).await;
        let outcome = RiskEngine::score(&snapshot);

        let top_interactions = self.top_interactions(&snapshot);
        let key_findings = key_findings(&snapshot, &outcome);
        let recommendations = recommendations(outcome.tier);

        // Any address-shaped token in the summary must come from verified facts
        let known = known_addresses(&key, &snapshot);
        let summary = redact_unknown_addresses(
            &self.summarizer.summarize(&snapshot, &outcome),
            &known,
        );

        let report = RiskReport {
            address: snapshot.address.clone(),
            chain: self.chain_name.clone(),
            tier: outcome.tier,
            score: outcome.score,
            confidence: outcome.confidence,
            signals: outcome.signals,
            summary,
            key_findings,
            top_interactions,
            recommendations,
            disclaimer: DISCLAIMER.to_string(),
            analyzed_at: chrono::Utc::now().timestamp(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        self.cache.set(&key, report.clone());
        info!(
            "📊 {} scored {}/100 ({}) in {}ms",
            report.address,
            report.score,
            report.tier.as_str(),
            report.elapsed_ms
        );
        Ok(report)
    }

    /// Identity-gated analyze for open, unauthenticated surfaces
    pub async fn analyze_for(&self, identity: &str, input: &str) -> AppResult<RiskReport> {
        if !self.query_limiter.check_and_record(identity) {
            return Err(AppError::rate_limited(identity));
        }
        self.analyze(input).await
    }

    /// Cache accessor so a calling layer can short-circuit repeats without
    /// re-running the pipeline
    pub fn cached(&self, input: &str) -> Option<RiskReport> {
        let addr = address::parse(input).ok()?;
        self.cache.get(&address::key(&addr))
    }

    /// Byte-bounded rendering for display surfaces
    pub fn format_for_display(&self, report: &RiskReport) -> String {
        self.formatter.render(report)
    }

    pub fn registry(&self) -> &ScamRegistry {
        &self.registry
    }

    /// Most frequent counterparts, labeled via the whitelist
    fn top_interactions(&self, snapshot: &WalletSnapshot) -> Vec<TopInteraction> {
        let own_key = snapshot.address.to_lowercase();
        let mut counts: HashMap<String, u64> = HashMap::new();
        for tx in snapshot
            .transactions
            .iter()
            .chain(snapshot.internal_transactions.iter())
        {
            for side in [Some(&tx.from), tx.to.as_ref()].into_iter().flatten() {
                if *side != own_key {
                    *counts.entry(side.clone()).or_default() += 1;
                }
            }
        }
        for transfer in &snapshot.token_transfers {
            for side in [Some(&transfer.from), transfer.to.as_ref()].into_iter().flatten() {
                if *side != own_key {
                    *counts.entry(side.clone()).or_default() += 1;
                }
            }
        }

        let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
            .into_iter()
            .take(5)
            .map(|(addr_key, tx_count)| {
                let display = address::parse(&addr_key)
                    .map(|a| address::checksum(&a))
                    .unwrap_or_else(|_| addr_key.clone());
                TopInteraction {
                    label: self.registry.whitelist_label(&addr_key),
                    address: display,
                    tx_count,
                }
            })
            .collect()
    }
}

/// Lowercase fact set used to vet addresses mentioned in summaries
fn known_addresses(own_key: &str, snapshot: &WalletSnapshot) -> HashSet<String> {
    let mut known = HashSet::new();
    known.insert(own_key.to_string());
    for tx in snapshot
        .transactions
        .iter()
        .chain(snapshot.internal_transactions.iter())
    {
        known.insert(tx.from.clone());
        if let Some(to) = &tx.to {
            known.insert(to.clone());
        }
    }
    for transfer in &snapshot.token_transfers {
        known.insert(transfer.from.clone());
        if let Some(to) = &transfer.to {
            known.insert(to.clone());
        }
        known.insert(transfer.token_address.clone());
    }
    known
}

/// Ordered key findings: direct flags first, then any strong signal
fn key_findings(snapshot: &WalletSnapshot, outcome: &ScoreOutcome) -> Vec<String> {
    let mut findings: Vec<String> = snapshot
        .scam_flags
        .iter()
        .take(3)
        .map(|f| format!("{} flag: {}", f.category.as_str(), f.description))
        .collect();
    for signal in &outcome.signals {
        if signal.score >= 60 && signal.name != "Scam Database" {
            findings.push(signal.description.clone());
        }
    }
    findings.truncate(5);
    findings
}

fn recommendations(tier: RiskTier) -> Vec<String> {
    match tier {
        RiskTier::Low => vec![
            "Proceed with standard caution.".to_string(),
        ],
        RiskTier::Medium => vec![
            "Review recent transactions before interacting.".to_string(),
            "Prefer small test amounts for first transfers.".to_string(),
        ],
        RiskTier::High => vec![
            "Avoid sending funds to this address.".to_string(),
            "Revoke any token approvals granted to it.".to_string(),
            "Report supporting evidence to a community registry.".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScamCategory, ScamFlag};

    fn flagged_snapshot() -> WalletSnapshot {
        let mut snapshot =
            WalletSnapshot::empty("0xdAC17F958D2ee523a2206206994597C13D831ec7");
        snapshot.scam_flags.push(ScamFlag {
            source: "local".into(),
            category: ScamCategory::Phishing,
            description: "reported phishing campaign".into(),
            reported_at: None,
        });
        snapshot
    }

    #[test]
    fn test_key_findings_flags_first() {
        let snapshot = flagged_snapshot();
        let outcome = RiskEngine::score(&snapshot);
        let findings = key_findings(&snapshot, &outcome);
        assert!(findings[0].contains("phishing flag"));
        assert!(findings.len() <= 5);
    }

    #[test]
    fn test_recommendations_scale_with_tier() {
        assert_eq!(recommendations(RiskTier::Low).len(), 1);
        assert!(recommendations(RiskTier::High).len() >= 3);
    }

    #[test]
    fn test_known_addresses_include_counterparts() {
        let mut snapshot = flagged_snapshot();
        snapshot.transactions.push(crate::models::Transaction {
            block_number: 1,
            timestamp: 1,
            hash: "0xh".into(),
            from: "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb".into(),
            to: Some("0xdac17f958d2ee523a2206206994597c13d831ec7".into()),
            value: "0".into(),
            gas: 0,
            gas_used: 0,
            is_error: false,
            function_name: None,
            contract_created: None,
            input: "0x".into(),
        });
        let known = known_addresses("0xdac17f958d2ee523a2206206994597c13d831ec7", &snapshot);
        assert!(known.contains("0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"));
        assert!(known.contains("0xdac17f958d2ee523a2206206994597c13d831ec7"));
    }
}
