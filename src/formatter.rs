//! Byte-bounded report rendering.
//!
//! Produces fixed-structure text for protocol surfaces with a hard byte
//! ceiling (default 1024 bytes of UTF-8). The disclaimer's byte cost is
//! reserved up front so truncation can never squeeze it out; only the body
//! is ever trimmed.

use crate::address;
use crate::models::RiskReport;

/// Protocol-imposed default ceiling
pub const DEFAULT_MAX_BYTES: usize = 1024;

/// Always present in rendered output, never truncated away
pub const DISCLAIMER: &str =
    "⚠️ Automated heuristic analysis, not financial advice. Always verify independently.";

/// Character budget for the summary section before assembly
const SUMMARY_CHAR_BUDGET: usize = 280;

const MAX_FINDINGS: usize = 3;
const MAX_INTERACTIONS: usize = 2;

pub struct ReportFormatter {
    max_bytes: usize,
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BYTES)
    }
}

impl ReportFormatter {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Render the report. Output is always <= the configured byte ceiling
    /// and always contains the disclaimer.
    pub fn render(&self, report: &RiskReport) -> String {
        let mut body = String::new();
        body.push_str("🛡️ WALLET RISK ANALYSIS\n");
        body.push_str(&format!(
            "📍 {} ({})\n",
            address::shorten(&report.address),
            report.chain
        ));
        body.push_str(&format!(
            "{} {} RISK: {}/100 (confidence {}%)\n",
            report.tier.marker(),
            report.tier.as_str(),
            report.score,
            report.confidence
        ));

        let summary = truncate_chars(&report.summary, SUMMARY_CHAR_BUDGET);
        if !summary.is_empty() {
            body.push('\n');
            body.push_str(&summary);
            body.push('\n');
        }

        if !report.key_findings.is_empty() {
            body.push_str("\nKey findings:\n");
            for finding in report.key_findings.iter().take(MAX_FINDINGS) {
                body.push_str(&format!("• {}\n", finding));
            }
        }

        if !report.top_interactions.is_empty() {
            body.push_str("\nTop interactions:\n");
            for interaction in report.top_interactions.iter().take(MAX_INTERACTIONS) {
                match &interaction.label {
                    Some(label) => body.push_str(&format!(
                        "• {}: {} txs ({})\n",
                        address::shorten(&interaction.address),
                        interaction.tx_count,
                        label
                    )),
                    None => body.push_str(&format!(
                        "• {}: {} txs\n",
                        address::shorten(&interaction.address),
                        interaction.tx_count
                    )),
                }
            }
        }

        // Disclaimer bytes reserved before any truncation decision
        let reserved = DISCLAIMER.len() + 2; // separator "\n\n"
        let body_budget = self.max_bytes.saturating_sub(reserved);
        let body = truncate_body(&body, body_budget);

        let mut out = body;
        out.push_str("\n\n");
        out.push_str(DISCLAIMER);
        out
    }
}

/// Trim to a character budget, appending an ellipsis when cut
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Trim the body to a byte budget. Prefers cutting at the last newline past
/// 70% of the retained length to avoid mid-sentence breaks, then appends an
/// ellipsis. Respects UTF-8 char boundaries.
fn truncate_body(body: &str, budget: usize) -> String {
    if body.len() <= budget {
        return body.trim_end().to_string();
    }
    let ellipsis_len = '…'.len_utf8();
    let mut cut = budget.saturating_sub(ellipsis_len);
    while cut > 0 && !body.is_char_boundary(cut) {
        cut -= 1;
    }

    let retained = &body[..cut];
    let floor = (cut * 7) / 10;
    let cut = match retained.rfind('\n') {
        Some(pos) if pos >= floor => pos,
        _ => cut,
    };

    let mut out = body[..cut].trim_end().to_string();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RiskReport, RiskTier, TopInteraction};

    fn report(summary: &str) -> RiskReport {
        RiskReport {
            address: "0xdAC17F958D2ee523a2206206994597C13D831ec7".into(),
            chain: "Ethereum".into(),
            tier: RiskTier::Medium,
            score: 45,
            confidence: 70,
            signals: Vec::new(),
            summary: summary.into(),
            key_findings: vec![
                "Account is 3 days old".into(),
                "2 unlimited token approvals".into(),
                "Funded by a flagged address".into(),
                "This fourth finding should never render".into(),
            ],
            top_interactions: vec![
                TopInteraction {
                    address: "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D".into(),
                    label: Some("Uniswap V2 Router".into()),
                    tx_count: 12,
                },
                TopInteraction {
                    address: "0x1234567890123456789012345678901234567890".into(),
                    label: None,
                    tx_count: 4,
                },
            ],
            recommendations: Vec::new(),
            disclaimer: DISCLAIMER.into(),
            analyzed_at: 1_700_000_000,
            elapsed_ms: 1200,
        }
    }

    #[test]
    fn test_render_within_ceiling() {
        let formatter = ReportFormatter::default();
        for summary in [
            "",
            "Short summary.",
            &"A sentence that repeats. ".repeat(20),
            &"многобайтовый текст 🚀 ".repeat(60),
        ] {
            let out = formatter.render(&report(summary));
            assert!(out.len() <= DEFAULT_MAX_BYTES, "rendered {} bytes", out.len());
            assert!(out.contains(DISCLAIMER));
        }
    }

    #[test]
    fn test_render_structure() {
        let out = ReportFormatter::default().render(&report("A normal summary."));
        assert!(out.contains("0xdAC1…1ec7"));
        assert!(out.contains("MEDIUM RISK: 45/100"));
        assert!(out.contains("Key findings:"));
        assert!(out.contains("Uniswap V2 Router"));
        // Only the first three findings render
        assert!(!out.contains("fourth finding"));
    }

    #[test]
    fn test_tight_ceiling_keeps_disclaimer() {
        let formatter = ReportFormatter::new(DISCLAIMER.len() + 40);
        let out = formatter.render(&report(&"long ".repeat(100)));
        assert!(out.len() <= DISCLAIMER.len() + 40);
        assert!(out.contains(DISCLAIMER));
    }

    #[test]
    fn test_truncation_prefers_newline() {
        // Newline at byte 100 sits past 70% of the retained length, so the
        // cut lands there instead of mid-word
        let body = format!("{}\n{}", "a".repeat(100), "b".repeat(10));
        let out = truncate_body(&body, 105);
        assert_eq!(out, format!("{}…", "a".repeat(100)));
    }

    #[test]
    fn test_truncation_ignores_early_newline() {
        // Newline at byte 5 is before the 70% floor, so the cut is byte-exact
        let body = format!("{}\n{}", "a".repeat(5), "b".repeat(100));
        let out = truncate_body(&body, 50);
        assert!(out.ends_with('…'));
        assert!(out.len() <= 50);
        assert!(out.contains('b'));
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        let text = "ünïcödé summary with ärrows";
        let out = truncate_chars(text, 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with('…'));
    }
}
