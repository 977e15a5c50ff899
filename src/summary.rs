//! Report summary generation.
//!
//! Summaries are an optional enrichment that must never alter computed
//! facts. The trait keeps the generative backend pluggable: the template
//! implementation here is deterministic and always available, and any
//! external generative implementation must route its output through
//! `redact_unknown_addresses` before use.

use std::collections::HashSet;

use crate::address;
use crate::models::{RiskTier, WalletSnapshot};
use crate::scoring::ScoreOutcome;

/// Replacement marker for hallucinated addresses
const REDACTION_MARKER: &str = "[redacted]";

/// Produces the natural-language summary for a report.
/// Implementations receive only already-computed facts as context.
pub trait Summarizer {
    fn summarize(&self, snapshot: &WalletSnapshot, outcome: &ScoreOutcome) -> String;
}

/// Deterministic template summarizer. Always available; also the fallback
/// when a generative backend fails.
pub struct TemplateSummarizer;

impl Summarizer for TemplateSummarizer {
    fn summarize(&self, snapshot: &WalletSnapshot, outcome: &ScoreOutcome) -> String {
        let short = address::shorten(&snapshot.address);
        let kind = if snapshot.is_contract { "contract" } else { "wallet" };
        let age = match snapshot.account_age_secs {
            Some(secs) => format!("{} days old", secs / 86_400),
            None => "of unknown age".to_string(),
        };

        let mut parts = vec![format!(
            "{} is a {} {} with {} recorded transactions.",
            short, age, kind, snapshot.tx_count
        )];

        let flag_count = snapshot.scam_flags.len();
        if flag_count > 0 {
            parts.push(format!(
                "It carries {} scam flag(s), including: {}.",
                flag_count, snapshot.scam_flags[0].description
            ));
        } else {
            parts.push("No scam database matches were found.".to_string());
        }

        // Lead with the strongest non-database signal
        if let Some(strongest) = outcome
            .signals
            .iter()
            .filter(|s| s.name != "Scam Database")
            .max_by_key(|s| s.score)
        {
            if strongest.score >= 40 {
                parts.push(format!("Most notable signal: {}.", strongest.description));
            }
        }

        parts.push(match outcome.tier {
            RiskTier::Low => "Overall activity looks consistent with normal usage.".to_string(),
            RiskTier::Medium => "Several signals warrant caution before interacting.".to_string(),
            RiskTier::High => "Multiple signals indicate elevated risk; avoid interacting.".to_string(),
        });

        parts.join(" ")
    }
}

/// Replace any address-shaped token that does not appear in the verified
/// fact set with a redaction marker, preserving the surrounding context.
/// `known` holds lowercase address keys.
pub fn redact_unknown_addresses(text: &str, known: &HashSet<String>) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < bytes.len() {
        let is_candidate = i + 42 <= bytes.len()
            && bytes[i] == b'0'
            && (bytes[i + 1] == b'x' || bytes[i + 1] == b'X')
            && bytes[i + 2..i + 42].iter().all(|b| b.is_ascii_hexdigit())
            && (i + 42 >= bytes.len() || !bytes[i + 42].is_ascii_hexdigit());
        if is_candidate {
            let token = &text[i..i + 42];
            if known.contains(&token.to_lowercase()) {
                out.push_str(token);
            } else {
                out.push_str(REDACTION_MARKER);
            }
            i += 42;
        } else {
            // i always lands on a char boundary; the candidate branch only
            // consumes ASCII
            match text[i..].chars().next() {
                Some(ch) => {
                    out.push(ch);
                    i += ch.len_utf8();
                }
                None => break,
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WalletSnapshot;
    use crate::scoring::RiskEngine;

    const OWN: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";

    #[test]
    fn test_template_summary_mentions_facts() {
        let mut snapshot = WalletSnapshot::empty(OWN);
        snapshot.tx_count = 42;
        snapshot.account_age_secs = Some(100 * 86_400);
        let outcome = RiskEngine::score(&snapshot);
        let summary = TemplateSummarizer.summarize(&snapshot, &outcome);
        assert!(summary.contains("42"));
        assert!(summary.contains("100 days old"));
        assert!(summary.contains("No scam database matches"));
    }

    #[test]
    fn test_redaction_of_unknown_address() {
        let known: HashSet<String> = [OWN.to_lowercase()].into_iter().collect();
        let text = format!(
            "Funds moved from {} to 0x1234567890123456789012345678901234567890 yesterday.",
            OWN
        );
        let redacted = redact_unknown_addresses(&text, &known);
        assert!(redacted.contains(OWN));
        assert!(redacted.contains("[redacted]"));
        assert!(!redacted.contains("0x1234567890123456789012345678901234567890"));
        assert!(redacted.ends_with("yesterday."));
    }

    #[test]
    fn test_redaction_preserves_plain_text() {
        let known = HashSet::new();
        let text = "No addresses here, just 0x prefix talk and unicode: é…";
        assert_eq!(redact_unknown_addresses(text, &known), text);
    }
}
