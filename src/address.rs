//! Address validation and normalization.
//!
//! Invariant: every internal lookup key is the lowercase hex form; every
//! external-facing string is the EIP-55 checksummed form.

use alloy_primitives::Address;
use std::str::FromStr;

use crate::models::{AppError, AppResult};

/// Parse and validate an address string (any letter case, 0x prefix optional).
/// Rejected before any fetch begins.
pub fn parse(input: &str) -> AppResult<Address> {
    let trimmed = input.trim();
    let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    if hex_part.len() != 40 {
        return Err(AppError::invalid_address(format!(
            "Expected 40 hex characters, got {}",
            hex_part.len()
        )));
    }
    if !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AppError::invalid_address("Address contains non-hex characters"));
    }

    Address::from_str(&format!("0x{}", hex_part))
        .map_err(|e| AppError::invalid_address(e.to_string()))
}

/// Canonical mixed-case (EIP-55) form for display
pub fn checksum(addr: &Address) -> String {
    addr.to_checksum(None)
}

/// Lowercase 0x-prefixed form used for all internal map keys
pub fn key(addr: &Address) -> String {
    format!("0x{}", hex::encode(addr.as_slice()))
}

/// Lowercase an already-validated address string for key use
pub fn key_of(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Shortened display form: first 6 + last 4 hex characters
pub fn shorten(address: &str) -> String {
    if address.len() >= 12 {
        format!("{}…{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}

/// Find the first address-shaped token (0x + 40 hex) inside arbitrary text
pub fn extract_from_text(text: &str) -> Option<Address> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 42 <= bytes.len() {
        if bytes[i] == b'0' && (bytes[i + 1] == b'x' || bytes[i + 1] == b'X') {
            let candidate = &bytes[i + 2..i + 42];
            let all_hex = candidate.iter().all(|b| b.is_ascii_hexdigit());
            // Reject when the token continues with more hex (e.g. a tx hash)
            let bounded = i + 42 >= bytes.len() || !bytes[i + 42].is_ascii_hexdigit();
            if all_hex && bounded {
                if let Ok(addr) = parse(std::str::from_utf8(&bytes[i..i + 42]).ok()?) {
                    return Some(addr);
                }
            }
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";

    #[test]
    fn test_parse_valid() {
        assert!(parse(USDT).is_ok());
        assert!(parse(&USDT.to_lowercase()).is_ok());
        assert!(parse(&USDT.to_uppercase().replace("0X", "0x")).is_ok());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse("0x1234").is_err());
        assert!(parse("0xZZC17F958D2ee523a2206206994597C13D831ec7").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_checksum_round_trip() {
        // Lowercase and uppercase inputs both canonicalize to the same EIP-55 form
        let from_lower = parse(&USDT.to_lowercase()).unwrap();
        let from_mixed = parse(USDT).unwrap();
        assert_eq!(checksum(&from_lower), USDT);
        assert_eq!(checksum(&from_mixed), USDT);
    }

    #[test]
    fn test_key_is_lowercase() {
        let addr = parse(USDT).unwrap();
        assert_eq!(key(&addr), USDT.to_lowercase());
    }

    #[test]
    fn test_extract_from_text() {
        let text = format!("hey can you check {} for me? thanks", USDT);
        let addr = extract_from_text(&text).unwrap();
        assert_eq!(checksum(&addr), USDT);

        // Same address embedded uppercase extracts to the same canonical form
        let text_upper = format!("CHECK 0x{} NOW", USDT[2..].to_uppercase());
        let addr2 = extract_from_text(&text_upper).unwrap();
        assert_eq!(checksum(&addr2), USDT);
    }

    #[test]
    fn test_extract_skips_tx_hashes() {
        // 64 hex chars = transaction hash, not an address
        let text = "tx 0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa here";
        assert!(extract_from_text(text).is_none());
    }

    #[test]
    fn test_shorten() {
        assert_eq!(shorten(USDT), "0xdAC1…1ec7");
        assert_eq!(shorten("0xab"), "0xab");
    }
}
