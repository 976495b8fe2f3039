//! Canonical postal-code keys.
//!
//! Every cache key in the system is produced here. The canonicalization
//! must be stable across calls: any spacing/case variant of the same six
//! characters yields the identical key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::POSTAL_CODE_COMPACT_LEN;
use crate::error::{PrizmError, Result};

/// A validated Canadian postal code in canonical `"A1A 1A1"` form.
///
/// Can only be constructed through [`PostalCode::parse`], so holding one
/// is proof the code is well-formed. Equality is exact string equality on
/// the canonical form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostalCode(String);

impl PostalCode {
    /// Parses and canonicalizes a raw input string.
    ///
    /// Strips surrounding whitespace and internal spaces, upper-cases,
    /// then requires exactly six characters alternating letter/digit
    /// (positions 0, 2, 4 alphabetic; 1, 3, 5 numeric). The canonical
    /// form re-inserts a single space after the third character.
    pub fn parse(raw: &str) -> Result<Self> {
        let compact = raw.trim().to_uppercase().replace(' ', "");

        if compact.len() != POSTAL_CODE_COMPACT_LEN {
            return Err(PrizmError::InvalidPostalCode(raw.trim().to_string()));
        }

        for (i, ch) in compact.chars().enumerate() {
            let ok = if i % 2 == 0 {
                ch.is_ascii_alphabetic()
            } else {
                ch.is_ascii_digit()
            };
            if !ok {
                return Err(PrizmError::InvalidPostalCode(raw.trim().to_string()));
            }
        }

        Ok(Self(format!("{} {}", &compact[..3], &compact[3..])))
    }

    /// Returns the canonical `"A1A 1A1"` form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the code, returning the canonical string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PostalCode {
    type Err = PrizmError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for PostalCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalizes an arbitrary raw input into a stable cache identity.
///
/// Invalid inputs never become a [`PostalCode`], but their format verdict
/// is still cached; this is the key they are cached under. For inputs that
/// do validate, the canonical form is the key instead.
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_scenario() {
        let code = PostalCode::parse("v8a 2p4").unwrap();
        assert_eq!(code.as_str(), "V8A 2P4");
    }

    #[test]
    fn test_parse_variants_canonicalize_identically() {
        let variants = ["V8A 2P4", "v8a 2p4", "V8A2P4", "  v8A2p4  ", "V 8 A 2 P 4"];
        for raw in variants {
            assert_eq!(
                PostalCode::parse(raw).unwrap().as_str(),
                "V8A 2P4",
                "variant {raw:?} must canonicalize identically"
            );
        }
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!(PostalCode::parse("12345").is_err());
        assert!(PostalCode::parse("V8A 2P").is_err());
        assert!(PostalCode::parse("V8A 2P4X").is_err());
        assert!(PostalCode::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_wrong_alternation() {
        // digits where letters belong and vice versa
        assert!(PostalCode::parse("123456").is_err());
        assert!(PostalCode::parse("ABCDEF").is_err());
        assert!(PostalCode::parse("1A1A1A").is_err());
        assert!(PostalCode::parse("V8A 2PP").is_err());
    }

    #[test]
    fn test_parse_rejects_non_ascii() {
        assert!(PostalCode::parse("Ñ8A 2P4").is_err());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = PostalCode::parse("m5v2h1").unwrap();
        let b = PostalCode::parse("M5V 2H1").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_str() {
        let code: PostalCode = "h0h 0h0".parse().unwrap();
        assert_eq!(code.to_string(), "H0H 0H0");
    }

    #[test]
    fn test_serde_transparent() {
        let code = PostalCode::parse("V8A 2P4").unwrap();
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"V8A 2P4\"");

        let back: PostalCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn test_normalize_key_for_invalid_input() {
        assert_eq!(normalize_key("  12345 "), "12345");
        assert_eq!(normalize_key("invalid"), "INVALID");
    }
}
