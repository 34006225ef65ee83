//! Phone and email normalization
//!
//! The normalized phone is the only key used to group accounts for
//! deduplication and to look accounts up at login. Normalization is total
//! (never fails) and idempotent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Venezuelan country calling code
const COUNTRY_CODE: &str = "58";

/// Number of significant digits kept in a phone key
const KEY_LEN: usize = 10;

/// Canonicalize a raw phone string into a comparable key.
///
/// Steps, in order:
/// 1. keep ASCII digits only
/// 2. strip a leading `58` when the result is 12 or 13 digits long
/// 3. strip a leading `0` when the result is longer than 10 digits
/// 4. keep the last 10 digits if still longer
///
/// `None` yields an empty string.
pub fn normalize_phone(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };

    let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    if digits.starts_with(COUNTRY_CODE) && (12..=13).contains(&digits.len()) {
        digits.replace_range(..COUNTRY_CODE.len(), "");
    }

    if digits.starts_with('0') && digits.len() > KEY_LEN {
        digits.remove(0);
    }

    if digits.len() > KEY_LEN {
        let excess = digits.len() - KEY_LEN;
        digits.replace_range(..excess, "");
    }

    digits
}

/// Canonicalize an email into the merge key (trimmed, lowercase).
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalized phone key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneKey(String);

impl PhoneKey {
    /// Build a key from a raw phone string
    pub fn new(raw: &str) -> Self {
        Self(normalize_phone(Some(raw)))
    }

    /// Get the key as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty key never groups with anything
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PhoneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
