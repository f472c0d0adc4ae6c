//! Stable event identity across repeated scrapes.
//!
//! An event's calendar slot does not change when the source revises its
//! `actual`/`forecast`/`previous` values after publication. The identity key
//! therefore hashes only the immutable attributes — timestamp, currency, and
//! name — so re-scrapes of a revised event collapse onto one row instead of
//! silently forking. Collisions between two unnamed events at the same slot
//! with literally identical value labels are an accepted approximation.

use crate::models::TIMESTAMP_FORMAT;
use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Derive the stable content hash for an event.
///
/// Deterministic across runs and platforms: SHA-256 over the UTF-8
/// concatenation of the canonical timestamp, currency, and
/// name-or-fallback, hex-encoded to 64 lowercase characters.
pub fn identity_key(timestamp: &NaiveDateTime, currency: &str, name_or_fallback: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.format(TIMESTAMP_FORMAT).to_string().as_bytes());
    hasher.update(currency.as_bytes());
    hasher.update(name_or_fallback.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

/// The identity name for an event: its title when present, otherwise a
/// deterministic composite of the value labels.
///
/// The composite deliberately uses the labels as-is; two unnamed events at
/// the same time/currency with identical actual/forecast/previous collide
/// predictably.
pub fn name_or_fallback(name: &str, actual: &str, forecast: &str, previous: &str) -> String {
    if name.is_empty() {
        format!("actual:{actual}|forecast:{forecast}|previous:{previous}")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_identity_key_is_deterministic() {
        let a = identity_key(&ts(), "USD", "Non-Farm Payrolls");
        let b = identity_key(&ts(), "USD", "Non-Farm Payrolls");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_identity_key_varies_with_inputs() {
        let base = identity_key(&ts(), "USD", "Non-Farm Payrolls");
        assert_ne!(base, identity_key(&ts(), "EUR", "Non-Farm Payrolls"));
        assert_ne!(base, identity_key(&ts(), "USD", "CPI m/m"));
        let other_ts = ts() + chrono::Duration::minutes(30);
        assert_ne!(base, identity_key(&other_ts, "USD", "Non-Farm Payrolls"));
    }

    #[test]
    fn test_revised_values_never_change_the_key() {
        // The key sees only the name-or-fallback, so a revision to
        // actual/forecast/previous on a *named* event cannot fork it.
        let before = identity_key(
            &ts(),
            "USD",
            &name_or_fallback("CPI m/m", "0.1%", "0.2%", "0.3%"),
        );
        let after = identity_key(
            &ts(),
            "USD",
            &name_or_fallback("CPI m/m", "0.4%", "0.2%", "0.3%"),
        );
        assert_eq!(before, after);
    }

    #[test]
    fn test_unnamed_event_falls_back_to_value_composite() {
        let fallback = name_or_fallback("", "1.2%", "1.1%", "1.0%");
        assert_eq!(fallback, "actual:1.2%|forecast:1.1%|previous:1.0%");
        // Two unnamed events with identical labels collide, by design.
        assert_eq!(
            identity_key(&ts(), "GBP", &fallback),
            identity_key(&ts(), "GBP", &name_or_fallback("", "1.2%", "1.1%", "1.0%"))
        );
    }
}
