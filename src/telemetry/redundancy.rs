//! # Redundancy Resolver
//!
//! Reconciles primary and redundant readings of the same physical
//! quantity into one authoritative value.
//!
//! The flight computer carries a redundant sensor set; its readings
//! arrive either as `_R`-suffixed channels in live frames or as
//! `_R`-suffixed columns in wide-table mission CSVs. The ground side
//! trusts the primary reading unless it is absent, NaN, or exactly
//! zero, in which case the redundant reading is substituted.
//!
//! NOTE: zero is treated as "primary sensor failed to report", not as a
//! legitimately measured zero. This rule is inherited from the flight
//! firmware contract and is preserved exactly; a real zero reading is
//! indistinguishable from a failure under it.

/// Which candidate supplied the authoritative value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The primary sensor reading was used
    Primary,
    /// The redundant (fallback) reading was substituted
    Redundant,
}

/// Outcome of resolving one logical channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    /// The authoritative value; `None` when neither candidate has one
    pub value: Option<f64>,
    /// Which candidate the value came from
    pub source: Source,
}

/// Resolve one logical channel from its primary and redundant candidates.
///
/// Pure and stateless: the primary value wins unless it is absent, NaN,
/// or exactly zero. When the fallback triggers but the redundant value
/// is itself absent, the (absent or zero) primary candidate is returned
/// unchanged; resolution never fails.
///
/// # Arguments
///
/// * `primary` - Primary sensor candidate, if present in the record
/// * `redundant` - Redundant sensor candidate, if present
///
/// # Examples
///
/// ```
/// use ground_link::telemetry::redundancy::{resolve, Source};
///
/// let r = resolve(Some(0.0), Some(3.7));
/// assert_eq!(r.value, Some(3.7));
/// assert_eq!(r.source, Source::Redundant);
/// ```
pub fn resolve(primary: Option<f64>, redundant: Option<f64>) -> Resolution {
    let primary_failed = match primary {
        None => true,
        Some(v) => v.is_nan() || v == 0.0,
    };

    if primary_failed {
        if let Some(fallback) = redundant {
            return Resolution {
                value: Some(fallback),
                source: Source::Redundant,
            };
        }
    }

    Resolution {
        value: primary,
        source: Source::Primary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_wins_when_present() {
        let r = resolve(Some(21.4), Some(20.9));
        assert_eq!(r.value, Some(21.4));
        assert_eq!(r.source, Source::Primary);
    }

    #[test]
    fn test_absent_primary_uses_redundant() {
        let r = resolve(None, Some(20.9));
        assert_eq!(r.value, Some(20.9));
        assert_eq!(r.source, Source::Redundant);
    }

    #[test]
    fn test_zero_primary_uses_redundant() {
        let r = resolve(Some(0.0), Some(20.9));
        assert_eq!(r.value, Some(20.9));
        assert_eq!(r.source, Source::Redundant);
    }

    #[test]
    fn test_nan_primary_uses_redundant() {
        let r = resolve(Some(f64::NAN), Some(20.9));
        assert_eq!(r.value, Some(20.9));
        assert_eq!(r.source, Source::Redundant);
    }

    #[test]
    fn test_both_absent_is_absent_not_error() {
        let r = resolve(None, None);
        assert_eq!(r.value, None);
        assert_eq!(r.source, Source::Primary);
    }

    #[test]
    fn test_zero_primary_no_redundant_stays_zero() {
        let r = resolve(Some(0.0), None);
        assert_eq!(r.value, Some(0.0));
        assert_eq!(r.source, Source::Primary);
    }

    #[test]
    fn test_negative_primary_is_valid() {
        // Only exact zero triggers the fallback
        let r = resolve(Some(-4.2), Some(1.0));
        assert_eq!(r.value, Some(-4.2));
        assert_eq!(r.source, Source::Primary);
    }

    #[test]
    fn test_zero_redundant_is_substituted_as_is() {
        // The fallback is not re-checked against the zero rule
        let r = resolve(None, Some(0.0));
        assert_eq!(r.value, Some(0.0));
        assert_eq!(r.source, Source::Redundant);
    }
}
