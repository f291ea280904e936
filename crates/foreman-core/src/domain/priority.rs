//! Priority values and the suggested default tiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ForemanError;

/// Numeric priority; higher values are dequeued sooner.
///
/// Invariant: the inner value is a finite number > 0, enforced on every
/// construction and mutation. Kept as `f64` because the anti-starvation
/// boost multiplies it, and multipliers are not required to be integral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Priority(f64);

impl Priority {
    pub fn new(value: f64) -> Result<Self, ForemanError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(ForemanError::InvalidPriority(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// The priority after a boost by `multiplier`, validated.
    ///
    /// A boost must move the value up: `multiplier` has to be a finite
    /// number > 1. Fails if the result would overflow to a non-finite
    /// value, so a caller can check a whole batch before committing any
    /// of it.
    pub fn boosted(&self, multiplier: f64) -> Result<Self, ForemanError> {
        if !multiplier.is_finite() || multiplier <= 1.0 {
            return Err(ForemanError::InvalidPriority(multiplier));
        }
        Self::new(self.0 * multiplier)
    }

    /// Total order over valid priorities (no NaN can be constructed).
    pub fn total_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for Priority {
    type Error = ForemanError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for f64 {
    fn from(p: Priority) -> f64 {
        p.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Suggested priority tiers for callers that don't want to pick raw numbers.
///
/// These mirror the admission classes of the original build-infra system:
/// forced reruns outrank failure analysis, which outranks flake analysis,
/// which outranks plain API-driven requests. Convenience only; the queue
/// contract takes any valid `Priority`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityClass {
    Force,
    Failure,
    Flake,
    ApiCall,
}

impl PriorityClass {
    pub fn priority(self) -> Priority {
        let value = match self {
            PriorityClass::Force => 100.0,
            PriorityClass::Failure => 50.0,
            PriorityClass::Flake => 25.0,
            PriorityClass::ApiCall => 10.0,
        };
        Priority(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::zero(0.0)]
    #[case::negative(-1.0)]
    #[case::nan(f64::NAN)]
    #[case::infinite(f64::INFINITY)]
    fn rejects_invalid_values(#[case] value: f64) {
        assert!(matches!(
            Priority::new(value),
            Err(ForemanError::InvalidPriority(_))
        ));
    }

    #[test]
    fn boost_multiplies() {
        let p = Priority::new(3.0).unwrap();
        assert_eq!(p.boosted(2.0).unwrap().value(), 6.0);
    }

    #[rstest]
    #[case::identity(1.0)]
    #[case::shrinking(0.5)]
    #[case::nan(f64::NAN)]
    fn boost_rejects_non_increasing_multipliers(#[case] multiplier: f64) {
        let p = Priority::new(3.0).unwrap();
        assert!(matches!(
            p.boosted(multiplier),
            Err(ForemanError::InvalidPriority(_))
        ));
    }

    #[test]
    fn boost_rejects_overflow_to_infinity() {
        let p = Priority::new(f64::MAX).unwrap();
        assert!(matches!(
            p.boosted(2.0),
            Err(ForemanError::InvalidPriority(_))
        ));
    }

    #[test]
    fn tiers_are_ordered_by_urgency() {
        let force = PriorityClass::Force.priority();
        let failure = PriorityClass::Failure.priority();
        let flake = PriorityClass::Flake.priority();
        let api = PriorityClass::ApiCall.priority();

        assert!(force.value() > failure.value());
        assert!(failure.value() > flake.value());
        assert!(flake.value() > api.value());
    }

    #[test]
    fn serde_round_trip_validates() {
        let p = Priority::new(7.5).unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "7.5");
        let back: Priority = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);

        // 不正値は deserialize でも弾く
        assert!(serde_json::from_str::<Priority>("-1.0").is_err());
    }
}
