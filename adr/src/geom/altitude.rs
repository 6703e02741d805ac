// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// The altitude reference of an [`AltLimit`] endpoint.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum AltMode {
    /// Referenced to local QNH, value in feet.
    Qnh,
    /// Standard pressure altitude (flight level), value in feet.
    Std,
    /// Height above a surface, value in feet.
    Height,
    /// Defers to the evaluated airspace's floor (`FLOOR` sentinel).
    Floor,
    /// Defers to the evaluated airspace's ceiling (`CEILING` sentinel).
    Ceiling,
}

/// One endpoint of an [`AltRange`].
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AltLimit {
    pub mode: AltMode,
    /// Altitude in feet, or flight level in feet-equivalent (`FL × 100`).
    pub value: i32,
}

impl AltLimit {
    pub const GND: Self = Self {
        mode: AltMode::Height,
        value: 0,
    };

    pub const UNL: Self = Self {
        mode: AltMode::Std,
        value: i32::MAX,
    };

    pub const FLOOR: Self = Self {
        mode: AltMode::Floor,
        value: 0,
    };

    pub const CEILING: Self = Self {
        mode: AltMode::Ceiling,
        value: i32::MAX,
    };

    pub fn new(mode: AltMode, value: i32) -> Self {
        Self { mode, value }
    }

    /// Resolves `Floor`/`Ceiling` against the actual airspace envelope
    /// `(floor_ft, ceiling_ft)`; other modes are returned as-is.
    fn resolved(&self, floor_ft: i32, ceiling_ft: i32) -> i32 {
        match self.mode {
            AltMode::Floor => floor_ft,
            AltMode::Ceiling => ceiling_ft,
            _ => self.value,
        }
    }
}

/// Two independent altitude endpoints, lower and upper.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AltRange {
    pub lower: AltLimit,
    pub upper: AltLimit,
    /// Complement flag set by [`AltRange::invert`]; `contains` negates its
    /// result while this is set.
    inverted: bool,
}

impl AltRange {
    pub const UNL: Self = Self {
        lower: AltLimit::GND,
        upper: AltLimit::UNL,
        inverted: false,
    };

    pub fn new(lower: AltLimit, upper: AltLimit) -> Self {
        Self {
            lower,
            upper,
            inverted: false,
        }
    }

    /// Returns the tightest intersection of `self` and `other`.
    ///
    /// `Floor`/`Ceiling` sentinels are compared positionally (a `Floor`
    /// lower bound never loosens another range's lower bound) since they
    /// can only be resolved against a specific airspace envelope.
    pub fn merge(&self, other: &AltRange) -> AltRange {
        let lower = if self.lower.value >= other.lower.value {
            self.lower
        } else {
            other.lower
        };
        let upper = if self.upper.value <= other.upper.value {
            self.upper
        } else {
            other.upper
        };
        AltRange {
            lower,
            upper,
            inverted: false,
        }
    }

    /// Flips mode inclusion: a subsequent `contains` call returns the
    /// logical complement of the un-inverted range.
    pub fn invert(&self) -> AltRange {
        AltRange {
            inverted: !self.inverted,
            ..*self
        }
    }

    /// The acceptance test: is `alt_ft` within `[lower, upper]`?
    ///
    /// `Floor`/`Ceiling` endpoints are resolved against `envelope` (the
    /// evaluated airspace's own floor/ceiling in feet) before comparison.
    pub fn contains(&self, alt_ft: i32, envelope: (i32, i32)) -> bool {
        let lower = self.lower.resolved(envelope.0, envelope.1);
        let upper = self.upper.resolved(envelope.0, envelope.1);
        let inside = alt_ft >= lower && alt_ft <= upper;
        inside != self.inverted
    }

    /// True when the two ranges share no altitude at all, a cheap
    /// pre-simplification test.
    pub fn is_disjoint(&self, other: &AltRange) -> bool {
        self.upper.value < other.lower.value || other.upper.value < self.lower.value
    }
}

impl PartialOrd for AltLimit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.mode == other.mode {
            Some(self.value.cmp(&other.value))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_idempotent() {
        let a = AltRange::new(AltLimit::new(AltMode::Std, 5000), AltLimit::new(AltMode::Std, 15000));
        assert_eq!(a.merge(&a).lower.value, a.lower.value);
        assert_eq!(a.merge(&a).upper.value, a.upper.value);
    }

    #[test]
    fn merge_is_commutative_and_associative() {
        let a = AltRange::new(AltLimit::new(AltMode::Std, 0), AltLimit::new(AltMode::Std, 20000));
        let b = AltRange::new(AltLimit::new(AltMode::Std, 5000), AltLimit::new(AltMode::Std, 25000));
        let c = AltRange::new(AltLimit::new(AltMode::Std, 10000), AltLimit::new(AltMode::Std, 30000));

        let ab = a.merge(&b);
        let ba = b.merge(&a);
        assert_eq!(ab.lower.value, ba.lower.value);
        assert_eq!(ab.upper.value, ba.upper.value);

        let abc1 = a.merge(&b).merge(&c);
        let abc2 = a.merge(&b.merge(&c));
        assert_eq!(abc1.lower.value, abc2.lower.value);
        assert_eq!(abc1.upper.value, abc2.upper.value);
    }

    #[test]
    fn unl_contains_everything_up_to_max() {
        assert!(AltRange::UNL.contains(45000, (0, 0)));
        assert!(AltRange::UNL.contains(0, (0, 0)));
    }

    #[test]
    fn invert_flips_containment() {
        let a = AltRange::new(AltLimit::new(AltMode::Std, 5000), AltLimit::new(AltMode::Std, 15000));
        assert!(a.contains(10000, (0, 0)));
        assert!(!a.invert().contains(10000, (0, 0)));
        assert!(a.invert().contains(20000, (0, 0)));
    }

    #[test]
    fn floor_ceiling_defer_to_envelope() {
        let a = AltRange::new(AltLimit::FLOOR, AltLimit::CEILING);
        assert!(a.contains(3000, (2000, 6500)));
        assert!(!a.contains(1000, (2000, 6500)));
    }

    #[test]
    fn disjoint_ranges_detected() {
        let a = AltRange::new(AltLimit::new(AltMode::Std, 0), AltLimit::new(AltMode::Std, 10000));
        let b = AltRange::new(AltLimit::new(AltMode::Std, 20000), AltLimit::new(AltMode::Std, 30000));
        assert!(a.is_disjoint(&b));
        assert!(!a.is_disjoint(&AltRange::UNL));
    }
}
