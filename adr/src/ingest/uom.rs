// SPDX-License-Identifier: Apache-2.0
// Copyright 2024, 2026 Joe Pearson

//! Unit-of-measure normalisation for the distance and altitude attributes
//! AIXM elements carry alongside their numeric content.

/// Converts a distance `value` expressed in `uom` to nautical miles.
/// Unrecognised units pass through unscaled.
pub fn to_nautical_miles(value: f64, uom: &str) -> f64 {
    match uom.to_ascii_uppercase().as_str() {
        "NM" => value,
        "KM" => value / 1.852,
        "M" => value / 1852.0,
        "FT" => value / 6076.12,
        _ => value,
    }
}

/// The multiplier that brings an altitude `value` in `uom` to feet: a
/// flight level is expressed in hundreds of feet, everything else this
/// crate encounters (`FT`, `M` pre-converted upstream) is already feet.
pub fn alt_factor(uom: &str) -> f64 {
    match uom.to_ascii_uppercase().as_str() {
        "FL" => 100.0,
        _ => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn km_converts_to_nautical_miles() {
        assert!((to_nautical_miles(1.852, "KM") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn flight_level_factor_is_one_hundred() {
        assert_eq!(alt_factor("FL"), 100.0);
        assert_eq!(alt_factor("FT"), 1.0);
    }
}
