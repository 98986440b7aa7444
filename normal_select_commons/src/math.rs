// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use glam::Vec3;

/// Returns the unsigned angle, in radians, between `a` and `b`. The result is
/// always in the [0, π] range.
///
/// The vectors don't need to be normalized. Returns `None` when either of them
/// has zero length (or is not finite), since there is no meaningful angle in
/// that case.
pub fn try_angle_between(a: Vec3, b: Vec3) -> Option<f32> {
    let len_product = (a.length_squared() * b.length_squared()).sqrt();
    if len_product == 0.0 || !len_product.is_finite() {
        return None;
    }
    // NOTE: Rounding can push the cosine slightly outside [-1, 1] for
    // (anti)parallel vectors, which would make `acos` return NaN.
    let cos = (a.dot(b) / len_product).clamp(-1.0, 1.0);
    Some(cos.acos())
}

/// Same as [`try_angle_between`], but degenerate inputs produce NaN. Any
/// ordered comparison against the result will then be false.
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    try_angle_between(a, b).unwrap_or(f32::NAN)
}

/// Converts an angle in degrees to radians, as stored by the settings.
pub fn deg_to_rad(degrees: f32) -> f32 {
    degrees.to_radians()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    pub fn test_angle_between() {
        assert_eq!(angle_between(Vec3::Z, Vec3::Z), 0.0);
        assert!((angle_between(Vec3::X, Vec3::Y) - FRAC_PI_2).abs() < 1e-6);
        assert!((angle_between(Vec3::X, -Vec3::X) - PI).abs() < 1e-6);

        // Length does not matter, only direction
        assert!((angle_between(Vec3::X * 3.0, Vec3::new(1.0, 1.0, 0.0)) - PI / 4.0).abs() < 1e-6);
    }

    #[test]
    pub fn test_degenerate_angle() {
        assert_eq!(try_angle_between(Vec3::ZERO, Vec3::X), None);
        assert_eq!(try_angle_between(Vec3::X, Vec3::ZERO), None);
        assert!(angle_between(Vec3::ZERO, Vec3::ZERO).is_nan());
        assert!(!(angle_between(Vec3::ZERO, Vec3::X) < PI));
    }

    #[test]
    pub fn test_deg_to_rad() {
        assert!((deg_to_rad(20.0) - 0.349066).abs() < 1e-6);
    }
}
