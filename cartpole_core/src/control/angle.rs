//! Arm heading and error wrap
//!
//! Positions are in screen coordinates with y growing downward, so a bob
//! directly above its cart has an arm vector of `(0, -L)`.

use nalgebra::Point2;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Heading of the arm from cart to bob, offset so that upright is 0
pub fn heading_angle(cart: Point2<f64>, bob: Point2<f64>) -> f64 {
    let arm = bob - cart;
    arm.y.atan2(arm.x) + FRAC_PI_2
}

/// Convert a heading into the controller error
///
/// Headings strictly inside `(0, π)` map to `-heading`; everything else,
/// including exactly `0` and exactly `π`, maps to `2π - heading`. The result
/// is then reduced with a truncated remainder by `2π`, whose sign follows the
/// dividend. This is not the symmetric shortest-angle wrap.
pub fn wrap_error(heading: f64) -> f64 {
    let error = if heading > 0.0 && heading < PI {
        -heading
    } else {
        TAU - heading
    };
    error % TAU
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_upright_heading_is_zero() {
        let cart = Point2::new(700.0, 540.0);
        let bob = Point2::new(700.0, 340.0);
        assert_eq!(heading_angle(cart, bob), 0.0);
    }

    #[test]
    fn test_heading_quadrants() {
        let cart = Point2::new(0.0, 0.0);

        // Arm pointing right
        assert_relative_eq!(heading_angle(cart, Point2::new(1.0, 0.0)), FRAC_PI_2);
        // Hanging straight down
        assert_relative_eq!(heading_angle(cart, Point2::new(0.0, 1.0)), PI);
        // Arm pointing left: atan2 returns π, not -π
        assert_relative_eq!(heading_angle(cart, Point2::new(-1.0, 0.0)), PI + FRAC_PI_2);
        // Up and to the left
        assert!(heading_angle(cart, Point2::new(-0.1, -1.0)) < 0.0);
    }

    #[test]
    fn test_boundary_zero_takes_else_branch() {
        // 2π - 0 = 2π, reduced to 0
        assert_eq!(wrap_error(0.0), 0.0);
    }

    #[test]
    fn test_boundary_pi_takes_else_branch() {
        // If branch would give -π, else branch gives 2π - π = π
        assert_relative_eq!(wrap_error(PI), PI);
    }

    #[test]
    fn test_tilt_right_is_negative() {
        assert_relative_eq!(wrap_error(0.1), -0.1);
        assert_relative_eq!(wrap_error(FRAC_PI_2), -FRAC_PI_2);
    }

    #[test]
    fn test_tilt_left_is_positive() {
        // 2π + 0.1 reduced by 2π
        assert_relative_eq!(wrap_error(-0.1), 0.1, epsilon = 1e-12);
        assert_relative_eq!(wrap_error(-FRAC_PI_2), FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_below_horizontal_on_left() {
        // Headings past π come from the lower-left quadrant
        let heading = PI + 0.25;
        assert_relative_eq!(wrap_error(heading), PI - 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_discontinuity_around_zero() {
        let just_right = wrap_error(1e-9);
        let just_left = wrap_error(-1e-9);
        assert!(just_right < 0.0);
        assert!(just_left > 0.0);
        assert!((just_right - just_left).abs() < 1e-8);
    }
}
