//! Angle utilities
//!
//! Heading math for the velocity estimator and controller.

use std::f64::consts::{PI, TAU};

use nalgebra::{UnitQuaternion, Vector3};

/// Wrap an angle into (-π, π]
///
/// Differences of headings must be wrapped before use, otherwise a step
/// across ±π reads as a full turn in the opposite direction.
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        PI
    } else {
        wrapped
    }
}

/// Shortest signed rotation from `from` to `to` [rad], in (-π, π]
pub fn angle_difference(from: f64, to: f64) -> f64 {
    wrap_angle(to - from)
}

/// Yaw angle of an orientation (rotation about world z) [rad]
pub fn yaw_from_quaternion(q: &UnitQuaternion<f64>) -> f64 {
    let (_roll, _pitch, yaw) = q.euler_angles();
    yaw
}

/// Rotate a world-frame vector into the yaw-only (level) frame
///
/// The level frame shares the world z-axis and has its x-axis along the
/// vehicle heading.
pub fn world_to_level(v: &Vector3<f64>, yaw: f64) -> Vector3<f64> {
    let (s, c) = yaw.sin_cos();
    Vector3::new(c * v.x + s * v.y, -s * v.x + c * v.y, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wrap_identity_inside_range() {
        assert_relative_eq!(wrap_angle(0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-3.0), -3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_wrap_boundary_is_positive_pi() {
        assert_relative_eq!(wrap_angle(PI), PI, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-PI), PI, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(5.0), 5.0 - TAU, epsilon = 1e-12);
    }

    #[test]
    fn test_wrap_large_angles() {
        assert_relative_eq!(wrap_angle(TAU + 0.25), 0.25, epsilon = 1e-12);
        assert_relative_eq!(wrap_angle(-TAU - 0.25), -0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_difference_across_pi() {
        // 170° to -170° is a +20° turn, not -340°
        let from = 170.0_f64.to_radians();
        let to = -170.0_f64.to_radians();
        assert_relative_eq!(angle_difference(from, to), 20.0_f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_yaw_extraction() {
        let q = UnitQuaternion::from_euler_angles(0.1, -0.2, 1.3);
        assert_relative_eq!(yaw_from_quaternion(&q), 1.3, epsilon = 1e-10);
    }

    #[test]
    fn test_world_to_level_quarter_turn() {
        // Heading +y: world +y is level forward
        let v = world_to_level(&Vector3::new(0.0, 2.0, 1.0), PI / 2.0);
        assert_relative_eq!(v, Vector3::new(2.0, 0.0, 1.0), epsilon = 1e-12);
    }
}
