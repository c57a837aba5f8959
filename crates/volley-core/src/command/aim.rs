//! Aim solvers.
//!
//! All solvers work in world space and take gravity as a vector, so "up"
//! is whatever opposes the configured gravity.

use glam::{Quat, Vec3};

use crate::action::EPSILON;

/// Lead iterations for a ballistic shot at a moving target.
const LEAD_ITERATIONS: usize = 4;

/// A solved shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimSolution {
    /// Unit launch direction
    pub direction: Vec3,
    /// Flight time to the aim point
    pub time: f32,
}

/// Direction that intercepts a target moving at constant velocity.
///
/// Solves `|d + v t| = s t` for the smallest positive `t`. Returns `None`
/// when the projectile can never catch the target.
///
/// ```
/// use glam::Vec3;
/// use volley_core::command::aim::linear_intercept;
///
/// let shot = linear_intercept(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 5.0).unwrap();
/// assert_eq!(shot.direction, Vec3::Z);
/// assert_eq!(shot.time, 2.0);
/// ```
#[must_use]
pub fn linear_intercept(
    origin: Vec3,
    target: Vec3,
    target_velocity: Vec3,
    speed: f32,
) -> Option<AimSolution> {
    if speed <= EPSILON {
        return None;
    }
    let d = target - origin;
    let a = target_velocity.length_squared() - speed * speed;
    let b = 2.0 * d.dot(target_velocity);
    let c = d.length_squared();

    let time = if a.abs() <= EPSILON {
        if b.abs() <= EPSILON {
            return None;
        }
        -c / b
    } else {
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        let t1 = (-b - root) / (2.0 * a);
        let t2 = (-b + root) / (2.0 * a);
        match (t1 > EPSILON, t2 > EPSILON) {
            (true, true) => t1.min(t2),
            (true, false) => t1,
            (false, true) => t2,
            (false, false) => return None,
        }
    };
    if time <= EPSILON {
        return None;
    }

    let direction = (d + target_velocity * time).try_normalize()?;
    Some(AimSolution { direction, time })
}

/// Lower-arc launch direction that lands on `target` under `gravity`.
///
/// Returns `None` when `target` is out of range at `speed`.
#[must_use]
pub fn parabola(origin: Vec3, target: Vec3, speed: f32, gravity: Vec3) -> Option<AimSolution> {
    let g = gravity.length();
    if g <= EPSILON || speed <= EPSILON {
        return None;
    }
    let up = -gravity / g;
    let d = target - origin;
    let y = d.dot(up);
    let horizontal = d - up * y;
    let x = horizontal.length();

    if x <= EPSILON {
        // Straight up or down.
        let direction = if y >= 0.0 { up } else { -up };
        let disc = speed * speed - 2.0 * g * y;
        if disc < 0.0 {
            return None;
        }
        let time = (speed - disc.sqrt()) / g;
        return Some(AimSolution {
            direction,
            time: time.max(0.0),
        });
    }

    let s2 = speed * speed;
    let disc = s2 * s2 - g * (g * x * x + 2.0 * y * s2);
    if disc < 0.0 {
        return None;
    }
    let angle = ((s2 - disc.sqrt()) / (g * x)).atan();
    let (sin, cos) = angle.sin_cos();
    let direction = horizontal / x * cos + up * sin;
    let time = x / (speed * cos);
    Some(AimSolution { direction, time })
}

/// Ballistic shot at a moving target, leading it by the flight time.
#[must_use]
pub fn parabola_lead(
    origin: Vec3,
    target: Vec3,
    target_velocity: Vec3,
    speed: f32,
    gravity: Vec3,
) -> Option<AimSolution> {
    let mut solution = parabola(origin, target, speed, gravity)?;
    if target_velocity.length_squared() <= EPSILON {
        return Some(solution);
    }
    for _ in 0..LEAD_ITERATIONS {
        let predicted = target + target_velocity * solution.time;
        solution = parabola(origin, predicted, speed, gravity)?;
    }
    Some(solution)
}

/// 45 degree launch toward `target`, for shots out of range.
#[must_use]
pub fn fallback_arc(origin: Vec3, target: Vec3, gravity: Vec3) -> Vec3 {
    let up = (-gravity).try_normalize().unwrap_or(Vec3::Y);
    let d = target - origin;
    let horizontal = (d - up * d.dot(up)).normalize_or_zero();
    (horizontal + up).normalize_or_zero()
}

/// Clamp `direction` to a yaw/pitch cone around `facing`.
///
/// Limits are half-angles in radians; a limit of zero leaves that axis
/// unclamped.
#[must_use]
pub fn clamp_angles(direction: Vec3, facing: Quat, max_yaw: f32, max_pitch: f32) -> Vec3 {
    let Some(dir) = direction.try_normalize() else {
        return direction;
    };
    let local = facing.inverse() * dir;
    let mut yaw = local.x.atan2(local.z);
    let mut pitch = local.y.clamp(-1.0, 1.0).asin();
    if max_yaw > 0.0 {
        yaw = yaw.clamp(-max_yaw, max_yaw);
    }
    if max_pitch > 0.0 {
        pitch = pitch.clamp(-max_pitch, max_pitch);
    }
    let (sy, cy) = yaw.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    facing * Vec3::new(cp * sy, sp, cp * cy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    const G: Vec3 = Vec3::new(0.0, -9.81, 0.0);

    fn approx(a: Vec3, b: Vec3, tol: f32) -> bool {
        (a - b).length() < tol
    }

    mod intercept_tests {
        use super::*;

        #[test]
        fn crossing_target_is_led() {
            let target = Vec3::new(0.0, 0.0, 10.0);
            let velocity = Vec3::new(3.0, 0.0, 0.0);
            let shot = linear_intercept(Vec3::ZERO, target, velocity, 10.0).unwrap();
            assert!(shot.direction.x > 0.0);
            let meet = target + velocity * shot.time;
            assert!(approx(shot.direction * 10.0 * shot.time, meet, 1e-3));
        }

        #[test]
        fn faster_receding_target_is_unreachable() {
            let shot = linear_intercept(
                Vec3::ZERO,
                Vec3::new(0.0, 0.0, 10.0),
                Vec3::new(0.0, 0.0, 20.0),
                10.0,
            );
            assert!(shot.is_none());
        }

        #[test]
        fn zero_speed_is_unreachable() {
            assert!(linear_intercept(Vec3::ZERO, Vec3::Z, Vec3::ZERO, 0.0).is_none());
        }
    }

    mod parabola_tests {
        use super::*;

        fn landing(origin: Vec3, shot: AimSolution, speed: f32) -> Vec3 {
            origin + shot.direction * speed * shot.time + 0.5 * G * shot.time * shot.time
        }

        #[test]
        fn flat_shot_lands_on_target() {
            let target = Vec3::new(0.0, 0.0, 20.0);
            let shot = parabola(Vec3::ZERO, target, 20.0, G).unwrap();
            assert!(shot.direction.y > 0.0);
            assert!(approx(landing(Vec3::ZERO, shot, 20.0), target, 1e-2));
        }

        #[test]
        fn out_of_range_has_no_solution() {
            assert!(parabola(Vec3::ZERO, Vec3::new(0.0, 0.0, 1000.0), 10.0, G).is_none());
        }

        #[test]
        fn fallback_is_forty_five_degrees() {
            let dir = fallback_arc(Vec3::ZERO, Vec3::new(0.0, 0.0, 1000.0), G);
            assert!(approx(dir, Vec3::new(0.0, 1.0, 1.0).normalize(), 1e-5));
        }

        #[test]
        fn lead_hits_moving_target() {
            let target = Vec3::new(0.0, 0.0, 15.0);
            let velocity = Vec3::new(2.0, 0.0, 0.0);
            let shot = parabola_lead(Vec3::ZERO, target, velocity, 25.0, G).unwrap();
            let meet = target + velocity * shot.time;
            assert!(approx(landing(Vec3::ZERO, shot, 25.0), meet, 0.05));
        }

        #[test]
        fn vertical_shot() {
            let shot = parabola(Vec3::ZERO, Vec3::new(0.0, 5.0, 0.0), 20.0, G).unwrap();
            assert_eq!(shot.direction, Vec3::Y);
        }
    }

    mod clamp_tests {
        use super::*;

        #[test]
        fn yaw_is_limited() {
            let dir = clamp_angles(Vec3::X, Quat::IDENTITY, FRAC_PI_4, 0.0);
            assert!(approx(dir, Vec3::new(1.0, 0.0, 1.0).normalize(), 1e-5));
        }

        #[test]
        fn pitch_is_limited_relative_to_facing() {
            let facing = Quat::from_rotation_y(FRAC_PI_2);
            let dir = clamp_angles(Vec3::Y, facing, 0.0, FRAC_PI_4);
            assert!(approx(dir, Vec3::new(1.0, 1.0, 0.0).normalize(), 1e-5));
        }

        #[test]
        fn zero_limits_leave_direction_alone() {
            let d = Vec3::new(0.3, -0.4, 0.2).normalize();
            assert!(approx(clamp_angles(d, Quat::IDENTITY, 0.0, 0.0), d, 1e-5));
        }
    }

    proptest! {
        #[test]
        fn intercept_meets_target(
            tx in -50.0f32..50.0,
            tz in 5.0f32..50.0,
            vx in -5.0f32..5.0,
            vz in -5.0f32..5.0,
            speed in 10.0f32..40.0,
        ) {
            let target = Vec3::new(tx, 0.0, tz);
            let velocity = Vec3::new(vx, 0.0, vz);
            let shot = linear_intercept(Vec3::ZERO, target, velocity, speed).unwrap();
            let projectile = shot.direction * speed * shot.time;
            let meet = target + velocity * shot.time;
            prop_assert!((projectile - meet).length() < 1e-2 * (1.0 + meet.length()));
        }

        #[test]
        fn parabola_lands_within_tolerance(
            x in 1.0f32..30.0,
            z in 1.0f32..30.0,
            y in -5.0f32..5.0,
        ) {
            let target = Vec3::new(x, y, z);
            let speed = 30.0;
            if let Some(shot) = parabola(Vec3::ZERO, target, speed, G) {
                let land = shot.direction * speed * shot.time + 0.5 * G * shot.time * shot.time;
                prop_assert!((land - target).length() < 1e-2 * (1.0 + target.length()));
            }
        }
    }
}
