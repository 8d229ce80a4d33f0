//! Per-frame interpolation primitives shared by the follow and rig
//! behaviors.
//!
//! `approach*` moves a value toward a goal by `delta * speed` per frame,
//! clamped to `[0, 1]`. Convergence is asymptotic and framerate-dependent;
//! the discrete formula is kept as-is since the scene behaviors were tuned
//! against it.

use glam::{Quat, Vec3};

pub fn approach(current: f32, desired: f32, rate: f32) -> f32 {
    current + (desired - current) * rate.clamp(0.0, 1.0)
}

pub fn approach_vec3(current: Vec3, desired: Vec3, rate: f32) -> Vec3 {
    current.lerp(desired, rate.clamp(0.0, 1.0))
}

pub fn approach_quat(current: Quat, desired: Quat, rate: f32) -> Quat {
    current.slerp(desired, rate.clamp(0.0, 1.0))
}

/// Hermite smooth-step on a clamped `t`.
pub fn smooth_step(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Eased progress of a timed blend. Degenerate durations complete
/// immediately.
pub fn eased_progress(elapsed: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        1.0
    } else {
        smooth_step(elapsed / duration)
    }
}

/// Linear blend between two scalars, used with [`eased_progress`] for the
/// timed joint ramps.
pub fn blend(start: f32, end: f32, t: f32) -> f32 {
    start + (end - start) * t.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    #[test]
    fn approach_matches_clamped_lerp_formula() {
        // speed = 5, delta = 0.1 -> rate 0.5, halfway there in one step.
        assert_eq!(approach(0.0, 10.0, 0.1 * 5.0), 5.0);
    }

    #[test]
    fn approach_clamps_large_rates() {
        // An oversized rate lands exactly on the goal instead of
        // overshooting.
        assert_eq!(approach(0.0, 10.0, 3.0), 10.0);
        assert_eq!(
            approach_vec3(Vec3::ZERO, vec3(1.0, 2.0, 3.0), 3.0),
            vec3(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn approach_never_reaches_asymptotically() {
        let mut v = 0.0;
        for _ in 0..20 {
            v = approach(v, 10.0, 0.5);
        }
        assert!(v < 10.0);
        assert!(10.0 - v < 1e-3);
    }

    #[test]
    fn quat_approach_full_rate_snaps() {
        let goal = Quat::from_rotation_y(1.2);
        let q = approach_quat(Quat::IDENTITY, goal, 1.5);
        assert!(q.abs_diff_eq(goal, 1e-6));
    }

    #[test]
    fn smooth_step_shape() {
        assert_eq!(smooth_step(0.0), 0.0);
        assert_eq!(smooth_step(1.0), 1.0);
        assert_eq!(smooth_step(0.5), 0.5);
        assert_eq!(smooth_step(-1.0), 0.0);
        assert_eq!(smooth_step(2.0), 1.0);
        // Eased: slower than linear near the ends.
        assert!(smooth_step(0.1) < 0.1);
        assert!(smooth_step(0.9) > 0.9);
    }

    #[test]
    fn eased_progress_degenerate_duration() {
        assert_eq!(eased_progress(0.0, 0.0), 1.0);
        assert_eq!(eased_progress(0.5, -1.0), 1.0);
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(2.0, 8.0, 0.0), 2.0);
        assert_eq!(blend(2.0, 8.0, 1.0), 8.0);
        assert_eq!(blend(2.0, 8.0, 0.5), 5.0);
    }
}
