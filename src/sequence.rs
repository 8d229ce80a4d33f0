//! Staged follower core: latched threshold triggers plus a per-stage pose
//! formula table.
//!
//! Engine-free on purpose; the systems in [`crate::camera`] feed this with
//! transform samples each frame.

use bitflags::bitflags;
use glam::{EulerRot, Quat, Vec3};

/// How a scalar sample is compared against its captured baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    /// `|current - baseline| >= threshold`. Fires on movement in either
    /// direction.
    Absolute { threshold: f32 },
    /// `baseline - current >= threshold`. Fires only once the value has
    /// dropped below the baseline by the threshold.
    Decrease { threshold: f32 },
}

impl Condition {
    pub fn met(self, baseline: f32, current: f32) -> bool {
        match self {
            Condition::Absolute { threshold } => (current - baseline).abs() >= threshold,
            Condition::Decrease { threshold } => baseline - current >= threshold,
        }
    }
}

bitflags! {
    /// Latched trigger flags. Once set, a bit is never cleared within the
    /// owning behavior's lifetime.
    #[derive(Default)]
    pub struct StageFlags: u8 {
        /// The target has moved laterally (Z) away from its baseline.
        const LATERAL = 0b0000_0001;
        /// The target has dropped (Y) past the baseline threshold. Can only
        /// latch after `LATERAL`.
        const DROP = 0b0000_0010;
    }
}

/// Behavior stage, derived from [`StageFlags`] by precedence. Determines
/// which pose formula is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// No triggers fired: hold the captured spatial relationship.
    Offset,
    /// Lateral motion detected: align Z with the target, pitch overhead.
    Overhead,
    /// Drop detected: track laterally at a constant initial height gap.
    Descent,
}

/// Reference values captured once at activation. Write-once.
#[derive(Debug, Clone, Copy)]
pub struct Baseline {
    /// Follower position minus target position at capture, all axes.
    pub offset: Vec3,
    pub target_y: f32,
    pub target_z: f32,
    /// Initial vertical distance between follower and target. The descent
    /// formula keeps this gap rather than the live one.
    pub height_gap: f32,
    /// Follower rotation at capture.
    pub rotation: Quat,
    /// Fixed alternate orientation used from [`Stage::Overhead`] on: the
    /// capture yaw and roll with the pitch forced so -Z points straight
    /// down.
    pub overhead: Quat,
}

impl Baseline {
    pub fn capture(follower_pos: Vec3, follower_rot: Quat, target_pos: Vec3) -> Self {
        let (yaw, _, roll) = follower_rot.to_euler(EulerRot::YXZ);
        Self {
            offset: follower_pos - target_pos,
            target_y: target_pos.y,
            target_z: target_pos.z,
            height_gap: (follower_pos.y - target_pos.y).abs(),
            rotation: follower_rot,
            overhead: Quat::from_euler(EulerRot::YXZ, yaw, -std::f32::consts::FRAC_PI_2, roll),
        }
    }
}

/// Ordered latch chain over the target's Z and Y coordinates.
///
/// The drop condition is gated behind the lateral flag, and a flag flipped
/// this frame does not unlock its successor until the next one, so at most
/// one flag latches per call.
#[derive(Debug, Clone)]
pub struct TriggerChain {
    lateral: Condition,
    drop: Condition,
    flags: StageFlags,
}

impl TriggerChain {
    pub fn new(lateral: Condition, drop: Condition) -> Self {
        Self {
            lateral,
            drop,
            flags: StageFlags::default(),
        }
    }

    pub fn flags(&self) -> StageFlags {
        self.flags
    }

    pub fn stage(&self) -> Stage {
        if self.flags.contains(StageFlags::DROP) {
            Stage::Descent
        } else if self.flags.contains(StageFlags::LATERAL) {
            Stage::Overhead
        } else {
            Stage::Offset
        }
    }

    pub fn evaluate(&mut self, baseline: &Baseline, target_pos: Vec3) -> Stage {
        let before = self.flags;
        if !before.contains(StageFlags::LATERAL)
            && self.lateral.met(baseline.target_z, target_pos.z)
        {
            self.flags |= StageFlags::LATERAL;
            log::debug!("lateral trigger latched at z = {}", target_pos.z);
        }
        if before.contains(StageFlags::LATERAL)
            && !before.contains(StageFlags::DROP)
            && self.drop.met(baseline.target_y, target_pos.y)
        {
            self.flags |= StageFlags::DROP;
            log::debug!("drop trigger latched at y = {}", target_pos.y);
        }
        self.stage()
    }
}

/// Stage → desired pose. Pure; both position and rotation depend only on the
/// arguments.
pub fn synthesize(stage: Stage, target_pos: Vec3, baseline: &Baseline) -> (Vec3, Quat) {
    match stage {
        Stage::Offset => (target_pos + baseline.offset, baseline.rotation),
        Stage::Overhead => (
            Vec3::new(
                target_pos.x + baseline.offset.x,
                target_pos.y + baseline.offset.y,
                target_pos.z,
            ),
            baseline.overhead,
        ),
        Stage::Descent => (
            Vec3::new(
                target_pos.x,
                target_pos.y + baseline.height_gap,
                target_pos.z,
            ),
            baseline.overhead,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::vec3;

    fn baseline() -> Baseline {
        Baseline::capture(
            vec3(0.0, 15.0, -6.0),
            Quat::IDENTITY,
            vec3(0.0, 10.0, 0.0),
        )
    }

    #[test]
    fn baseline_capture_values() {
        let b = baseline();
        assert_eq!(b.offset, vec3(0.0, 5.0, -6.0));
        assert_eq!(b.target_y, 10.0);
        assert_eq!(b.target_z, 0.0);
        assert_eq!(b.height_gap, 5.0);
    }

    #[test]
    fn condition_absolute_fires_both_directions() {
        let c = Condition::Absolute { threshold: 1.0 };
        assert!(c.met(10.0, 11.0));
        assert!(c.met(10.0, 9.0));
        assert!(!c.met(10.0, 10.5));
    }

    #[test]
    fn condition_decrease_is_directional() {
        let c = Condition::Decrease { threshold: 1.0 };
        assert!(c.met(10.0, 8.9));
        assert!(!c.met(10.0, 11.5));
        assert!(!c.met(10.0, 9.5));
    }

    #[test]
    fn offset_stage_preserves_initial_relationship() {
        let b = baseline();
        for target in [
            vec3(0.0, 10.0, 0.0),
            vec3(1.5, 10.0, 0.0),
            vec3(-3.0, 12.0, 0.0),
        ] {
            let (pos, rot) = synthesize(Stage::Offset, target, &b);
            assert_eq!(pos, target + b.offset);
            assert_eq!(rot, b.rotation);
        }
    }

    #[test]
    fn flags_are_monotonic() {
        let b = baseline();
        let mut chain = TriggerChain::new(
            Condition::Absolute { threshold: 0.01 },
            Condition::Decrease { threshold: 1.0 },
        );
        chain.evaluate(&b, vec3(0.0, 10.0, 2.0));
        assert!(chain.flags().contains(StageFlags::LATERAL));
        // Target returns to its baseline Z; the flag must survive.
        chain.evaluate(&b, vec3(0.0, 10.0, 0.0));
        assert!(chain.flags().contains(StageFlags::LATERAL));
        assert_eq!(chain.stage(), Stage::Overhead);
    }

    #[test]
    fn drop_waits_for_lateral() {
        let b = baseline();
        let mut chain = TriggerChain::new(
            Condition::Absolute { threshold: 0.01 },
            Condition::Decrease { threshold: 1.0 },
        );
        // A huge drop with no lateral motion must not latch anything.
        let stage = chain.evaluate(&b, vec3(0.0, 2.0, 0.0));
        assert_eq!(stage, Stage::Offset);
        assert!(chain.flags().is_empty());
    }

    #[test]
    fn one_flag_per_frame() {
        let b = baseline();
        let mut chain = TriggerChain::new(
            Condition::Absolute { threshold: 0.01 },
            Condition::Decrease { threshold: 1.0 },
        );
        // Both conditions hold, but only the lateral flag may latch first.
        let stage = chain.evaluate(&b, vec3(0.0, 8.0, 3.0));
        assert_eq!(stage, Stage::Overhead);
        let stage = chain.evaluate(&b, vec3(0.0, 8.0, 3.0));
        assert_eq!(stage, Stage::Descent);
    }

    #[test]
    fn drop_latch_survives_recovery() {
        let b = baseline();
        let mut chain = TriggerChain::new(
            Condition::Absolute { threshold: 0.01 },
            Condition::Decrease { threshold: 1.0 },
        );
        chain.evaluate(&b, vec3(0.0, 10.0, 2.0));
        // 10.0 -> 8.9 is a delta of 1.1 >= 1.0.
        assert_eq!(chain.evaluate(&b, vec3(0.0, 8.9, 2.0)), Stage::Descent);
        // Target climbs back up; stage stays latched.
        assert_eq!(chain.evaluate(&b, vec3(0.0, 10.0, 2.0)), Stage::Descent);
    }

    #[test]
    fn descent_keeps_initial_height_gap() {
        let b = baseline();
        let target = vec3(4.0, 3.0, 9.0);
        let (pos, rot) = synthesize(Stage::Descent, target, &b);
        assert_eq!(pos, vec3(4.0, 3.0 + b.height_gap, 9.0));
        assert_eq!(rot, b.overhead);
    }

    #[test]
    fn overhead_aligns_z_and_keeps_xy_offset() {
        let b = baseline();
        let target = vec3(4.0, 9.0, 9.0);
        let (pos, _) = synthesize(Stage::Overhead, target, &b);
        assert_eq!(pos, vec3(4.0 + b.offset.x, 9.0 + b.offset.y, 9.0));
    }

    #[test]
    fn overhead_rotation_points_straight_down() {
        let b = baseline();
        let forward = b.overhead * -Vec3::Z;
        assert!(forward.abs_diff_eq(-Vec3::Y, 1e-5));
    }

    #[test]
    fn synthesize_is_pure() {
        let b = baseline();
        let target = vec3(1.0, 2.0, 3.0);
        let first = synthesize(Stage::Descent, target, &b);
        let second = synthesize(Stage::Descent, target, &b);
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }
}
