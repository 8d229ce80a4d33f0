use bevy::prelude::*;

use crate::{
    sequence::{self, Baseline, Condition, Stage, TriggerChain},
    smoothing,
};

/// Staged follow rig. Captures its offset from the target on the first frame
/// a target is bound, then eases toward the pose synthesized for the current
/// stage. Without a target it stays inert for its whole lifetime.
#[derive(Component)]
pub struct SequenceCamera {
    pub target: Option<Entity>,
    pub move_speed: f32,
    pub rotation_speed: f32,
    chain: TriggerChain,
    baseline: Option<Baseline>,
}

impl Default for SequenceCamera {
    fn default() -> Self {
        Self {
            target: None,
            move_speed: 5.,
            rotation_speed: 3.,
            chain: TriggerChain::new(
                Condition::Absolute { threshold: 0.01 },
                Condition::Decrease { threshold: 1.0 },
            ),
            baseline: None,
        }
    }
}

impl SequenceCamera {
    pub fn new(target: Entity) -> Self {
        Self {
            target: Some(target),
            ..Default::default()
        }
    }

    pub fn stage(&self) -> Stage {
        self.chain.stage()
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }
}

/// Follows the target at the captured offset in X and Z while matching the
/// target's live Y exactly. Hard assignment, no smoothing.
#[derive(Component, Default)]
pub struct OffsetFollow {
    pub target: Option<Entity>,
    offset: Option<Vec3>,
}

impl OffsetFollow {
    pub fn new(target: Entity) -> Self {
        Self {
            target: Some(target),
            offset: None,
        }
    }
}

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        // Pose overrides run after everything else in the frame so physics
        // and animation can't fight them.
        app.add_system_to_stage(CoreStage::PostUpdate, drive_sequence_cameras)
            .add_system_to_stage(CoreStage::PostUpdate, follow_with_offset);
    }
}

fn drive_sequence_cameras(
    time: Res<Time>,
    mut followers: Query<(&mut Transform, &mut SequenceCamera)>,
    targets: Query<&Transform, Without<SequenceCamera>>,
) {
    let delta = time.delta_seconds();

    for (mut transform, mut camera) in followers.iter_mut() {
        let target_transform =
            if let Some(target) = camera.target.and_then(|t| targets.get(t).ok()) {
                target
            } else {
                continue;
            };
        let target_pos = target_transform.translation;

        let baseline = match camera.baseline {
            Some(baseline) => baseline,
            None => {
                // The follower already sits at target + offset at capture
                // time, so the first eased step has nothing to jump over.
                let baseline =
                    Baseline::capture(transform.translation, transform.rotation, target_pos);
                camera.baseline = Some(baseline);
                baseline
            }
        };

        let stage = camera.chain.evaluate(&baseline, target_pos);
        let (desired_pos, desired_rot) = sequence::synthesize(stage, target_pos, &baseline);

        transform.translation = smoothing::approach_vec3(
            transform.translation,
            desired_pos,
            delta * camera.move_speed,
        );
        transform.rotation =
            smoothing::approach_quat(transform.rotation, desired_rot, delta * camera.rotation_speed);
    }
}

fn follow_with_offset(
    mut followers: Query<(&mut Transform, &mut OffsetFollow)>,
    targets: Query<&Transform, Without<OffsetFollow>>,
) {
    for (mut transform, mut follow) in followers.iter_mut() {
        let target_transform =
            if let Some(target) = follow.target.and_then(|t| targets.get(t).ok()) {
                target
            } else {
                continue;
            };
        let target_pos = target_transform.translation;
        let offset = *follow
            .offset
            .get_or_insert(transform.translation - target_pos);

        let mut desired = target_pos + offset;
        desired.y = target_pos.y;
        transform.translation = desired;
    }
}
