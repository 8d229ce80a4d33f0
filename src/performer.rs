use bevy::{core::FixedTimestep, prelude::*};
use enum_map::{Enum, EnumMap};

use crate::{
    input_mapper::{Action, ActionState, Input},
    physics::{CollisionMatrix, Layer, Velocity, PHYSICS_TIME_STEP},
    sequence::Condition,
    smoothing, AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum Limb {
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
    Chest,
}

/// Body-part entities paired with reference-pose entities. Lists of unequal
/// length are processed up to the shorter one.
#[derive(Default)]
pub struct MirrorGroup {
    pub parts: Vec<Entity>,
    pub references: Vec<Entity>,
}

/// Slerps each part's rotation toward its reference pose every late-frame
/// tick while the owning [`Performer`] is in its ragdoll stage.
#[derive(Component, Default)]
pub struct PoseMirror {
    pub groups: EnumMap<Limb, MirrorGroup>,
}

/// Full-body controller: key-armed forward run via velocity injection, and a
/// latched drop watch that turns the body loose.
#[derive(Component)]
pub struct Performer {
    pub run_speed: f32,
    pub run_distance: f32,
    pub rotation_speed: f32,
    /// Change in Y against the captured baseline that flips the body into
    /// its ragdoll stage.
    pub drop: Condition,
    baseline_y: Option<f32>,
    goal_z: Option<f32>,
    ragdoll: bool,
}

impl Default for Performer {
    fn default() -> Self {
        Self {
            run_speed: 5.,
            run_distance: 13.,
            rotation_speed: 2.,
            drop: Condition::Absolute { threshold: 1.0 },
            baseline_y: None,
            goal_z: None,
            ragdoll: false,
        }
    }
}

impl Performer {
    pub fn ragdoll(&self) -> bool {
        self.ragdoll
    }

    pub fn goal_z(&self) -> Option<f32> {
        self.goal_z
    }
}

pub struct PerformerPlugin;

impl Plugin for PerformerPlugin {
    fn build(&self, app: &mut App) {
        app.add_system_set(
            SystemSet::on_update(AppState::Playing)
                .with_system(arm_run)
                .with_system(watch_drop),
        )
        .add_system_set(
            SystemSet::new()
                .with_run_criteria(FixedTimestep::step(PHYSICS_TIME_STEP))
                .with_system(run),
        )
        .add_system_to_stage(CoreStage::PostUpdate, mirror_pose);
    }
}

/// Each press records a fresh goal relative to wherever the body is now.
fn arm_run(input: Res<Input>, mut performers: Query<(&Transform, &mut Performer)>) {
    if input.actions[Action::Advance] != ActionState::JustPressed {
        return;
    }
    for (transform, mut performer) in performers.iter_mut() {
        let goal = transform.translation.z + performer.run_distance;
        performer.goal_z = Some(goal);
        log::debug!("run armed, goal z = {}", goal);
    }
}

fn watch_drop(
    mut matrix: ResMut<CollisionMatrix>,
    mut performers: Query<(&Transform, &mut Performer)>,
) {
    for (transform, mut performer) in performers.iter_mut() {
        let baseline_y = *performer.baseline_y.get_or_insert(transform.translation.y);
        if performer.ragdoll {
            continue;
        }
        if performer.drop.met(baseline_y, transform.translation.y) {
            performer.ragdoll = true;
            matrix.ignore(Layer::Performer, Layer::Building);
            log::info!("drop detected, body turned loose");
        }
    }
}

/// Physics-rate forward motion. Only the Z component is written; gravity
/// keeps owning the vertical velocity.
fn run(mut performers: Query<(&Transform, &mut Velocity, &mut Performer)>) {
    for (transform, mut velocity, mut performer) in performers.iter_mut() {
        let goal = if let Some(goal) = performer.goal_z {
            goal
        } else {
            continue;
        };
        if transform.translation.z >= goal {
            velocity.z = 0.;
            performer.goal_z = None;
            log::debug!("run goal reached at z = {}", transform.translation.z);
        } else {
            velocity.z = performer.run_speed;
        }
    }
}

fn mirror_pose(
    time: Res<Time>,
    performers: Query<(&Performer, &PoseMirror)>,
    mut transforms: Query<&mut Transform>,
) {
    let delta = time.delta_seconds();

    for (performer, mirror) in performers.iter() {
        if !performer.ragdoll {
            continue;
        }
        for (_, group) in mirror.groups.iter() {
            for (&part, &reference) in group.parts.iter().zip(group.references.iter()) {
                let goal = if let Ok(transform) = transforms.get(reference) {
                    transform.rotation
                } else {
                    continue;
                };
                if let Ok(mut transform) = transforms.get_mut(part) {
                    transform.rotation = smoothing::approach_quat(
                        transform.rotation,
                        goal,
                        delta * performer.rotation_speed,
                    );
                }
            }
        }
    }
}
