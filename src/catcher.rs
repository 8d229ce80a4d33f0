use bevy::prelude::*;

use crate::{
    physics::{Constraints, ContactStarted, PhysicsBody, Velocity},
    sequence::Condition,
    smoothing, AppState,
};

/// Constraint schedule applied to a caught body: grip laterally, clamp
/// everything for a beat, then let it settle under gravity again.
const GRIP_STEPS: [(Constraints, f32); 2] = [
    (Constraints::FREEZE_XZ, 2.0),
    (Constraints::FREEZE_ALL, 0.5),
];
const GRIP_HOLD: Constraints = Constraints::FREEZE_XZ;

/// Sequential constraint-toggle state machine, advanced by accumulated
/// elapsed time once per frame. Restarting cancels whatever step was in
/// flight and begins timing from zero; the generation counter tells a
/// restarted run from the one it replaced.
#[derive(Component, Debug)]
pub struct Restraint {
    elapsed: f32,
    generation: u32,
}

impl Restraint {
    pub fn start() -> Self {
        Self {
            elapsed: 0.,
            generation: 0,
        }
    }

    pub fn restart(&mut self) {
        self.elapsed = 0.;
        self.generation += 1;
        log::debug!("restraint restarted (generation {})", self.generation);
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Active constraints for the current elapsed time.
    pub fn constraints(&self) -> Constraints {
        let mut remaining = self.elapsed;
        for (constraints, duration) in GRIP_STEPS {
            if remaining < duration {
                return constraints;
            }
            remaining -= duration;
        }
        GRIP_HOLD
    }

    pub fn advance(&mut self, delta: f32) -> Constraints {
        self.elapsed += delta;
        self.constraints()
    }
}

/// Waits below, starts tracking the target in XZ once the target's Y has
/// moved past the trigger threshold, and restrains it on contact.
#[derive(Component)]
pub struct Catcher {
    pub target: Option<Entity>,
    pub speed: f32,
    /// Change in the target's Y (against its captured baseline) that starts
    /// the pursuit.
    pub trigger: Condition,
    /// Kept ahead of the target on Z while pursuing.
    pub forward_bias: f32,
    baseline_y: Option<f32>,
    pursuing: bool,
    caught: bool,
}

impl Default for Catcher {
    fn default() -> Self {
        Self {
            target: None,
            speed: 5.,
            trigger: Condition::Absolute { threshold: 1.0 },
            forward_bias: 2.7,
            baseline_y: None,
            pursuing: false,
            caught: false,
        }
    }
}

impl Catcher {
    pub fn new(target: Entity) -> Self {
        Self {
            target: Some(target),
            ..Default::default()
        }
    }

    pub fn pursuing(&self) -> bool {
        self.pursuing
    }

    pub fn caught(&self) -> bool {
        self.caught
    }
}

pub struct CatcherPlugin;

impl Plugin for CatcherPlugin {
    fn build(&self, app: &mut App) {
        app.add_system_set(
            SystemSet::on_update(AppState::Playing)
                .with_system(pursue)
                .with_system(catch)
                .with_system(apply_restraints),
        );
    }
}

fn pursue(
    time: Res<Time>,
    mut catchers: Query<(&mut Transform, &mut Catcher)>,
    targets: Query<&Transform, Without<Catcher>>,
) {
    let delta = time.delta_seconds();

    for (mut transform, mut catcher) in catchers.iter_mut() {
        if catcher.caught {
            continue;
        }
        let target_transform =
            if let Some(target) = catcher.target.and_then(|t| targets.get(t).ok()) {
                target
            } else {
                continue;
            };
        let target_pos = target_transform.translation;
        let baseline_y = *catcher.baseline_y.get_or_insert(target_pos.y);

        if !catcher.pursuing {
            if !catcher.trigger.met(baseline_y, target_pos.y) {
                continue;
            }
            catcher.pursuing = true;
            log::info!("target left its baseline height, pursuit started");
        }

        let current = transform.translation;
        let desired = Vec3::new(
            target_pos.x,
            current.y,
            target_pos.z + catcher.forward_bias,
        );
        transform.translation =
            smoothing::approach_vec3(current, desired, delta * catcher.speed);
    }
}

fn catch(
    mut commands: Commands,
    mut events: EventReader<ContactStarted>,
    mut catchers: Query<(Entity, &mut Catcher, &mut Velocity)>,
    mut restraints: Query<&mut Restraint>,
) {
    for event in events.iter() {
        for (entity, mut catcher, mut velocity) in catchers.iter_mut() {
            let target = if let Some(target) = catcher.target {
                target
            } else {
                continue;
            };
            if event.other(entity) != Some(target) {
                continue;
            }

            if !catcher.caught {
                catcher.caught = true;
                **velocity = Vec3::ZERO;
                log::info!("catcher got hold of its target");
            }

            // A fresh contact always restarts the sequence; only one is ever
            // in flight per target.
            if let Ok(mut restraint) = restraints.get_mut(target) {
                restraint.restart();
            } else {
                commands.entity(target).insert(Restraint::start());
            }
        }
    }
}

fn apply_restraints(time: Res<Time>, mut bodies: Query<(&mut PhysicsBody, &mut Restraint)>) {
    let delta = time.delta_seconds();

    for (mut body, mut restraint) in bodies.iter_mut() {
        body.constraints = restraint.advance(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restraint_steps_in_order() {
        let mut restraint = Restraint::start();
        assert_eq!(restraint.constraints(), Constraints::FREEZE_XZ);
        assert_eq!(restraint.advance(1.9), Constraints::FREEZE_XZ);
        assert_eq!(restraint.advance(0.2), Constraints::FREEZE_ALL);
        assert_eq!(restraint.advance(0.3), Constraints::FREEZE_ALL);
        assert_eq!(restraint.advance(0.2), Constraints::FREEZE_XZ);
        // The final step holds indefinitely.
        assert_eq!(restraint.advance(100.0), Constraints::FREEZE_XZ);
    }

    #[test]
    fn restart_cancels_remaining_steps() {
        let mut restraint = Restraint::start();
        restraint.advance(2.2);
        assert_eq!(restraint.constraints(), Constraints::FREEZE_ALL);

        restraint.restart();
        assert_eq!(restraint.generation(), 1);
        // Timing starts over from zero: back in the first step, and the
        // clamp-everything step is a full two seconds away again.
        assert_eq!(restraint.constraints(), Constraints::FREEZE_XZ);
        assert_eq!(restraint.advance(1.9), Constraints::FREEZE_XZ);
        assert_eq!(restraint.advance(0.2), Constraints::FREEZE_ALL);
    }
}
