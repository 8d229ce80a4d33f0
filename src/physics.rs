//! Minimal 3D kinematic layer.
//!
//! Just enough physics to host the scene behaviors: gravity plus velocity
//! integration with per-axis freeze constraints, top-surface rest so bodies
//! can stand on the roof and the street, and start-of-contact events. There
//! is no impulse solving or rotation dynamics; pose overrides happen in
//! PostUpdate on top of whatever this layer produced.

use bevy::{core::FixedTimestep, prelude::*, utils::HashSet};
use bitflags::bitflags;

bitflags! {
    /// Per-axis movement freezes. A frozen axis moves nothing and zeroes the
    /// matching velocity component.
    #[derive(Default)]
    pub struct Constraints: u8 {
        const FREEZE_X = 0b0000_0001;
        const FREEZE_Y = 0b0000_0010;
        const FREEZE_Z = 0b0000_0100;
        const FREEZE_XZ = Self::FREEZE_X.bits | Self::FREEZE_Z.bits;
        const FREEZE_ALL = Self::FREEZE_X.bits | Self::FREEZE_Y.bits | Self::FREEZE_Z.bits;
    }
}

/// Collision layer of a body, mirroring the scene's named layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Performer,
    Building,
    Catcher,
    Prop,
}

/// Layer pairs that have been told to stop interacting. Owned by the app
/// world, so it is initialized by [`PhysicsPlugin`] and dropped with the
/// world instead of outliving the scene. Pairs are never re-enabled.
#[derive(Default)]
pub struct CollisionMatrix {
    ignored: HashSet<(Layer, Layer)>,
}

impl CollisionMatrix {
    fn key(a: Layer, b: Layer) -> (Layer, Layer) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn ignore(&mut self, a: Layer, b: Layer) {
        if self.ignored.insert(Self::key(a, b)) {
            log::info!("collisions disabled between {:?} and {:?}", a, b);
        }
    }

    pub fn is_ignored(&self, a: Layer, b: Layer) -> bool {
        self.ignored.contains(&Self::key(a, b))
    }
}

#[derive(Component, Deref, DerefMut, Default)]
pub struct Velocity(pub Vec3);

#[derive(Component)]
pub struct PhysicsBody {
    pub layer: Layer,
    pub constraints: Constraints,
}

impl PhysicsBody {
    pub fn new(layer: Layer) -> Self {
        Self {
            layer,
            constraints: Constraints::empty(),
        }
    }
}

#[derive(Component)]
pub struct BoxCollider {
    pub half_extents: Vec3,
}

/// Marker for static geometry whose top face bodies can rest on.
#[derive(Component, Default)]
pub struct Support;

/// Sent once when two colliders begin to touch. Resent only after they have
/// separated.
pub struct ContactStarted {
    pub a: Entity,
    pub b: Entity,
}

impl ContactStarted {
    /// The other entity of the pair, if `entity` is part of it.
    pub fn other(&self, entity: Entity) -> Option<Entity> {
        if self.a == entity {
            Some(self.b)
        } else if self.b == entity {
            Some(self.a)
        } else {
            None
        }
    }
}

pub struct PhysicsSettings {
    pub gravity: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self { gravity: 9.81 }
    }
}

pub const PHYSICS_TIME_STEP: f64 = 1. / 60.;

/// How deep below a support's top face a falling body may be and still get
/// snapped back onto it.
const REST_TOLERANCE: f32 = 0.5;

pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PhysicsSettings>()
            .init_resource::<CollisionMatrix>()
            .add_event::<ContactStarted>()
            .add_system_set_to_stage(
                CoreStage::PreUpdate,
                SystemSet::new()
                    .with_run_criteria(FixedTimestep::step(PHYSICS_TIME_STEP))
                    .with_system(move_bodies)
                    .with_system(detect_contacts.after(move_bodies)),
            );
    }
}

/// Applies gravity and the constraint mask to `velocity`, returning the
/// step to move this tick. Injected horizontal velocity leaves the vertical
/// component to gravity.
fn masked_step(
    velocity: &mut Vec3,
    constraints: Constraints,
    gravity: f32,
    delta_time: f32,
) -> Vec3 {
    if constraints.contains(Constraints::FREEZE_Y) {
        velocity.y = 0.;
    } else {
        velocity.y -= gravity * delta_time;
    }
    if constraints.contains(Constraints::FREEZE_X) {
        velocity.x = 0.;
    }
    if constraints.contains(Constraints::FREEZE_Z) {
        velocity.z = 0.;
    }
    *velocity * delta_time
}

fn aabb_intersects(center_a: Vec3, half_a: Vec3, center_b: Vec3, half_b: Vec3) -> bool {
    (center_a.x - center_b.x).abs() <= half_a.x + half_b.x
        && (center_a.y - center_b.y).abs() <= half_a.y + half_b.y
        && (center_a.z - center_b.z).abs() <= half_a.z + half_b.z
}

fn move_bodies(
    settings: Res<PhysicsSettings>,
    matrix: Res<CollisionMatrix>,
    mut bodies: Query<(&mut Transform, &mut Velocity, &PhysicsBody, &BoxCollider)>,
    supports: Query<(&GlobalTransform, &BoxCollider, &PhysicsBody), With<Support>>,
) {
    let delta_time = PHYSICS_TIME_STEP as f32;

    for (mut transform, mut velocity, body, collider) in bodies.iter_mut() {
        let step = masked_step(&mut **velocity, body.constraints, settings.gravity, delta_time);
        transform.translation += step;

        if velocity.y > 0. {
            continue;
        }
        for (support_transform, support_collider, support_body) in supports.iter() {
            if matrix.is_ignored(body.layer, support_body.layer) {
                continue;
            }
            let support_pos = support_transform.translation;
            if (transform.translation.x - support_pos.x).abs() > support_collider.half_extents.x
                || (transform.translation.z - support_pos.z).abs()
                    > support_collider.half_extents.z
            {
                continue;
            }
            let top = support_pos.y + support_collider.half_extents.y;
            let bottom = transform.translation.y - collider.half_extents.y;
            let penetration = top - bottom;
            if penetration >= 0. && penetration <= REST_TOLERANCE {
                transform.translation.y = top + collider.half_extents.y;
                velocity.y = 0.;
            }
        }
    }
}

fn detect_contacts(
    matrix: Res<CollisionMatrix>,
    mut touching: Local<HashSet<(Entity, Entity)>>,
    mut events: EventWriter<ContactStarted>,
    colliders: Query<(Entity, &GlobalTransform, &BoxCollider, &PhysicsBody)>,
) {
    let mut current = HashSet::default();

    for [(a, a_transform, a_collider, a_body), (b, b_transform, b_collider, b_body)] in
        colliders.iter_combinations()
    {
        if matrix.is_ignored(a_body.layer, b_body.layer) {
            continue;
        }
        if !aabb_intersects(
            a_transform.translation,
            a_collider.half_extents,
            b_transform.translation,
            b_collider.half_extents,
        ) {
            continue;
        }
        let pair = if a <= b { (a, b) } else { (b, a) };
        if !touching.contains(&pair) {
            events.send(ContactStarted {
                a: pair.0,
                b: pair.1,
            });
        }
        current.insert(pair);
    }

    *touching = current;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::vec3;

    #[test]
    fn gravity_accumulates_on_unfrozen_y() {
        let mut velocity = Vec3::ZERO;
        masked_step(&mut velocity, Constraints::empty(), 10.0, 0.1);
        masked_step(&mut velocity, Constraints::empty(), 10.0, 0.1);
        assert_eq!(velocity.y, -2.0);
    }

    #[test]
    fn horizontal_injection_preserves_vertical_velocity() {
        let mut velocity = vec3(0.0, -3.0, 0.0);
        velocity.z = 5.0;
        let step = masked_step(&mut velocity, Constraints::empty(), 10.0, 0.1);
        assert_eq!(velocity.z, 5.0);
        assert_eq!(velocity.y, -4.0);
        assert_eq!(step, vec3(0.0, -0.4, 0.5));
    }

    #[test]
    fn frozen_axes_move_nothing() {
        let mut velocity = vec3(2.0, -3.0, 5.0);
        let step = masked_step(&mut velocity, Constraints::FREEZE_XZ, 10.0, 0.1);
        assert_eq!(step.x, 0.0);
        assert_eq!(step.z, 0.0);
        // Y is unfrozen: gravity still acts.
        assert!(step.y < 0.0);

        let mut velocity = vec3(2.0, -3.0, 5.0);
        let step = masked_step(&mut velocity, Constraints::FREEZE_ALL, 10.0, 0.1);
        assert_eq!(step, Vec3::ZERO);
        assert_eq!(velocity, Vec3::ZERO);
    }

    #[test]
    fn freeze_composites_cover_expected_axes() {
        assert!(Constraints::FREEZE_XZ.contains(Constraints::FREEZE_X));
        assert!(Constraints::FREEZE_XZ.contains(Constraints::FREEZE_Z));
        assert!(!Constraints::FREEZE_XZ.contains(Constraints::FREEZE_Y));
        assert!(Constraints::FREEZE_ALL.contains(Constraints::FREEZE_XZ | Constraints::FREEZE_Y));
    }

    #[test]
    fn aabb_overlap() {
        let half = vec3(0.5, 0.5, 0.5);
        assert!(aabb_intersects(Vec3::ZERO, half, vec3(0.9, 0.0, 0.0), half));
        assert!(!aabb_intersects(Vec3::ZERO, half, vec3(1.1, 0.0, 0.0), half));
        // Touching faces count as contact.
        assert!(aabb_intersects(Vec3::ZERO, half, vec3(1.0, 0.0, 0.0), half));
    }

    #[test]
    fn collision_matrix_is_symmetric_and_one_shot() {
        let mut matrix = CollisionMatrix::default();
        assert!(!matrix.is_ignored(Layer::Performer, Layer::Building));
        matrix.ignore(Layer::Building, Layer::Performer);
        assert!(matrix.is_ignored(Layer::Performer, Layer::Building));
        assert!(matrix.is_ignored(Layer::Building, Layer::Performer));
        // Re-ignoring is a no-op.
        matrix.ignore(Layer::Performer, Layer::Building);
        assert!(matrix.is_ignored(Layer::Performer, Layer::Building));
        assert!(!matrix.is_ignored(Layer::Catcher, Layer::Building));
    }
}
