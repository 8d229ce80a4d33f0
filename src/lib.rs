pub mod camera;
pub mod catcher;
pub mod debug;
pub mod input_mapper;
pub mod legs;
pub mod pausing;
pub mod performer;
pub mod physics;
pub mod sequence;
pub mod smoothing;

use bevy::{math::vec3, prelude::*};
use enum_map::EnumMap;

use crate::{
    camera::{OffsetFollow, SequenceCamera},
    catcher::Catcher,
    input_mapper::InputMapper,
    legs::{JointDrive, LegRig},
    performer::{Limb, MirrorGroup, Performer, PoseMirror},
    physics::{BoxCollider, Layer, PhysicsBody, Support, Velocity},
};

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum AppState {
    Playing,
    Paused,
}

/// Builds the stunt scene: a building with a walkable roof, the performer on
/// top of it, the sequence camera and follow light, the catcher waiting at
/// street level, and the leg rig with its hidden mat.
pub fn setup(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut input_mapper: ResMut<InputMapper>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    input_mapper.mappings = asset_server.load("input.ron");

    let street_material = materials.add(StandardMaterial {
        base_color: Color::rgb(0.25, 0.25, 0.28),
        ..default()
    });
    let building_material = materials.add(StandardMaterial {
        base_color: Color::rgb(0.6, 0.55, 0.5),
        ..default()
    });
    let performer_material = materials.add(StandardMaterial {
        base_color: Color::rgb(0.8, 0.3, 0.2),
        ..default()
    });
    let catcher_material = materials.add(StandardMaterial {
        base_color: Color::rgb(0.2, 0.4, 0.8),
        ..default()
    });
    let rig_material = materials.add(StandardMaterial {
        base_color: Color::rgb(0.3, 0.3, 0.3),
        ..default()
    });
    let mat_material = materials.add(StandardMaterial {
        base_color: Color::rgb(0.9, 0.8, 0.2),
        ..default()
    });

    // Street. Its top face sits at y = 0.
    commands
        .spawn_bundle(PbrBundle {
            mesh: meshes.add(Mesh::from(shape::Box::new(80., 0.5, 80.))),
            material: street_material,
            transform: Transform::from_xyz(0., -0.25, 20.),
            ..default()
        })
        .insert(PhysicsBody::new(Layer::Prop))
        .insert(BoxCollider {
            half_extents: vec3(40., 0.25, 40.),
        })
        .insert(Support);

    // Building. Roof top at y = 10; the performer runs off its +Z edge.
    commands
        .spawn_bundle(PbrBundle {
            mesh: meshes.add(Mesh::from(shape::Box::new(6., 10., 6.))),
            material: building_material,
            transform: Transform::from_xyz(0., 5., 0.),
            ..default()
        })
        .insert(PhysicsBody::new(Layer::Building))
        .insert(BoxCollider {
            half_extents: vec3(3., 5., 3.),
        })
        .insert(Support);

    // Performer, standing on the roof.
    let performer_start = vec3(0., 10.5, -1.);
    let performer = commands
        .spawn_bundle(PbrBundle {
            mesh: meshes.add(Mesh::from(shape::Cube { size: 1.0 })),
            material: performer_material.clone(),
            transform: Transform::from_translation(performer_start),
            ..default()
        })
        .insert(Velocity::default())
        .insert(PhysicsBody::new(Layer::Performer))
        .insert(BoxCollider {
            half_extents: Vec3::splat(0.5),
        })
        .insert(Performer::default())
        .id();

    // Limb parts (children of the body) and the standalone reference poses
    // they slerp toward once the body goes loose.
    let part_mesh = meshes.add(Mesh::from(shape::Box::new(0.25, 0.7, 0.25)));
    let mut groups: EnumMap<Limb, MirrorGroup> = EnumMap::default();
    for (limb, offset, spread) in [
        (Limb::LeftArm, vec3(-0.65, 0.2, 0.), Quat::from_rotation_z(1.2)),
        (Limb::RightArm, vec3(0.65, 0.2, 0.), Quat::from_rotation_z(-1.2)),
        (Limb::LeftLeg, vec3(-0.2, -0.85, 0.), Quat::from_rotation_x(0.6)),
        (Limb::RightLeg, vec3(0.2, -0.85, 0.), Quat::from_rotation_x(-0.6)),
        (Limb::Chest, vec3(0., 0.75, 0.), Quat::from_rotation_x(0.3)),
    ] {
        let part = commands
            .spawn_bundle(PbrBundle {
                mesh: part_mesh.clone(),
                material: performer_material.clone(),
                transform: Transform::from_translation(offset),
                ..default()
            })
            .id();
        commands.entity(performer).push_children(&[part]);

        let reference = commands
            .spawn_bundle(TransformBundle::from_transform(Transform::from_rotation(
                spread,
            )))
            .id();

        groups[limb] = MirrorGroup {
            parts: vec![part],
            references: vec![reference],
        };
    }
    commands
        .entity(performer)
        .insert(PoseMirror { groups });

    // Sequence camera, placed above and behind the performer.
    commands
        .spawn_bundle(PerspectiveCameraBundle {
            transform: Transform::from_xyz(0., 13.5, -7.).looking_at(performer_start, Vec3::Y),
            ..PerspectiveCameraBundle::new_3d()
        })
        .insert(SequenceCamera::new(performer));

    // Key light tracking the performer at its spawn offset.
    commands
        .spawn_bundle(PointLightBundle {
            point_light: PointLight {
                intensity: 3000.,
                shadows_enabled: true,
                ..default()
            },
            transform: Transform::from_xyz(4., 14., -4.),
            ..default()
        })
        .insert(OffsetFollow::new(performer));

    // Catcher at street level.
    commands
        .spawn_bundle(PbrBundle {
            mesh: meshes.add(Mesh::from(shape::Cube { size: 1.0 })),
            material: catcher_material,
            transform: Transform::from_xyz(0., 0.5, 9.),
            ..default()
        })
        .insert(Velocity::default())
        .insert(PhysicsBody::new(Layer::Catcher))
        .insert(BoxCollider {
            half_extents: Vec3::splat(0.5),
        })
        .insert(Catcher::new(performer));

    // Leg rig beside the landing area, two legs of four joints each, plus
    // the mat it deploys. Joints spawn snapped to their lower limits and the
    // mat stays hidden until the rig finishes a cycle.
    let joint_mesh = meshes.add(Mesh::from(shape::Box::new(0.12, 0.5, 0.12)));
    let mut joints = Vec::new();
    for leg in 0..2 {
        for segment in 0..4 {
            let x = if leg == 0 { 2.2 } else { 2.8 };
            let joint = commands
                .spawn_bundle(PbrBundle {
                    mesh: joint_mesh.clone(),
                    material: rig_material.clone(),
                    transform: Transform::from_xyz(x, 0.3, 8.0 + segment as f32 * 0.5),
                    ..default()
                })
                .insert(JointDrive::lowered(-30., 60.))
                .id();
            joints.push(joint);
        }
    }
    let mat = commands
        .spawn_bundle(PbrBundle {
            mesh: meshes.add(Mesh::from(shape::Box::new(3., 0.2, 3.))),
            material: mat_material,
            transform: Transform::from_xyz(0., 0.1, 10.),
            visibility: Visibility { is_visible: false },
            ..default()
        })
        .id();
    commands.spawn().insert(LegRig {
        joints,
        mat: Some(mat),
        ..default()
    });
}
