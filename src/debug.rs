use bevy::prelude::*;
use bevy_egui::{egui, EguiContext};

use crate::{
    camera::SequenceCamera,
    catcher::{Catcher, Restraint},
    performer::Performer,
    physics::Velocity,
};

#[derive(Default)]
pub struct DebugMode {
    pub active: bool,
}

pub struct DebugPlugin;

impl Plugin for DebugPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DebugMode>()
            .add_system(debug_mode_activator)
            .add_system(scene_state_window)
            .add_system(tuning_window);
    }
}

fn debug_mode_activator(input: Res<Input<KeyCode>>, mut debug: ResMut<DebugMode>) {
    if input.just_pressed(KeyCode::I) {
        debug.active = !debug.active;
    }
}

fn scene_state_window(
    debug: Res<DebugMode>,
    mut egui: ResMut<EguiContext>,
    performers: Query<(&Performer, &Velocity)>,
    cameras: Query<&SequenceCamera>,
    catchers: Query<&Catcher>,
    restraints: Query<&Restraint>,
) {
    if !debug.active {
        return;
    }
    egui::Window::new("Scene state [debug]").show(egui.ctx_mut(), |ui| {
        for (performer, velocity) in performers.iter() {
            ui.label(format!("Ragdoll: {}", performer.ragdoll()));
            ui.label(format!("Run goal: {:?}", performer.goal_z()));
            ui.label(format!("Velocity: {:?}", **velocity));
        }
        for camera in cameras.iter() {
            ui.label(format!("Camera stage: {:?}", camera.stage()));
        }
        for catcher in catchers.iter() {
            ui.label(format!(
                "Pursuing: {}, caught: {}",
                catcher.pursuing(),
                catcher.caught()
            ));
        }
        for restraint in restraints.iter() {
            ui.label(format!("Restraint: {:?}", restraint));
        }
    });
}

fn tuning_window(
    debug: Res<DebugMode>,
    mut egui: ResMut<EguiContext>,
    mut cameras: Query<&mut SequenceCamera>,
    mut performers: Query<&mut Performer>,
    mut catchers: Query<&mut Catcher>,
) {
    if !debug.active {
        return;
    }
    egui::Window::new("Tuning [debug]").show(egui.ctx_mut(), |ui| {
        for mut camera in cameras.iter_mut() {
            ui.add(egui::Slider::new(&mut camera.move_speed, 0f32..=20.).text("Camera move speed"));
            ui.add(
                egui::Slider::new(&mut camera.rotation_speed, 0f32..=20.)
                    .text("Camera rotation speed"),
            );
        }
        for mut performer in performers.iter_mut() {
            ui.add(egui::Slider::new(&mut performer.run_speed, 0f32..=20.).text("Run speed"));
            ui.add(
                egui::Slider::new(&mut performer.rotation_speed, 0f32..=10.)
                    .text("Limb rotation speed"),
            );
        }
        for mut catcher in catchers.iter_mut() {
            ui.add(egui::Slider::new(&mut catcher.speed, 0f32..=20.).text("Catcher speed"));
        }
    });
}
