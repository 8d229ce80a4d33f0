use bevy::prelude::*;
use bevy_egui::EguiPlugin;

use stunt_test::{
    camera::CameraPlugin, catcher::CatcherPlugin, debug::DebugPlugin,
    input_mapper::InputBindingPlugin, legs::LegPlugin, pausing::PausePlugin,
    performer::PerformerPlugin, physics::PhysicsPlugin, setup, AppState,
};

fn main() {
    // Bevy's own LogPlugin is disabled below; env_logger owns log output.
    env_logger::init();

    App::new()
        .insert_resource(WindowDescriptor {
            title: "Stunt test".to_owned(),
            ..default()
        })
        .insert_resource(Msaa { samples: 4 })
        .add_plugins_with(DefaultPlugins, |group| {
            group.disable::<bevy::log::LogPlugin>()
        })
        .add_plugin(EguiPlugin)
        .add_plugin(InputBindingPlugin)
        .add_plugin(PhysicsPlugin)
        .add_plugin(CameraPlugin)
        .add_plugin(PerformerPlugin)
        .add_plugin(CatcherPlugin)
        .add_plugin(LegPlugin)
        .add_plugin(PausePlugin)
        .add_plugin(DebugPlugin)
        .add_state(AppState::Playing)
        .add_startup_system(setup)
        .run();
}
