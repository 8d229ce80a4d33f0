use std::collections::HashSet;

use bevy::{
    asset::{AssetLoader, LoadedAsset},
    input::{
        gamepad::{ButtonSettings, GamepadSettings},
        keyboard::KeyboardInput,
        mouse::MouseButtonInput,
    },
    prelude::*,
    reflect::TypeUuid,
};
use enum_map::{enum_map, Enum, EnumMap};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum, Deserialize)]
#[non_exhaustive]
pub enum Action {
    /// Arms the performer's forward run.
    Advance,
    /// Starts or restarts the leg rig cycle.
    CycleLegs,
    Pause,
}

/// Triggers that have a state defined by an [ActionState] value.
#[derive(Clone, Hash, PartialEq, Eq, Debug, Deserialize)]
pub enum DigitalTrigger {
    Key(KeyCode),
    MouseButton(MouseButton),
    GamepadButton(GamepadButton),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
pub enum ActionState {
    Released,
    JustReleased,
    JustPressed,
    Held,
}

impl Default for ActionState {
    fn default() -> Self {
        ActionState::Released
    }
}

impl ActionState {
    pub fn is_pressed(self) -> bool {
        matches!(self, Self::JustPressed | Self::Held)
    }
}

#[derive(Debug, Default)]
struct TriggerRecord {
    just_pressed: HashSet<DigitalTrigger>,
    held: HashSet<DigitalTrigger>,
    just_released: HashSet<DigitalTrigger>,
}

impl TriggerRecord {
    fn update_gamepad_button(&mut self, b: GamepadButton, state: f32, settings: &ButtonSettings) {
        let trigger = DigitalTrigger::GamepadButton(b);
        match state {
            state if state > settings.press => {
                if !self.held.contains(&trigger) {
                    self.press(trigger);
                }
            }
            state if state < settings.release => {
                if self.held.contains(&trigger) {
                    self.release(trigger);
                }
            }
            _ => (),
        };
    }

    fn press(&mut self, trigger: DigitalTrigger) {
        if !self.held.contains(&trigger) {
            self.just_pressed.insert(trigger);
        }
    }

    fn release(&mut self, trigger: DigitalTrigger) {
        self.held.remove(&trigger);
        self.just_released.insert(trigger);
    }

    /// Convert "just pressed" triggers to held ones and clear "just released" triggers
    fn finish_frame(&mut self) {
        self.held.extend(std::mem::take(&mut self.just_pressed));
        self.just_released.clear();
    }

    fn digital_trigger_state(&self, trigger: &DigitalTrigger) -> ActionState {
        if self.held.contains(trigger) {
            ActionState::Held
        } else if self.just_pressed.contains(trigger) {
            ActionState::JustPressed
        } else if self.just_released.contains(trigger) {
            ActionState::JustReleased
        } else {
            ActionState::Released
        }
    }
}

/// A binding from an input source to an action.
#[derive(Deserialize, Debug)]
pub struct ActionBinding {
    primary: DigitalTrigger,
    secondary: Option<DigitalTrigger>,
}

impl ActionBinding {
    pub fn new(primary: DigitalTrigger, secondary: Option<DigitalTrigger>) -> Self {
        Self { primary, secondary }
    }
}

#[derive(Deserialize, TypeUuid, Debug)]
#[uuid = "6f9e2b5c-40d1-4a8e-9c37-51b8d06e7a24"]
pub struct InputMappings {
    actions: EnumMap<Action, ActionBinding>,
}

impl Default for InputMappings {
    fn default() -> Self {
        Self {
            actions: enum_map! {
                Action::Advance => ActionBinding::new(
                    DigitalTrigger::Key(KeyCode::Key1),
                    Some(DigitalTrigger::GamepadButton(GamepadButton(Gamepad(0), GamepadButtonType::South))),
                ),
                Action::CycleLegs => ActionBinding::new(
                    DigitalTrigger::Key(KeyCode::Key2),
                    Some(DigitalTrigger::GamepadButton(GamepadButton(Gamepad(0), GamepadButtonType::West))),
                ),
                Action::Pause => ActionBinding::new(
                    DigitalTrigger::Key(KeyCode::Escape),
                    Some(DigitalTrigger::GamepadButton(GamepadButton(Gamepad(0), GamepadButtonType::Start))),
                ),
            },
        }
    }
}

pub struct InputMappingsLoader;

impl AssetLoader for InputMappingsLoader {
    fn load<'a>(
        &'a self,
        bytes: &'a [u8],
        load_context: &'a mut bevy::asset::LoadContext,
    ) -> bevy::asset::BoxedFuture<'a, anyhow::Result<(), anyhow::Error>> {
        Box::pin(async move {
            let loaded_asset = LoadedAsset::new(ron::de::from_bytes::<InputMappings>(bytes)?);
            load_context.set_default_asset(loaded_asset);

            Ok(())
        })
    }

    fn extensions(&self) -> &[&str] {
        &["ron"]
    }
}

/// An intermediate resource that holds a handle to the input mappings to use as well as the trigger record.
///
/// Data from the mapper is uploaded to the [`Input`] resource, ready to use.
#[derive(Debug, Default)]
pub struct InputMapper {
    pub mappings: Handle<InputMappings>,
    trigger_record: TriggerRecord,
}

/// A resource holding the mapped action state for this frame.
#[derive(Default)]
pub struct Input {
    pub actions: EnumMap<Action, ActionState>,
}

fn upload_input(
    mapper: Res<InputMapper>,
    bindings: Res<Assets<InputMappings>>,
    mut input: ResMut<Input>,
) {
    let mappings = if let Some(x) = bindings.get(&mapper.mappings) {
        x
    } else {
        return;
    };

    mappings.actions.iter().for_each(|(action, bindings)| {
        let primary = mapper
            .trigger_record
            .digital_trigger_state(&bindings.primary);

        let secondary = bindings
            .secondary
            .as_ref()
            .map(|secondary| mapper.trigger_record.digital_trigger_state(secondary));

        input.actions[action] = if let Some(secondary) = secondary {
            primary.max(secondary)
        } else {
            primary
        }
    });
}

fn update_mouse_input(
    mut input_binder: ResMut<InputMapper>,
    mut events: EventReader<MouseButtonInput>,
) {
    for event in events.iter() {
        let trigger = DigitalTrigger::MouseButton(event.button);
        match event.state {
            bevy::input::ElementState::Pressed => input_binder.trigger_record.press(trigger),
            bevy::input::ElementState::Released => input_binder.trigger_record.release(trigger),
        }
    }
}

fn update_keyboard_input(
    mut input_binder: ResMut<InputMapper>,
    mut events: EventReader<KeyboardInput>,
) {
    for (state, keycode) in events
        .iter()
        .filter_map(|event| event.key_code.map(|keycode| (event.state, keycode)))
    {
        let trigger = DigitalTrigger::Key(keycode);
        match state {
            bevy::input::ElementState::Pressed => input_binder.trigger_record.press(trigger),
            bevy::input::ElementState::Released => input_binder.trigger_record.release(trigger),
        }
    }
}

fn update_gamepad_input(
    mut input_binder: ResMut<InputMapper>,
    settings: Res<GamepadSettings>,
    mut events: EventReader<GamepadEvent>,
) {
    for event in events.iter() {
        if let GamepadEventType::ButtonChanged(ty, state) = event.1 {
            let button = GamepadButton(event.0, ty);
            input_binder.trigger_record.update_gamepad_button(
                button,
                state,
                settings.get_button_settings(button),
            );
        }
    }
}

fn update_trigger_record(mut input_binder: ResMut<InputMapper>) {
    input_binder.trigger_record.finish_frame();
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
struct InputBindStage;
impl StageLabel for InputBindStage {
    fn dyn_clone(&self) -> std::boxed::Box<(dyn bevy::prelude::StageLabel + 'static)> {
        Box::new(*self)
    }
}

pub struct InputBindingPlugin;

impl Plugin for InputBindingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InputMapper>()
            .init_resource::<Input>()
            .add_asset::<InputMappings>()
            .add_asset_loader(InputMappingsLoader)
            .add_stage_after(
                CoreStage::PreUpdate,
                InputBindStage,
                SystemStage::parallel(),
            )
            .add_system_set_to_stage(
                InputBindStage,
                SystemSet::new()
                    .with_system(update_mouse_input)
                    .with_system(update_keyboard_input)
                    .with_system(update_gamepad_input)
                    .label("update input"),
            )
            .add_system_to_stage(InputBindStage, upload_input.after("update input"))
            .add_system_to_stage(CoreStage::Last, update_trigger_record);
    }
}
