use bevy::prelude::*;

use crate::{
    input_mapper::{Action, ActionState, Input},
    smoothing, AppState,
};

/// Articulated joint drive. `target` is the commanded angle in degrees,
/// rendered as a local-X rotation in PostUpdate.
#[derive(Component, Debug, Clone, Copy)]
pub struct JointDrive {
    pub lower: f32,
    pub upper: f32,
    pub target: f32,
}

impl JointDrive {
    /// A drive resting at its lower limit, the pose every joint snaps to at
    /// startup.
    pub fn lowered(lower: f32, upper: f32) -> Self {
        Self {
            lower,
            upper,
            target: lower,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegPhase {
    Idle,
    Raise,
    HoldRaised,
    Lower,
    HoldLowered,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RampGoal {
    /// Blend every joint toward its own upper limit.
    Upper,
    /// Blend every joint toward zero.
    Zero,
}

/// What the rig should do with its joints this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LegAction {
    None,
    Ramp { progress: f32, goal: RampGoal },
    Reveal,
}

/// Raise → hold → lower → hold → reveal, advanced by accumulated elapsed
/// time. Starting it again mid-flight cancels the remaining steps and
/// restarts timing from zero; the generation counter invalidates the
/// replaced run.
#[derive(Debug)]
pub struct LegScript {
    phase: LegPhase,
    elapsed: f32,
    generation: u32,
    needs_capture: bool,
    starts: Vec<f32>,
}

impl Default for LegScript {
    fn default() -> Self {
        Self {
            phase: LegPhase::Idle,
            elapsed: 0.,
            generation: 0,
            needs_capture: false,
            starts: Vec::new(),
        }
    }
}

impl LegScript {
    pub fn restart(&mut self) {
        self.phase = LegPhase::Raise;
        self.elapsed = 0.;
        self.generation += 1;
        self.needs_capture = true;
        log::debug!("leg script started (generation {})", self.generation);
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn running(&self) -> bool {
        !matches!(self.phase, LegPhase::Idle | LegPhase::Done)
    }

    /// True when the next ramp needs fresh blend start values.
    pub fn capture_pending(&self) -> bool {
        self.needs_capture
    }

    pub fn set_starts(&mut self, starts: Vec<f32>) {
        self.starts = starts;
        self.needs_capture = false;
    }

    /// Blend start for the joint at `index`; joints added after capture
    /// blend from zero.
    pub fn start(&self, index: usize) -> f32 {
        self.starts.get(index).copied().unwrap_or(0.)
    }

    fn enter(&mut self, phase: LegPhase) {
        self.phase = phase;
        self.elapsed = 0.;
        if phase == LegPhase::Lower {
            self.needs_capture = true;
        }
    }

    pub fn advance(&mut self, delta: f32, move_duration: f32, hold_duration: f32) -> LegAction {
        self.elapsed += delta;
        match self.phase {
            LegPhase::Idle | LegPhase::Done => LegAction::None,
            LegPhase::Raise => {
                if self.elapsed >= move_duration {
                    self.enter(LegPhase::HoldRaised);
                    LegAction::Ramp {
                        progress: 1.,
                        goal: RampGoal::Upper,
                    }
                } else {
                    LegAction::Ramp {
                        progress: smoothing::eased_progress(self.elapsed, move_duration),
                        goal: RampGoal::Upper,
                    }
                }
            }
            LegPhase::HoldRaised => {
                if self.elapsed >= hold_duration {
                    self.enter(LegPhase::Lower);
                }
                LegAction::None
            }
            LegPhase::Lower => {
                if self.elapsed >= move_duration {
                    self.enter(LegPhase::HoldLowered);
                    LegAction::Ramp {
                        progress: 1.,
                        goal: RampGoal::Zero,
                    }
                } else {
                    LegAction::Ramp {
                        progress: smoothing::eased_progress(self.elapsed, move_duration),
                        goal: RampGoal::Zero,
                    }
                }
            }
            LegPhase::HoldLowered => {
                if self.elapsed >= hold_duration {
                    self.enter(LegPhase::Done);
                    LegAction::Reveal
                } else {
                    LegAction::None
                }
            }
        }
    }
}

/// A set of leg joints cycled together, plus the mat revealed at the end of
/// a cycle.
#[derive(Component)]
pub struct LegRig {
    pub joints: Vec<Entity>,
    pub mat: Option<Entity>,
    pub move_duration: f32,
    pub hold_duration: f32,
    pub script: LegScript,
}

impl Default for LegRig {
    fn default() -> Self {
        Self {
            joints: Vec::new(),
            mat: None,
            move_duration: 1.,
            hold_duration: 1.,
            script: LegScript::default(),
        }
    }
}

pub struct LegPlugin;

impl Plugin for LegPlugin {
    fn build(&self, app: &mut App) {
        app.add_system_set(
            SystemSet::on_update(AppState::Playing)
                .with_system(cycle_rigs)
                .with_system(drive_rigs.after(cycle_rigs)),
        )
        .add_system_to_stage(CoreStage::PostUpdate, apply_joint_drives);
    }
}

fn cycle_rigs(input: Res<Input>, mut rigs: Query<&mut LegRig>) {
    if input.actions[Action::CycleLegs] != ActionState::JustPressed {
        return;
    }
    for mut rig in rigs.iter_mut() {
        if rig.script.running() {
            log::info!("leg cycle restarted");
        } else {
            log::info!("leg cycle started");
        }
        rig.script.restart();
    }
}

fn drive_rigs(
    time: Res<Time>,
    mut rigs: Query<&mut LegRig>,
    mut joints: Query<&mut JointDrive>,
    mut mats: Query<&mut Visibility>,
) {
    let delta = time.delta_seconds();

    for mut rig in rigs.iter_mut() {
        let rig = &mut *rig;

        if rig.script.capture_pending() {
            let starts = rig
                .joints
                .iter()
                .map(|&joint| joints.get(joint).map(|drive| drive.target).unwrap_or(0.))
                .collect();
            rig.script.set_starts(starts);
        }

        match rig.script.advance(delta, rig.move_duration, rig.hold_duration) {
            LegAction::None => {}
            LegAction::Ramp { progress, goal } => {
                for (index, &joint) in rig.joints.iter().enumerate() {
                    let mut drive = if let Ok(drive) = joints.get_mut(joint) {
                        drive
                    } else {
                        continue;
                    };
                    let end = match goal {
                        RampGoal::Upper => drive.upper,
                        RampGoal::Zero => 0.,
                    };
                    drive.target = smoothing::blend(rig.script.start(index), end, progress);
                }
            }
            LegAction::Reveal => {
                if let Some(mat) = rig.mat {
                    if let Ok(mut visibility) = mats.get_mut(mat) {
                        visibility.is_visible = true;
                        log::info!("mat revealed");
                    }
                }
            }
        }
    }
}

fn apply_joint_drives(mut joints: Query<(&JointDrive, &mut Transform)>) {
    for (drive, mut transform) in joints.iter_mut() {
        transform.rotation = Quat::from_rotation_x(drive.target.to_radians());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(action: LegAction) -> (f32, RampGoal) {
        match action {
            LegAction::Ramp { progress, goal } => (progress, goal),
            other => panic!("expected a ramp, got {:?}", other),
        }
    }

    #[test]
    fn idle_script_does_nothing() {
        let mut script = LegScript::default();
        assert_eq!(script.advance(10.0, 1.0, 1.0), LegAction::None);
        assert!(!script.running());
    }

    #[test]
    fn full_cycle_reveals_once() {
        let mut script = LegScript::default();
        script.restart();
        script.set_starts(vec![0.0, 0.0]);

        // Raise: eased, then exact arrival when the duration elapses.
        let (progress, goal) = ramp(script.advance(0.5, 1.0, 1.0));
        assert_eq!(goal, RampGoal::Upper);
        assert_eq!(progress, 0.5);
        let (progress, _) = ramp(script.advance(0.5, 1.0, 1.0));
        assert_eq!(progress, 1.0);

        // Hold up for a second.
        assert_eq!(script.advance(0.9, 1.0, 1.0), LegAction::None);
        assert_eq!(script.advance(0.2, 1.0, 1.0), LegAction::None);

        // Lower needs fresh blend starts.
        assert!(script.capture_pending());
        script.set_starts(vec![40.0, 40.0]);
        let (_, goal) = ramp(script.advance(0.5, 1.0, 1.0));
        assert_eq!(goal, RampGoal::Zero);
        ramp(script.advance(0.6, 1.0, 1.0));

        // Hold down, then the mat comes out exactly once.
        assert_eq!(script.advance(0.5, 1.0, 1.0), LegAction::None);
        assert_eq!(script.advance(0.6, 1.0, 1.0), LegAction::Reveal);
        assert_eq!(script.advance(5.0, 1.0, 1.0), LegAction::None);
        assert!(!script.running());
    }

    #[test]
    fn raise_progress_is_eased() {
        let mut script = LegScript::default();
        script.restart();
        script.set_starts(vec![0.0]);
        let (progress, _) = ramp(script.advance(0.1, 1.0, 1.0));
        assert!(progress < 0.1);
    }

    #[test]
    fn restart_cancels_in_flight_run() {
        let mut script = LegScript::default();
        script.restart();
        script.set_starts(vec![0.0]);
        assert_eq!(script.generation(), 1);

        // Deep into the lower phase...
        script.advance(1.0, 1.0, 1.0);
        script.advance(1.0, 1.0, 1.0);
        script.set_starts(vec![40.0]);
        script.advance(0.5, 1.0, 1.0);

        // ...a restart goes back to raising from scratch.
        script.restart();
        assert_eq!(script.generation(), 2);
        assert!(script.capture_pending());
        script.set_starts(vec![17.0]);
        let (progress, goal) = ramp(script.advance(0.5, 1.0, 1.0));
        assert_eq!(goal, RampGoal::Upper);
        assert_eq!(progress, 0.5);
        assert_eq!(script.start(0), 17.0);
    }

    #[test]
    fn degenerate_duration_completes_immediately() {
        let mut script = LegScript::default();
        script.restart();
        script.set_starts(vec![0.0]);
        let (progress, _) = ramp(script.advance(0.016, 0.0, 1.0));
        assert_eq!(progress, 1.0);
    }

    #[test]
    fn missing_capture_blends_from_zero() {
        let mut script = LegScript::default();
        script.restart();
        script.set_starts(vec![12.0]);
        assert_eq!(script.start(0), 12.0);
        // A joint index past the captured prefix.
        assert_eq!(script.start(5), 0.0);
    }
}
