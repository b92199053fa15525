//! Looping rotation driven by the shared speed settings.
//!
//! Speed is encoded as the loop duration. When the user changes a
//! multiplier the duration is rescaled and the clock is re-seeked to the
//! phase it had, so nodes never jump.

use std::rc::Rc;
use std::time::Duration;

use glam::Quat;
use log::{debug, trace};

use crate::animation::LoopingAnimation;
use crate::math::{loop_duration, orientation_at};
use crate::state::{MotionKind, SolarSettings};

/// Base angular rate of a rotating node
pub const DEFAULT_DEGREES_PER_SECOND: f32 = 90.0;

#[derive(Clone, Debug, PartialEq)]
enum ControllerState {
    Inactive,
    Animating {
        animation: LoopingAnimation,
        last_speed_multiplier: f32,
    },
}

/// Per-node rotation state machine
#[derive(Clone, Debug)]
pub struct RotationController {
    settings: Rc<SolarSettings>,
    motion: MotionKind,
    degrees_per_second: f32,
    state: ControllerState,
}

impl RotationController {
    pub fn new(settings: Rc<SolarSettings>, motion: MotionKind) -> Self {
        RotationController {
            settings,
            motion,
            degrees_per_second: DEFAULT_DEGREES_PER_SECOND,
            state: ControllerState::Inactive,
        }
    }

    pub fn with_degrees_per_second(mut self, degrees_per_second: f32) -> Self {
        self.degrees_per_second = degrees_per_second;
        self
    }

    pub fn motion(&self) -> MotionKind {
        self.motion
    }

    pub fn degrees_per_second(&self) -> f32 {
        self.degrees_per_second
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, ControllerState::Animating { .. })
    }

    fn speed_multiplier(&self) -> f32 {
        self.settings.speed_multiplier(self.motion)
    }

    /// Starts a fresh loop at phase 0. No-op while already animating.
    pub fn activate(&mut self) {
        if self.is_active() {
            return;
        }
        let multiplier = self.speed_multiplier();
        let animation = match loop_duration(self.degrees_per_second, multiplier) {
            Some(duration) => LoopingAnimation::new(duration),
            None => {
                // Zero speed: build the loop at unit speed and hold it at phase 0
                let duration = loop_duration(self.degrees_per_second, 1.0)
                    .unwrap_or(Duration::from_secs(4));
                let mut animation = LoopingAnimation::new(duration);
                animation.pause();
                animation
            }
        };
        trace!(
            "activate {:?} node at {} deg/s, multiplier {}",
            self.motion,
            self.degrees_per_second,
            multiplier
        );
        self.state = ControllerState::Animating {
            animation,
            last_speed_multiplier: multiplier,
        };
    }

    /// Drops the running animation
    pub fn deactivate(&mut self) {
        self.state = ControllerState::Inactive;
    }

    /// Per-frame step: follow the speed setting, then advance by `dt`
    pub fn update(&mut self, dt: Duration) {
        let multiplier = self.speed_multiplier();
        let degrees_per_second = self.degrees_per_second;
        let ControllerState::Animating {
            animation,
            last_speed_multiplier,
        } = &mut self.state
        else {
            return;
        };

        if *last_speed_multiplier != multiplier {
            match loop_duration(degrees_per_second, multiplier) {
                None => animation.pause(),
                Some(duration) => {
                    animation.resume();
                    let fraction = animation.animated_fraction();
                    animation.set_duration(duration);
                    animation.seek(fraction);
                }
            }
            debug!(
                "{:?} multiplier {} -> {}, loop {:?}",
                self.motion,
                last_speed_multiplier,
                multiplier,
                animation.duration()
            );
            *last_speed_multiplier = multiplier;
        }

        animation.advance(dt);
    }

    /// Current phase, `None` while inactive
    pub fn phase(&self) -> Option<f32> {
        match &self.state {
            ControllerState::Animating { animation, .. } => Some(animation.animated_fraction()),
            ControllerState::Inactive => None,
        }
    }

    /// Current loop duration, `None` while inactive
    pub fn duration(&self) -> Option<Duration> {
        match &self.state {
            ControllerState::Animating { animation, .. } => Some(animation.duration()),
            ControllerState::Inactive => None,
        }
    }

    pub fn is_paused(&self) -> bool {
        match &self.state {
            ControllerState::Animating { animation, .. } => animation.is_paused(),
            ControllerState::Inactive => false,
        }
    }

    /// Local rotation for the owning node; identity while inactive
    pub fn orientation(&self) -> Quat {
        self.phase().map(orientation_at).unwrap_or(Quat::IDENTITY)
    }
}
