use std::time::Duration;

/// Infinitely repeating phase clock.
///
/// The clock only moves when it is advanced, so the owner decides what a
/// frame is. On each loop boundary it restarts at phase 0.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopingAnimation {
    duration: Duration,
    /// Seconds into the current loop, always in `[0, duration)`
    elapsed: f64,
    paused: bool,
}

impl LoopingAnimation {
    /// A running animation at phase 0. `duration` must be non-zero.
    pub fn new(duration: Duration) -> Self {
        debug_assert!(!duration.is_zero(), "loop duration must be positive");
        LoopingAnimation {
            duration,
            elapsed: 0.0,
            paused: false,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Replaces the loop length. Elapsed time is kept, so the phase changes;
    /// follow with [`seek`](Self::seek) to hold it.
    pub fn set_duration(&mut self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        self.duration = duration;
        self.elapsed = self.elapsed.rem_euclid(duration.as_secs_f64());
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Position within the current loop in [0, 1)
    pub fn animated_fraction(&self) -> f32 {
        (self.elapsed / self.duration.as_secs_f64()) as f32
    }

    /// Jumps to `fraction` of the loop, wrapping values outside [0, 1)
    pub fn seek(&mut self, fraction: f32) {
        let fraction = (fraction as f64).rem_euclid(1.0);
        self.elapsed = fraction * self.duration.as_secs_f64();
    }

    /// Moves the clock forward unless paused
    pub fn advance(&mut self, dt: Duration) {
        if self.paused {
            return;
        }
        let total = self.duration.as_secs_f64();
        self.elapsed = (self.elapsed + dt.as_secs_f64()).rem_euclid(total);
    }
}
