use std::cell::Cell;

use crate::error::SettingsError;

/// Which multiplier a rotating node follows
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionKind {
    /// Revolution of a pivot around its parent
    Orbit,
    /// Axial spin of a body
    Spin,
}

/// User-adjustable speed settings shared by every rotating node.
///
/// Handed out as `Rc<SolarSettings>`; all access happens on the frame loop
/// thread, so plain `Cell`s are enough.
#[derive(Debug)]
pub struct SolarSettings {
    orbit_speed_multiplier: Cell<f32>,
    rotation_speed_multiplier: Cell<f32>,
}

impl SolarSettings {
    pub fn new() -> Self {
        SolarSettings {
            orbit_speed_multiplier: Cell::new(1.0),
            rotation_speed_multiplier: Cell::new(1.0),
        }
    }

    /// Settings with explicit starting multipliers
    pub fn with_multipliers(orbit: f32, rotation: f32) -> Result<Self, SettingsError> {
        let settings = SolarSettings::new();
        settings.set_orbit_speed_multiplier(orbit)?;
        settings.set_rotation_speed_multiplier(rotation)?;
        Ok(settings)
    }

    pub fn orbit_speed_multiplier(&self) -> f32 {
        self.orbit_speed_multiplier.get()
    }

    pub fn set_orbit_speed_multiplier(&self, multiplier: f32) -> Result<(), SettingsError> {
        self.orbit_speed_multiplier.set(validate_multiplier(multiplier)?);
        Ok(())
    }

    pub fn rotation_speed_multiplier(&self) -> f32 {
        self.rotation_speed_multiplier.get()
    }

    pub fn set_rotation_speed_multiplier(&self, multiplier: f32) -> Result<(), SettingsError> {
        self.rotation_speed_multiplier
            .set(validate_multiplier(multiplier)?);
        Ok(())
    }

    /// The multiplier that applies to `kind`
    pub fn speed_multiplier(&self, kind: MotionKind) -> f32 {
        match kind {
            MotionKind::Orbit => self.orbit_speed_multiplier(),
            MotionKind::Spin => self.rotation_speed_multiplier(),
        }
    }

    pub fn set_speed_multiplier(&self, kind: MotionKind, multiplier: f32) -> Result<(), SettingsError> {
        match kind {
            MotionKind::Orbit => self.set_orbit_speed_multiplier(multiplier),
            MotionKind::Spin => self.set_rotation_speed_multiplier(multiplier),
        }
    }
}

impl Default for SolarSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Rejects values a duration cannot be derived from
pub fn validate_multiplier(multiplier: f32) -> Result<f32, SettingsError> {
    if multiplier.is_finite() && multiplier >= 0.0 {
        Ok(multiplier)
    } else {
        Err(SettingsError::InvalidMultiplier(multiplier))
    }
}

/// A seek bar bound to one of the speed multipliers
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedControl {
    pub kind: MotionKind,
    pub progress: u32,
    pub max: u32,
}

impl SpeedControl {
    /// Largest multiplier a full bar maps to
    pub const MAX_MULTIPLIER: f32 = 10.0;

    pub fn new(kind: MotionKind, settings: &SolarSettings) -> Self {
        let max = 100;
        let progress = (settings.speed_multiplier(kind) * 10.0).round() as u32;
        SpeedControl {
            kind,
            progress: progress.min(max),
            max,
        }
    }

    /// Moves the bar by `steps` and writes the resulting multiplier back
    pub fn step(&mut self, steps: i32, settings: &SolarSettings) -> Result<f32, SettingsError> {
        let progress = (self.progress as i64 + steps as i64).clamp(0, self.max as i64);
        self.progress = progress as u32;
        let multiplier = self.multiplier();
        settings.set_speed_multiplier(self.kind, multiplier)?;
        Ok(multiplier)
    }

    pub fn multiplier(&self) -> f32 {
        let ratio = self.progress as f32 / self.max as f32;
        ratio * Self::MAX_MULTIPLIER
    }

    /// Fill ratio in [0, 1]
    pub fn ratio(&self) -> f32 {
        self.progress as f32 / self.max as f32
    }
}

/// View state that is not part of the shared settings
#[derive(Clone, Debug)]
pub struct AppState {
    /// Enable debug overlay
    pub debug: bool,
    /// Session paused (terminal lost focus)
    pub paused: bool,
    /// Draw orbit rings
    pub show_orbits: bool,
    /// Camera yaw in radians
    pub camera_yaw: f32,
    /// Zoom level
    pub zoom: f32,
    /// Reticle position in cells
    pub reticle: [u16; 2],
}

impl AppState {
    pub fn new(width: u16, height: u16) -> Self {
        AppState {
            debug: false,
            paused: false,
            show_orbits: true,
            camera_yaw: 0.0,
            zoom: 1.0,
            reticle: [width / 2, height / 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unit_speed() {
        let settings = SolarSettings::default();
        assert_eq!(settings.orbit_speed_multiplier(), 1.0);
        assert_eq!(settings.rotation_speed_multiplier(), 1.0);
    }

    #[test]
    fn setters_are_independent() {
        let settings = SolarSettings::new();
        settings.set_orbit_speed_multiplier(3.0).unwrap();
        assert_eq!(settings.speed_multiplier(MotionKind::Orbit), 3.0);
        assert_eq!(settings.speed_multiplier(MotionKind::Spin), 1.0);

        settings.set_rotation_speed_multiplier(0.0).unwrap();
        assert_eq!(settings.speed_multiplier(MotionKind::Orbit), 3.0);
        assert_eq!(settings.speed_multiplier(MotionKind::Spin), 0.0);
    }

    #[test]
    fn negative_and_nan_are_rejected() {
        let settings = SolarSettings::new();
        assert_eq!(
            settings.set_orbit_speed_multiplier(-1.0),
            Err(SettingsError::InvalidMultiplier(-1.0))
        );
        assert!(settings.set_rotation_speed_multiplier(f32::NAN).is_err());
        assert!(settings.set_rotation_speed_multiplier(f32::INFINITY).is_err());
        // Rejected writes leave the previous value in place
        assert_eq!(settings.orbit_speed_multiplier(), 1.0);
        assert_eq!(settings.rotation_speed_multiplier(), 1.0);
    }

    #[test]
    fn speed_control_maps_progress_to_multiplier() {
        let settings = SolarSettings::new();
        let mut orbit = SpeedControl::new(MotionKind::Orbit, &settings);
        assert_eq!(orbit.progress, 10);
        assert_eq!(orbit.multiplier(), 1.0);

        let m = orbit.step(10, &settings).unwrap();
        assert_eq!(m, 2.0);
        assert_eq!(settings.orbit_speed_multiplier(), 2.0);
        assert_eq!(settings.rotation_speed_multiplier(), 1.0);

        orbit.step(-1000, &settings).unwrap();
        assert_eq!(settings.orbit_speed_multiplier(), 0.0);

        orbit.step(1000, &settings).unwrap();
        assert_eq!(settings.orbit_speed_multiplier(), SpeedControl::MAX_MULTIPLIER);
    }

    #[test]
    fn rotation_control_reads_its_own_setting() {
        let settings = SolarSettings::with_multipliers(2.0, 0.5).unwrap();
        let rotation = SpeedControl::new(MotionKind::Spin, &settings);
        assert_eq!(rotation.progress, 5);
    }
}
