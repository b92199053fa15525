use glam::{Quat, Vec3};
use std::f32::consts::TAU;
use std::time::Duration;

/// Axis every rotating node turns around
pub const ROTATION_AXIS: Vec3 = Vec3::Y;

/// Keyframe angles in degrees, one full turn split into three legs
pub const KEYFRAME_DEGREES: [f32; 4] = [0.0, 120.0, 240.0, 360.0];

/// Orientation keyframes around [`ROTATION_AXIS`]
pub fn keyframes() -> [Quat; 4] {
    KEYFRAME_DEGREES.map(|degrees| Quat::from_axis_angle(ROTATION_AXIS, degrees.to_radians()))
}

/// Orientation of a looping rotation at `phase` (fraction of one loop).
///
/// Phases outside [0, 1) wrap. Interpolation is spherical between the
/// neighbouring keyframes with a linear time mapping.
pub fn orientation_at(phase: f32) -> Quat {
    let frames = keyframes();
    let phase = phase.rem_euclid(1.0);
    let legs = (frames.len() - 1) as f32;
    let position = phase * legs;
    let index = (position.floor() as usize).min(frames.len() - 2);
    let t = position - index as f32;
    frames[index].slerp(frames[index + 1], t)
}

/// Angle in radians that `orientation_at(phase)` turns through
pub fn angle_at(phase: f32) -> f32 {
    phase.rem_euclid(1.0) * TAU
}

const MIN_LOOP_DURATION: Duration = Duration::from_nanos(1);

/// Length of one loop for a node turning `degrees_per_second` at `multiplier`.
///
/// `None` when the speed is zero or the inputs are not usable, in which case
/// the caller pauses instead of deriving a duration. Otherwise the result is
/// clamped to `[1ns, Duration::MAX]`.
pub fn loop_duration(degrees_per_second: f32, multiplier: f32) -> Option<Duration> {
    let speed = degrees_per_second as f64 * multiplier as f64;
    if !speed.is_finite() || speed <= 0.0 {
        return None;
    }
    let duration = Duration::try_from_secs_f64(360.0 / speed).unwrap_or(Duration::MAX);
    Some(duration.max(MIN_LOOP_DURATION))
}

/// Calculates the light intensity based on the normal vector and light position
pub fn calculate_light_intensity(normal: Vec3, position: Vec3, light_pos: Vec3) -> f32 {
    let light_dir = (light_pos - position).normalize_or_zero();
    normal.dot(light_dir).max(0.1) // Ensure a minimum ambient light
}

/// Normal of a unit sphere seen head-on at disc offset (`dx`, `dy`).
///
/// Offsets are in sphere radii with +y pointing up; `None` outside the disc.
pub fn sphere_normal(dx: f32, dy: f32) -> Option<Vec3> {
    let r2 = dx * dx + dy * dy;
    if r2 > 1.0 {
        return None;
    }
    Some(Vec3::new(dx, dy, (1.0 - r2).sqrt()))
}

/// Picks the ramp character for an intensity in [0, 1]
pub fn apply_lighting(ramp: &[char], intensity: f32) -> char {
    if ramp.is_empty() {
        return ' ';
    }
    let last = ramp.len() - 1;
    let index = (intensity.clamp(0.0, 1.0) * last as f32).round() as usize;
    ramp[index.min(last)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_close(a: Vec3, b: Vec3) {
        assert!((a - b).length() < 1e-4, "{a:?} != {b:?}");
    }

    #[test]
    fn phase_zero_is_identity() {
        let q = orientation_at(0.0);
        assert_vec_close(q * Vec3::X, Vec3::X);
    }

    #[test]
    fn keyframes_are_hit_exactly() {
        let frames = keyframes();
        for (i, phase) in [0.0_f32, 1.0 / 3.0, 2.0 / 3.0].iter().enumerate() {
            let q = orientation_at(*phase);
            assert_vec_close(q * Vec3::X, frames[i] * Vec3::X);
        }
    }

    #[test]
    fn half_phase_is_half_turn() {
        let q = orientation_at(0.5);
        assert_vec_close(q * Vec3::X, -Vec3::X);
    }

    #[test]
    fn orientation_tracks_linear_angle() {
        for step in 0..40 {
            let phase = step as f32 / 40.0;
            let expected = Quat::from_axis_angle(ROTATION_AXIS, angle_at(phase));
            assert_vec_close(orientation_at(phase) * Vec3::Z, expected * Vec3::Z);
        }
    }

    #[test]
    fn phase_wraps() {
        assert_vec_close(orientation_at(1.25) * Vec3::X, orientation_at(0.25) * Vec3::X);
        assert_vec_close(orientation_at(-0.75) * Vec3::X, orientation_at(0.25) * Vec3::X);
    }

    #[test]
    fn duration_scales_inversely_with_speed() {
        assert_eq!(loop_duration(90.0, 1.0).unwrap().as_millis(), 4000);
        assert_eq!(loop_duration(90.0, 2.0).unwrap().as_millis(), 2000);
        assert_eq!(loop_duration(29.0, 1.0).unwrap().as_millis(), 12413);
    }

    #[test]
    fn zero_or_negative_speed_has_no_duration() {
        assert_eq!(loop_duration(90.0, 0.0), None);
        assert_eq!(loop_duration(90.0, -1.0), None);
        assert_eq!(loop_duration(0.0, 1.0), None);
        assert_eq!(loop_duration(90.0, f32::NAN), None);
    }

    #[test]
    fn lighting_has_ambient_floor() {
        let facing_away = calculate_light_intensity(Vec3::Z, Vec3::ZERO, Vec3::new(0.0, 0.0, -5.0));
        assert_eq!(facing_away, 0.1);
        let facing = calculate_light_intensity(Vec3::Z, Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0));
        assert!((facing - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ramp_selection() {
        let ramp = ['.', ':', '#'];
        assert_eq!(apply_lighting(&ramp, 0.0), '.');
        assert_eq!(apply_lighting(&ramp, 0.5), ':');
        assert_eq!(apply_lighting(&ramp, 2.0), '#');
        assert_eq!(apply_lighting(&[], 0.5), ' ');
    }

    #[test]
    fn sphere_normal_outside_disc() {
        assert!(sphere_normal(1.0, 1.0).is_none());
        assert_vec_close(sphere_normal(0.0, 0.0).unwrap(), Vec3::Z);
    }

    #[test]
    fn extreme_speeds_clamp_to_representable_durations() {
        assert_eq!(loop_duration(90.0, 1e-20), Some(Duration::MAX));
        assert_eq!(loop_duration(f32::MIN_POSITIVE, f32::MIN_POSITIVE), Some(Duration::MAX));
        assert_eq!(loop_duration(1e12, 10.0), Some(Duration::from_nanos(1)));
        assert_eq!(loop_duration(f32::MAX, 10.0), Some(Duration::from_nanos(1)));
    }
}
