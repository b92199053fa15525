use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::state::validate_multiplier;

/// Place an animated solar system on a virtual surface in your terminal
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "solar3d", version, about)]
pub struct Config {
    /// Frames per second of the update loop
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=240))]
    pub fps: u32,

    /// Starting orbit speed multiplier (0 pauses orbits)
    #[arg(long, default_value_t = 1.0, value_parser = parse_multiplier)]
    pub orbit_speed: f32,

    /// Starting axial rotation speed multiplier (0 pauses spin)
    #[arg(long, default_value_t = 1.0, value_parser = parse_multiplier)]
    pub rotation_speed: f32,

    /// Frames before the surface is detected
    #[arg(long, default_value_t = 45)]
    pub warmup_frames: u32,

    /// Half the side length of the detected surface, in metres
    #[arg(long, default_value_t = 4.0)]
    pub plane_extent: f32,

    /// Simulated asset loading time in milliseconds
    #[arg(long, default_value_t = 400)]
    pub asset_latency_ms: u64,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }

    pub fn asset_latency(&self) -> Duration {
        Duration::from_millis(self.asset_latency_ms)
    }

    /// Where log records go. The terminal is the rendered frame, so without
    /// a log file they are dropped.
    pub fn log_target(&self) -> io::Result<Box<dyn Write + Send>> {
        match &self.log_file {
            Some(path) => Ok(Box::new(File::create(path)?)),
            None => Ok(Box::new(io::sink())),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::parse_from(["solar3d"])
    }
}

fn parse_multiplier(value: &str) -> Result<f32, String> {
    let multiplier: f32 = value.parse().map_err(|e| format!("{e}"))?;
    validate_multiplier(multiplier).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.fps, 30);
        assert_eq!(config.orbit_speed, 1.0);
        assert_eq!(config.rotation_speed, 1.0);
        assert_eq!(config.log_file, None);
        assert_eq!(config.frame_interval(), Duration::from_secs_f64(1.0 / 30.0));
    }

    #[test]
    fn parses_flags() {
        let config = Config::parse_from([
            "solar3d",
            "--fps",
            "60",
            "--orbit-speed",
            "2.5",
            "--rotation-speed",
            "0",
            "--log-file",
            "solar.log",
        ]);
        assert_eq!(config.fps, 60);
        assert_eq!(config.orbit_speed, 2.5);
        assert_eq!(config.rotation_speed, 0.0);
        assert_eq!(config.log_file, Some(PathBuf::from("solar.log")));
    }

    #[test]
    fn rejects_negative_multiplier() {
        let result = Config::try_parse_from(["solar3d", "--orbit-speed=-1"]);
        assert!(result.is_err());
        let result = Config::try_parse_from(["solar3d", "--fps", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn log_target_writes_to_the_log_file() {
        let path = std::env::temp_dir().join(format!("solar3d-{}.log", std::process::id()));
        let config = Config {
            log_file: Some(path.clone()),
            ..Config::default()
        };
        {
            let mut target = config.log_target().unwrap();
            target.write_all(b"surface detected\n").unwrap();
            target.flush().unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "surface detected\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn log_target_without_file_discards() {
        let mut target = Config::default().log_target().unwrap();
        assert_eq!(target.write(b"not on the screen").unwrap(), 17);
    }
}
