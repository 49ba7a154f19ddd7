use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    path::{ControlPoint, PathCurve},
    schedule::FiringPolicy,
    FlythroughError, Result,
};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub path: PathConfig,
    pub timeline: TimelineConfig,
    pub motion: MotionConfig,
    pub render: RenderConfig,
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.timeline.validate()?;
        self.motion.validate()?;
        self.render.validate(&self.motion)
    }

    pub fn build_curve(&self) -> Result<PathCurve> {
        PathCurve::new(&self.path.control_points)
    }
}

/// Closed list of ground-plane control points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub control_points: Vec<ControlPoint>,
}

impl Default for PathConfig {
    fn default() -> Self {
        let control_points = [
            [68.5, 185.5],
            [1.0, 262.5],
            [270.9, 281.9],
            [345.5, 212.8],
            [178.0, 155.7],
            [240.3, 72.3],
            [153.4, 0.6],
            [52.6, 53.3],
            [68.5, 185.5],
        ]
        .into_iter()
        .map(ControlPoint::from)
        .collect();

        Self { control_points }
    }
}

/// Clock polling and event firing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub poll_interval_ms: u64,
    pub fallback_duration: f64,
    pub firing_policy: FiringPolicy,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            fallback_duration: crate::timeline::DEFAULT_DURATION,
            firing_policy: FiringPolicy::default(),
        }
    }
}

impl TimelineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(FlythroughError::config("poll interval must be positive"));
        }
        if !self.fallback_duration.is_finite() || self.fallback_duration <= 0.0 {
            return Err(FlythroughError::config(format!(
                "fallback duration must be positive, got {}",
                self.fallback_duration
            )));
        }
        Ok(())
    }
}

/// Offsets and light behaviour of the motion driver. All offsets are fractions
/// of the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub look_ahead: f64,
    pub key_light_offset: f64,
    pub fill_light_offset: f64,
    pub end_of_motion: f64,
    pub fade_start: f64,
    pub flicker_max: f32,
    pub decay_per_frame: f32,
    pub fill_gain: f64,
    /// Seed for the flicker; random when absent.
    pub seed: Option<u64>,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            look_ahead: 0.03,
            key_light_offset: 0.03,
            fill_light_offset: 0.01,
            end_of_motion: 0.97,
            fade_start: 0.96,
            flicker_max: 150.0,
            decay_per_frame: 2.0,
            fill_gain: 100.0,
            seed: None,
        }
    }
}

impl MotionConfig {
    fn validate(&self) -> Result<()> {
        let offsets = [
            ("look_ahead", self.look_ahead),
            ("key_light_offset", self.key_light_offset),
            ("fill_light_offset", self.fill_light_offset),
            ("fade_start", self.fade_start),
            ("fill_gain", self.fill_gain),
        ];
        if let Some((name, value)) = offsets.iter().find(|(_, value)| !value.is_finite()) {
            return Err(FlythroughError::config(format!("{name} must be finite, got {value}")));
        }
        if !(self.end_of_motion > 0.0 && self.end_of_motion.is_finite()) {
            return Err(FlythroughError::config(format!(
                "end_of_motion must be positive, got {}",
                self.end_of_motion
            )));
        }
        if !(self.flicker_max >= 0.0 && self.decay_per_frame >= 0.0) {
            return Err(FlythroughError::config(
                "flicker_max and decay_per_frame must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Redraw cadence and the render loop's stop point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub refresh_hz: f64,
    pub stop_threshold: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            refresh_hz: 60.0,
            stop_threshold: 0.99,
        }
    }
}

impl RenderConfig {
    /// Time between redraws. Fails for rates whose period does not fit a
    /// non-zero [`Duration`].
    pub fn frame_interval(&self) -> Result<Duration> {
        match Duration::try_from_secs_f64(1.0 / self.refresh_hz) {
            Ok(interval) if !interval.is_zero() => Ok(interval),
            _ => Err(FlythroughError::config(format!(
                "refresh rate {} Hz has no usable frame interval",
                self.refresh_hz
            ))),
        }
    }

    fn validate(&self, motion: &MotionConfig) -> Result<()> {
        if !(self.refresh_hz.is_finite() && self.refresh_hz > 0.0) {
            return Err(FlythroughError::config(format!(
                "refresh rate must be positive, got {}",
                self.refresh_hz
            )));
        }
        self.frame_interval()?;
        if !(self.stop_threshold > motion.end_of_motion) {
            return Err(FlythroughError::config(format!(
                "stop threshold {} must lie beyond end_of_motion {}",
                self.stop_threshold, motion.end_of_motion
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate_and_build_the_demo_path() {
        let config = AppConfig::default();
        config.validate().unwrap();

        let curve = config.build_curve().unwrap();
        assert_eq!(curve.knots().len(), 8);
        assert_eq!(config.timeline.poll_interval(), Duration::from_millis(10));
        assert!(config.render.frame_interval().unwrap() < Duration::from_millis(17));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = AppConfig::from_json_str(
            r#"{
                "timeline": { "poll_interval_ms": 5, "firing_policy": "rounded_equality" },
                "motion": { "seed": 42 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.timeline.poll_interval_ms, 5);
        assert_eq!(config.timeline.firing_policy, FiringPolicy::RoundedEquality);
        assert_eq!(config.timeline.fallback_duration, 100.0);
        assert_eq!(config.motion.seed, Some(42));
        assert_eq!(config.motion.end_of_motion, 0.97);
        assert_eq!(config.path.control_points.len(), 9);
    }

    #[test]
    fn rejects_inconsistent_thresholds() {
        let err =
            AppConfig::from_json_str(r#"{ "render": { "stop_threshold": 0.9 } }"#).unwrap_err();
        assert!(format!("{err}").contains("stop threshold"));

        let err =
            AppConfig::from_json_str(r#"{ "timeline": { "poll_interval_ms": 0 } }"#).unwrap_err();
        assert!(matches!(err, FlythroughError::InvalidConfig(_)));

        let err = AppConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, FlythroughError::Json(_)));
    }

    #[test]
    fn rejects_refresh_rates_without_a_frame_interval() {
        for json in [
            r#"{ "render": { "refresh_hz": 1e-300 } }"#,
            r#"{ "render": { "refresh_hz": 1e300 } }"#,
            r#"{ "render": { "refresh_hz": 0 } }"#,
        ] {
            let err = AppConfig::from_json_str(json).unwrap_err();
            assert!(matches!(err, FlythroughError::InvalidConfig(_)), "{json}");
        }

        let render = RenderConfig {
            refresh_hz: 1e-300,
            ..RenderConfig::default()
        };
        assert!(render.frame_interval().is_err());

        let slow = AppConfig::from_json_str(r#"{ "render": { "refresh_hz": 0.5 } }"#).unwrap();
        assert_eq!(slow.render.frame_interval().unwrap(), Duration::from_secs(2));
    }

    #[test]
    fn degenerate_paths_are_rejected_at_build_time() {
        let config = AppConfig::from_json_str(
            r#"{ "path": { "control_points": [[0, 0], [1, 1], [0, 0]] } }"#,
        )
        .unwrap();
        assert!(matches!(
            config.build_curve().unwrap_err(),
            FlythroughError::DegenerateCurve { .. }
        ));
    }
}
