// Controller tuning loaded from TOML.
// Every field has a default, so a partial file (or none at all) is valid.

use std::f32::consts::FRAC_PI_2;
use std::path::Path;

use glam::Vec3;
use serde::Deserialize;
use thiserror::Error;

use super::locomotion::Smoothing;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub camera: CameraConfig,
    pub locomotion: LocomotionConfig,
    pub mining: MiningConfig,
    pub proximity: ProximityConfig,
    pub animation: AnimationConfig,
    /// Minable rocks spawned into the scene. Empty list = use the built-in layout.
    pub resources: Vec<ResourceSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Starting camera offset from the character. Its length is the orbit radius.
    pub initial_offset: Vec3,
    /// Radians per unit of pointer movement
    pub sensitivity: f32,
    /// Closest the orbit may get to straight up/down, in radians
    pub pole_margin: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            initial_offset: Vec3::new(0.0, 16.0, -8.0),
            sensitivity: 0.01,
            pole_margin: 0.1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    pub speed: f32,
    pub eye_height: f32,
    pub smoothing: Smoothing,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            eye_height: 1.5,
            smoothing: Smoothing::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Max distance to a rock for the interact key to start mining
    pub interaction_radius: f32,
    /// Seconds between the start of a session and the ore being extracted
    pub stage_delay: f32,
    /// Seconds the success pose is held after a rock is emptied
    pub success_display: f32,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            interaction_radius: 2.0,
            stage_delay: 2.0,
            success_display: 2.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    pub collision_radius: f32,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self { collision_radius: 1.5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Cross-fade duration in seconds
    pub fade: f32,
    pub idle_clip: String,
    pub walk_clip: String,
    pub mining_clip: String,
    pub success_clip: String,
    /// Clips the character model provides
    pub clips: Vec<ClipSpec>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fade: 0.2,
            idle_clip: "Idle".into(),
            walk_clip: "Walking".into(),
            mining_clip: "Standing".into(),
            success_clip: "ThumbsUp".into(),
            clips: vec![
                ClipSpec::new("Idle", 4.0),
                ClipSpec::new("Walking", 1.0),
                ClipSpec::new("Standing", 2.0),
                ClipSpec::new("ThumbsUp", 2.0),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClipSpec {
    pub name: String,
    pub duration: f32,
}

impl ClipSpec {
    pub fn new(name: &str, duration: f32) -> Self {
        Self { name: name.into(), duration }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSpec {
    pub position: Vec3,
    pub ore: u32,
}

impl ControllerConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Comparisons are written so that NaN fails them.
        let invalid = |msg: &str| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg.into())) };

        let c = &self.camera;
        if !c.initial_offset.is_finite() || !(c.initial_offset.length_squared() > f32::EPSILON) {
            return invalid("camera.initial_offset must be finite and non-zero");
        }
        if !(c.sensitivity > 0.0 && c.sensitivity.is_finite()) {
            return invalid("camera.sensitivity must be positive");
        }
        if !(c.pole_margin > 0.0 && c.pole_margin < FRAC_PI_2) {
            return invalid("camera.pole_margin must be within (0, PI/2)");
        }
        let elevation = (c.initial_offset.y / c.initial_offset.length()).clamp(-1.0, 1.0).asin();
        if !(elevation.abs() < FRAC_PI_2 - c.pole_margin) {
            return invalid("camera.initial_offset is steeper than the pole margin allows");
        }

        if !(self.locomotion.speed >= 0.0 && self.locomotion.speed.is_finite()) {
            return invalid("locomotion.speed must be a non-negative number");
        }
        match self.locomotion.smoothing {
            Smoothing::Fixed { factor } if !(0.0..=1.0).contains(&factor) => {
                return invalid("smoothing factor must be within [0, 1]");
            }
            Smoothing::TimeScaled { rate } if !(rate >= 0.0 && rate.is_finite()) => {
                return invalid("smoothing rate must be a non-negative number");
            }
            _ => {}
        }

        let m = &self.mining;
        if !(m.interaction_radius > 0.0 && m.interaction_radius.is_finite()) {
            return invalid("mining.interaction_radius must be positive");
        }
        if !(m.stage_delay >= 0.0 && m.stage_delay.is_finite())
            || !(m.success_display >= 0.0 && m.success_display.is_finite())
        {
            return invalid("mining delays must be non-negative numbers");
        }
        if !(self.proximity.collision_radius > 0.0 && self.proximity.collision_radius.is_finite()) {
            return invalid("proximity.collision_radius must be positive");
        }
        if !(self.animation.fade >= 0.0 && self.animation.fade.is_finite()) {
            return invalid("animation.fade must be a non-negative number");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = ControllerConfig::from_toml("").unwrap();
        assert_eq!(config.camera.initial_offset, Vec3::new(0.0, 16.0, -8.0));
        assert_eq!(config.mining.interaction_radius, 2.0);
        assert_eq!(config.proximity.collision_radius, 1.5);
        assert_eq!(config.animation.fade, 0.2);
        assert_eq!(config.locomotion.smoothing, Smoothing::default());
        assert!(config.resources.is_empty());
    }

    #[test]
    fn parses_sections_and_resources() {
        let text = r#"
            [locomotion]
            speed = 3.0
            smoothing = { mode = "fixed", factor = 0.1 }

            [animation]
            walk_clip = "Run"

            [[resources]]
            position = [1.0, 0.0, 2.0]
            ore = 4
        "#;
        let config = ControllerConfig::from_toml(text).unwrap();
        assert_eq!(config.locomotion.speed, 3.0);
        assert_eq!(config.locomotion.eye_height, 1.5);
        assert_eq!(config.locomotion.smoothing, Smoothing::Fixed { factor: 0.1 });
        assert_eq!(config.animation.walk_clip, "Run");
        assert_eq!(config.animation.idle_clip, "Idle");
        assert_eq!(config.resources.len(), 1);
        assert_eq!(config.resources[0].position, Vec3::new(1.0, 0.0, 2.0));
        assert_eq!(config.resources[0].ore, 4);
    }

    #[test]
    fn time_scaled_smoothing() {
        let text = "[locomotion]\nsmoothing = { mode = \"time_scaled\", rate = 8.0 }\n";
        let config = ControllerConfig::from_toml(text).unwrap();
        assert_eq!(config.locomotion.smoothing, Smoothing::TimeScaled { rate: 8.0 });
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            ControllerConfig::from_toml("[camera]\npole_margin = 2.0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ControllerConfig::from_toml("[mining]\ninteraction_radius = 0.0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ControllerConfig::from_toml("[camera]\ninitial_offset = [0.0, 0.0, 0.0]\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ControllerConfig::from_toml("[locomotion]\nspeed = \"fast\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_offsets_past_the_pole_limit() {
        for offset in ["[0.0, 10.0, 0.0]", "[0.0, 10.0, 0.1]", "[0.0, -10.0, 0.1]"] {
            let text = format!("[camera]\ninitial_offset = {offset}\n");
            assert!(
                matches!(ControllerConfig::from_toml(&text), Err(ConfigError::Invalid(_))),
                "{offset} accepted"
            );
        }
        // Just inside the limit is fine
        let limit = FRAC_PI_2 - 0.1 - 0.01;
        let text = format!("[camera]\ninitial_offset = [0.0, {}, {}]\n", limit.sin(), limit.cos());
        assert!(ControllerConfig::from_toml(&text).is_ok());
    }

    #[test]
    fn rejects_nan_values() {
        for text in [
            "[camera]\nsensitivity = nan\n",
            "[camera]\ninitial_offset = [nan, 1.0, 1.0]\n",
            "[locomotion]\nspeed = nan\n",
            "[locomotion]\nsmoothing = { mode = \"time_scaled\", rate = nan }\n",
            "[mining]\nstage_delay = nan\n",
            "[proximity]\ncollision_radius = nan\n",
            "[animation]\nfade = nan\n",
        ] {
            assert!(
                matches!(ControllerConfig::from_toml(text), Err(ConfigError::Invalid(_))),
                "{text:?} accepted"
            );
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ControllerConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
