use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::constants::{agent, arena, nav, sim, spatial, threat};
use crate::game::state::WeaponKind;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} cell size must be positive and finite, got {value}")]
    InvalidCellSize { name: &'static str, value: f32 },

    #[error("{name} radius must be positive and finite, got {value}")]
    InvalidRadius { name: &'static str, value: f32 },

    #[error("world size must be positive and finite, got {width}x{height}")]
    InvalidWorldSize { width: f32, height: f32 },

    #[error("unknown difficulty '{0}' (expected lenient, normal, hard or maximum)")]
    UnknownDifficulty(String),

    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Difficulty tier, set separately for aim and dodging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Lenient,
    #[default]
    Normal,
    Hard,
    Maximum,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [
        Difficulty::Lenient,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::Maximum,
    ];

    /// Fraction of the maximum aim jitter applied at this tier
    pub fn aim_jitter_scale(self) -> f32 {
        match self {
            Difficulty::Lenient => 1.0,
            Difficulty::Normal => 0.6,
            Difficulty::Hard => 0.3,
            Difficulty::Maximum => 0.0,
        }
    }

    /// Chance of reacting to a detected threat on a given tick
    pub fn dodge_chance(self) -> f64 {
        match self {
            Difficulty::Lenient => 0.2,
            Difficulty::Normal => 0.45,
            Difficulty::Hard => 0.7,
            Difficulty::Maximum => 0.95,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Lenient => "lenient",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
            Difficulty::Maximum => "maximum",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Difficulty::Lenient),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            "maximum" => Ok(Difficulty::Maximum),
            _ => Err(ConfigError::UnknownDifficulty(s.to_string())),
        }
    }
}

/// AI core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub world_width: f32,
    pub world_height: f32,
    /// Broadphase cell size
    pub spatial_cell_size: f32,
    /// Navigation grid cell size (independent of the broadphase)
    pub nav_cell_size: f32,
    pub threat_detection_radius: f32,
    /// An agent with no ally this close is isolated
    pub regroup_radius: f32,
    pub pickup_detection_radius: f32,
    /// Simulation ticks per second
    pub tick_rate: u32,
    pub aim_difficulty: Difficulty,
    pub dodge_difficulty: Difficulty,
    /// Base fire interval per weapon (seconds)
    pub fire_intervals: HashMap<WeaponKind, f32>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            world_width: arena::WORLD_WIDTH,
            world_height: arena::WORLD_HEIGHT,
            spatial_cell_size: spatial::CELL_SIZE,
            nav_cell_size: nav::CELL_SIZE,
            threat_detection_radius: threat::DETECTION_RADIUS,
            regroup_radius: agent::REGROUP_RADIUS,
            pickup_detection_radius: agent::PICKUP_RADIUS,
            tick_rate: sim::TICK_RATE,
            aim_difficulty: Difficulty::Normal,
            dodge_difficulty: Difficulty::Normal,
            fire_intervals: WeaponKind::ALL
                .iter()
                .map(|&w| (w, w.stats().fire_interval))
                .collect(),
        }
    }
}

impl AiConfig {
    /// Load config from the settings file (if any) and environment, or use defaults
    pub fn load_or_default() -> Self {
        let mut config = match std::env::var("AI_SETTINGS_PATH") {
            Ok(path) => match Self::from_json_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Ignoring settings file '{}': {}", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };

        if let Ok(value) = std::env::var("AI_AIM_DIFFICULTY") {
            match value.parse() {
                Ok(parsed) => config.aim_difficulty = parsed,
                Err(e) => tracing::warn!("{}, using {}", e, config.aim_difficulty),
            }
        }

        if let Ok(value) = std::env::var("AI_DODGE_DIFFICULTY") {
            match value.parse() {
                Ok(parsed) => config.dodge_difficulty = parsed,
                Err(e) => tracing::warn!("{}, using {}", e, config.dodge_difficulty),
            }
        }

        override_positive("SPATIAL_CELL_SIZE", &mut config.spatial_cell_size);
        override_positive("NAV_CELL_SIZE", &mut config.nav_cell_size);
        override_positive("WORLD_WIDTH", &mut config.world_width);
        override_positive("WORLD_HEIGHT", &mut config.world_height);
        override_positive("THREAT_DETECTION_RADIUS", &mut config.threat_detection_radius);
        override_positive("REGROUP_RADIUS", &mut config.regroup_radius);
        override_positive("PICKUP_DETECTION_RADIUS", &mut config.pickup_detection_radius);

        if let Ok(rate) = std::env::var("TICK_RATE") {
            match rate.parse::<u32>() {
                Ok(parsed) if (1..=240).contains(&parsed) => config.tick_rate = parsed,
                Ok(_) => tracing::warn!("TICK_RATE must be 1-240, using default"),
                Err(_) => tracing::warn!("Invalid TICK_RATE '{}', using default", rate),
            }
        }

        config
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(is_positive(self.world_width) && is_positive(self.world_height)) {
            return Err(ConfigError::InvalidWorldSize {
                width: self.world_width,
                height: self.world_height,
            });
        }
        for (name, value) in [("spatial", self.spatial_cell_size), ("navigation", self.nav_cell_size)] {
            if !is_positive(value) {
                return Err(ConfigError::InvalidCellSize { name, value });
            }
        }
        for (name, value) in [
            ("threat detection", self.threat_detection_radius),
            ("regroup", self.regroup_radius),
            ("pickup detection", self.pickup_detection_radius),
        ] {
            if !is_positive(value) {
                return Err(ConfigError::InvalidRadius { name, value });
            }
        }
        Ok(())
    }

    /// Seconds per tick
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Base fire interval for a weapon, falling back to the weapon table
    pub fn fire_interval(&self, weapon: WeaponKind) -> f32 {
        self.fire_intervals
            .get(&weapon)
            .copied()
            .unwrap_or(weapon.stats().fire_interval)
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn override_positive(var: &str, field: &mut f32) {
    if let Ok(raw) = std::env::var(var) {
        match raw.parse::<f32>() {
            Ok(parsed) if is_positive(parsed) => *field = parsed,
            Ok(_) => tracing::warn!("{} must be > 0, using default", var),
            Err(_) => tracing::warn!("Invalid {} '{}', using default", var, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AiConfig::default();
        assert_eq!(config.world_width, 3200.0);
        assert_eq!(config.world_height, 1800.0);
        assert_eq!(config.spatial_cell_size, 100.0);
        assert_eq!(config.nav_cell_size, 40.0);
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.aim_difficulty, Difficulty::Normal);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = AiConfig::load_or_default();
        assert!(config.tick_rate > 0);
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert_eq!(" Maximum ".parse::<Difficulty>().unwrap(), Difficulty::Maximum);
        assert!(matches!(
            "impossible".parse::<Difficulty>(),
            Err(ConfigError::UnknownDifficulty(_))
        ));
    }

    #[test]
    fn test_difficulty_tiers_are_monotonic() {
        for pair in Difficulty::ALL.windows(2) {
            assert!(pair[0].aim_jitter_scale() > pair[1].aim_jitter_scale());
            assert!(pair[0].dodge_chance() < pair[1].dodge_chance());
        }
        assert_eq!(Difficulty::Maximum.aim_jitter_scale(), 0.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AiConfig::from_json_str(
            r#"{ "aim_difficulty": "lenient", "nav_cell_size": 50.0, "fire_intervals": { "rifle": 0.5 } }"#,
        )
        .unwrap();
        assert_eq!(config.aim_difficulty, Difficulty::Lenient);
        assert_eq!(config.dodge_difficulty, Difficulty::Normal);
        assert_eq!(config.nav_cell_size, 50.0);
        assert_eq!(config.fire_interval(WeaponKind::Rifle), 0.5);
        // Missing weapons fall back to the table
        assert_eq!(config.fire_interval(WeaponKind::Pistol), 0.4);
    }

    #[test]
    fn test_invalid_json_values_rejected() {
        assert!(matches!(
            AiConfig::from_json_str(r#"{ "spatial_cell_size": 0.0 }"#),
            Err(ConfigError::InvalidCellSize { .. })
        ));
        assert!(matches!(
            AiConfig::from_json_str(r#"{ "regroup_radius": -5.0 }"#),
            Err(ConfigError::InvalidRadius { .. })
        ));
        assert!(matches!(
            AiConfig::from_json_str(r#"{ "world_width": 0.0 }"#),
            Err(ConfigError::InvalidWorldSize { .. })
        ));
        assert!(matches!(
            AiConfig::from_json_str(r#"{ "aim_difficulty": "brutal" }"#),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            AiConfig::from_json_file("/nonexistent/ai-settings.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = AiConfig {
            dodge_difficulty: Difficulty::Hard,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed = AiConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed.dodge_difficulty, Difficulty::Hard);
        assert_eq!(parsed.fire_intervals.len(), WeaponKind::ALL.len());
    }
}
