use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::health::HealthSettings;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PhotocapConfig {
    pub health: HealthConfig,
    pub vision: VisionConfig,
    pub conditions: ConditionsConfig,
    pub caption: CaptionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HealthConfig {
    /// Score subtracted per critical vision failure
    #[serde(default = "default_degrade_step")]
    pub degrade_step: f32,

    /// Score restored per successful vision round trip
    #[serde(default = "default_recover_step")]
    pub recover_step: f32,

    /// At or below this score the backend is considered down
    #[serde(default = "default_score_floor")]
    pub score_floor: f32,

    /// Base cooldown in seconds after the first critical failure
    #[serde(default = "default_base_cooldown_seconds")]
    pub base_cooldown_seconds: u64,

    /// Cap on cooldown doublings
    #[serde(default = "default_max_doublings")]
    pub max_doublings: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct VisionConfig {
    /// Confidence floor for the comprehensive strategy
    #[serde(default = "default_selective_confidence")]
    pub selective_confidence: f32,

    /// Confidence floor for the detailed multi-signal strategy
    #[serde(default = "default_permissive_confidence")]
    pub permissive_confidence: f32,

    /// Longest image edge submitted to the backend, in pixels
    #[serde(default = "default_max_edge")]
    pub max_edge: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConditionsConfig {
    /// Physical memory floor in bytes below which vision is bypassed
    #[serde(default = "default_min_memory_bytes")]
    pub min_memory_bytes: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CaptionConfig {
    /// Default caption style when the caller does not specify one
    /// ("creative" or "factual")
    #[serde(default = "default_style")]
    pub default_style: String,
}

fn default_degrade_step() -> f32 {
    0.3
}

fn default_recover_step() -> f32 {
    0.2
}

fn default_score_floor() -> f32 {
    0.3
}

fn default_base_cooldown_seconds() -> u64 {
    30
}

fn default_max_doublings() -> u32 {
    5
}

fn default_selective_confidence() -> f32 {
    0.6
}

fn default_permissive_confidence() -> f32 {
    0.1
}

fn default_max_edge() -> u32 {
    1024
}

fn default_min_memory_bytes() -> u64 {
    1_000_000_000
}

fn default_style() -> String {
    "creative".to_string()
}

impl PhotocapConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("photocap.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("health.degrade_step", default_degrade_step() as f64)?
            .set_default("health.recover_step", default_recover_step() as f64)?
            .set_default("health.score_floor", default_score_floor() as f64)?
            .set_default(
                "health.base_cooldown_seconds",
                default_base_cooldown_seconds(),
            )?
            .set_default("health.max_doublings", default_max_doublings())?
            .set_default(
                "vision.selective_confidence",
                default_selective_confidence() as f64,
            )?
            .set_default(
                "vision.permissive_confidence",
                default_permissive_confidence() as f64,
            )?
            .set_default("vision.max_edge", default_max_edge())?
            .set_default("conditions.min_memory_bytes", default_min_memory_bytes())?
            .set_default("caption.default_style", default_style())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Add environment variables with PHOTOCAP_ prefix
            .add_source(Environment::with_prefix("PHOTOCAP").separator("_"))
            .build()?;

        let config: PhotocapConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.health.degrade_step) {
            return Err(ConfigError::Message(
                "health.degrade_step must be within [0, 1]".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.health.recover_step) {
            return Err(ConfigError::Message(
                "health.recover_step must be within [0, 1]".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.health.score_floor) {
            return Err(ConfigError::Message(
                "health.score_floor must be within [0, 1]".to_string(),
            ));
        }

        if self.health.base_cooldown_seconds == 0 {
            return Err(ConfigError::Message(
                "health.base_cooldown_seconds must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.vision.selective_confidence)
            || !(0.0..=1.0).contains(&self.vision.permissive_confidence)
        {
            return Err(ConfigError::Message(
                "vision confidence thresholds must be within [0, 1]".to_string(),
            ));
        }

        if self.vision.permissive_confidence > self.vision.selective_confidence {
            return Err(ConfigError::Message(
                "vision.permissive_confidence must not exceed selective_confidence".to_string(),
            ));
        }

        if self.vision.max_edge == 0 {
            return Err(ConfigError::Message(
                "vision.max_edge must be greater than 0".to_string(),
            ));
        }

        if self.caption.default_style.parse::<crate::caption::CaptionStyle>().is_err() {
            return Err(ConfigError::Message(format!(
                "caption.default_style must be 'creative' or 'factual', got '{}'",
                self.caption.default_style
            )));
        }

        Ok(())
    }

    /// Gatekeeper settings derived from the health section.
    pub fn health_settings(&self) -> HealthSettings {
        HealthSettings {
            degrade_step: self.health.degrade_step,
            recover_step: self.health.recover_step,
            score_floor: self.health.score_floor,
            base_cooldown: Duration::from_secs(self.health.base_cooldown_seconds),
            max_doublings: self.health.max_doublings,
        }
    }
}

impl Default for PhotocapConfig {
    fn default() -> Self {
        Self {
            health: HealthConfig {
                degrade_step: default_degrade_step(),
                recover_step: default_recover_step(),
                score_floor: default_score_floor(),
                base_cooldown_seconds: default_base_cooldown_seconds(),
                max_doublings: default_max_doublings(),
            },
            vision: VisionConfig {
                selective_confidence: default_selective_confidence(),
                permissive_confidence: default_permissive_confidence(),
                max_edge: default_max_edge(),
            },
            conditions: ConditionsConfig {
                min_memory_bytes: default_min_memory_bytes(),
            },
            caption: CaptionConfig {
                default_style: default_style(),
            },
        }
    }
}
