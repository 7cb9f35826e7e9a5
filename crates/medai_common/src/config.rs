//! MedAI configuration
//!
//! Endpoint URLs, advisory thresholds and preprocessing defaults.
//! Config file: ~/.config/medai/config.toml or /etc/medai/config.toml,
//! with environment overrides for the endpoint URLs.

use anyhow::{Context, Result};
use medai_shared::{AdvisoryThresholds, Panel, ScreeningError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "MEDAI_CONFIG";
pub const ENDPOINT_KIND_ENV: &str = "MEDAI_ENDPOINT_KIND";
pub const API_KEY_ENV: &str = "MEDAI_API_KEY";

/// Which wire protocol an endpoint speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// Dedicated ML inference service with fixed JSON or multipart schemas
    Inference,
    /// Generic LLM endpoint taking a `contents/parts` body
    Generative,
}

impl Default for EndpointKind {
    fn default() -> Self {
        Self::Inference
    }
}

impl std::str::FromStr for EndpointKind {
    type Err = ScreeningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inference" => Ok(Self::Inference),
            "generative" | "llm" => Ok(Self::Generative),
            other => Err(ScreeningError::Config(format!(
                "invalid endpoint kind '{}'. Valid values: inference, generative",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,

    #[serde(default)]
    pub kind: EndpointKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Endpoint {
    pub fn inference(url: &str) -> Self {
        Self {
            url: url.to_string(),
            kind: EndpointKind::Inference,
            api_key: None,
        }
    }

    pub fn generative(url: &str) -> Self {
        Self {
            url: url.to_string(),
            kind: EndpointKind::Generative,
            api_key: None,
        }
    }

    fn validate(&self, panel: Panel) -> Result<(), ScreeningError> {
        let url = reqwest::Url::parse(&self.url).map_err(|e| {
            ScreeningError::Config(format!("{} endpoint URL '{}': {}", panel, self.url, e))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ScreeningError::Config(format!(
                "{} endpoint must be http(s), got '{}'",
                panel, scheme
            ))),
        }
    }
}

/// Per-panel endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesion: Option<Endpoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diabetes: Option<Endpoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triage: Option<Endpoint>,
}

impl EndpointsConfig {
    pub fn get(&self, panel: Panel) -> Option<&Endpoint> {
        match panel {
            Panel::Lesion => self.lesion.as_ref(),
            Panel::Diabetes => self.diabetes.as_ref(),
            Panel::Triage => self.triage.as_ref(),
        }
    }

    pub fn slot(&mut self, panel: Panel) -> &mut Option<Endpoint> {
        match panel {
            Panel::Lesion => &mut self.lesion,
            Panel::Diabetes => &mut self.diabetes,
            Panel::Triage => &mut self.triage,
        }
    }
}

/// Latency advisory thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    #[serde(default = "default_busy_secs")]
    pub busy_secs: u64,

    #[serde(default = "default_queued_secs")]
    pub queued_secs: u64,

    #[serde(default = "default_cold_start_secs")]
    pub cold_start_secs: u64,

    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
}

fn default_busy_secs() -> u64 {
    10
}

fn default_queued_secs() -> u64 {
    30
}

fn default_cold_start_secs() -> u64 {
    60
}

fn default_tick_millis() -> u64 {
    1000
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            busy_secs: default_busy_secs(),
            queued_secs: default_queued_secs(),
            cold_start_secs: default_cold_start_secs(),
            tick_millis: default_tick_millis(),
        }
    }
}

impl AdvisoryConfig {
    pub fn thresholds(&self) -> AdvisoryThresholds {
        AdvisoryThresholds {
            busy: Duration::from_secs(self.busy_secs),
            queued: Duration::from_secs(self.queued_secs),
            cold_start: Duration::from_secs(self.cold_start_secs),
            tick: Duration::from_millis(self.tick_millis),
        }
    }
}

/// Image downscale settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// JPEG quality, 1-100
    #[serde(default = "default_quality")]
    pub quality: u8,
}

fn default_width() -> u32 {
    100
}

fn default_height() -> u32 {
    75
}

fn default_quality() -> u8 {
    95
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            quality: default_quality(),
        }
    }
}

/// Main MedAI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedaiConfig {
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub advisory: AdvisoryConfig,

    #[serde(default)]
    pub preprocess: PreprocessConfig,
}

fn url_env(panel: Panel) -> &'static str {
    match panel {
        Panel::Lesion => "MEDAI_LESION_URL",
        Panel::Diabetes => "MEDAI_DIABETES_URL",
        Panel::Triage => "MEDAI_TRIAGE_URL",
    }
}

impl MedaiConfig {
    /// User config path: $XDG_CONFIG_HOME/medai/config.toml
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("medai").join("config.toml"))
    }

    /// System config path: /etc/medai/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/medai/config.toml")
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load configuration, apply environment overrides and validate.
    ///
    /// Priority:
    /// 1. Explicit path (--config)
    /// 2. $MEDAI_CONFIG
    /// 3. User config
    /// 4. System config
    /// 5. Defaults (no endpoints)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);

        let mut config = if let Some(path) = explicit.map(Path::to_path_buf).or(env_path) {
            Self::from_file(&path)?
        } else if let Some(user_path) = Self::user_config_path().filter(|p| p.exists()) {
            Self::from_file(&user_path)?
        } else if Self::system_config_path().exists() {
            Self::from_file(&Self::system_config_path())?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`. Env-supplied URLs win
    /// over the file; the kind and API key apply to every env-supplied URL.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ScreeningError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = match lookup(ENDPOINT_KIND_ENV) {
            Some(raw) => Some(raw.parse::<EndpointKind>()?),
            None => None,
        };
        let api_key = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty());

        for panel in Panel::ALL {
            let Some(url) = lookup(url_env(panel)).filter(|u| !u.trim().is_empty()) else {
                continue;
            };
            let slot = self.endpoints.slot(panel);
            let endpoint = slot.get_or_insert_with(|| Endpoint::inference(&url));
            endpoint.url = url.trim().to_string();
            if let Some(kind) = kind {
                endpoint.kind = kind;
            }
            if api_key.is_some() {
                endpoint.api_key = api_key.clone();
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ScreeningError> {
        for panel in Panel::ALL {
            if let Some(endpoint) = self.endpoints.get(panel) {
                endpoint.validate(panel)?;
            }
        }
        if !self.advisory.thresholds().is_valid() {
            return Err(ScreeningError::Config(
                "advisory thresholds must be strictly increasing and tick_millis non-zero"
                    .to_string(),
            ));
        }
        if self.preprocess.width == 0 || self.preprocess.height == 0 {
            return Err(ScreeningError::Config(
                "preprocess width and height must be non-zero".to_string(),
            ));
        }
        if !(1..=100).contains(&self.preprocess.quality) {
            return Err(ScreeningError::Config(format!(
                "preprocess quality must be 1-100, got {}",
                self.preprocess.quality
            )));
        }
        Ok(())
    }

    /// Endpoint for `panel`, or a configuration error naming how to set it
    pub fn require(&self, panel: Panel) -> Result<&Endpoint, ScreeningError> {
        self.endpoints.get(panel).ok_or_else(|| {
            ScreeningError::Config(format!(
                "no endpoint configured for the {} panel (set {} or [endpoints.{}] url)",
                panel,
                url_env(panel),
                panel
            ))
        })
    }
}
