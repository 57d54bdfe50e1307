//! Configuration loading
//!
//! Handles:
//! - YAML file located through `VELOV_BEAT_CONFIG` (default `velov-beat.yaml`)
//! - API key override from `VELOV_API_KEY`
//! - Human readable durations (`period: 1m`)
//! - Validation before the collector starts

use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

pub const CONFIG_PATH_ENV: &str = "VELOV_BEAT_CONFIG";
pub const API_KEY_ENV: &str = "VELOV_API_KEY";
pub const DEFAULT_CONFIG_PATH: &str = "velov-beat.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatConfig {
    /// Delay between two collection ticks.
    #[serde(with = "humantime_serde")]
    pub period: Duration,
    pub api: ApiConfig,
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub path: String,
    /// Sent as the `apiKey` query parameter.
    pub key: Option<String>,
    /// Optional `contract` filter (e.g. `lyon`).
    pub contract: Option<String>,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Where events go. `type` is optional in YAML and defaults to `mqtt`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Mqtt(MqttConfig),
    Console,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SinkKind {
    #[default]
    Mqtt,
    Console,
}

#[derive(Deserialize)]
struct RawSinkConfig {
    #[serde(rename = "type", default)]
    kind: SinkKind,
    #[serde(flatten)]
    mqtt: MqttConfig,
}

impl<'de> Deserialize<'de> for SinkConfig {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawSinkConfig::deserialize(deserializer)?;
        Ok(match raw.kind {
            SinkKind::Mqtt => Self::Mqtt(raw.mqtt),
            SinkKind::Console => Self::Console,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub client_id: Option<String>,
    pub topic: String,
    pub qos: MqttQos,
    #[serde(with = "humantime_serde")]
    pub keep_alive: Duration,
    /// Outbound request queue size; events are rejected once it is full.
    pub capacity: usize,
    #[serde(with = "humantime_serde")]
    pub reconnect_delay: Duration,
    /// Consecutive connection errors before the sink is declared lost.
    pub max_reconnect_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MqttQos {
    AtMostOnce,
    AtLeastOnce,
    ExactlyOnce,
}

impl From<MqttQos> for rumqttc::QoS {
    fn from(qos: MqttQos) -> Self {
        match qos {
            MqttQos::AtMostOnce => rumqttc::QoS::AtMostOnce,
            MqttQos::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            MqttQos::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(60),
            api: ApiConfig::default(),
            sink: SinkConfig::Mqtt(MqttConfig::default()),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.jcdecaux.com/".to_string(),
            path: "vls/v3/stations".to_string(),
            key: None,
            contract: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::Mqtt(MqttConfig::default())
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: None,
            topic: "velov/stations@v1".to_string(),
            qos: MqttQos::AtLeastOnce,
            keep_alive: Duration::from_secs(30),
            capacity: 64,
            reconnect_delay: Duration::from_secs(2),
            max_reconnect_attempts: 10,
        }
    }
}

impl BeatConfig {
    /// Load from the environment-selected file, apply env overrides and validate.
    pub async fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = Self::load_from(&path).await?;

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.api.key = Some(key);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Read a YAML file. A missing or blank file yields the defaults.
    pub async fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let txt = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        if txt.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&txt).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period.is_zero() {
            return Err(ConfigError::ZeroPeriod);
        }

        match self.api.key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err(ConfigError::MissingApiKey),
        }
        self.api.endpoint()?;

        if let SinkConfig::Mqtt(mqtt) = &self.sink {
            if mqtt.host.trim().is_empty() {
                return Err(ConfigError::InvalidSink("mqtt host is empty".into()));
            }
            if mqtt.port == 0 {
                return Err(ConfigError::InvalidSink("mqtt port must be greater than zero".into()));
            }
            if mqtt.capacity == 0 {
                return Err(ConfigError::InvalidSink("mqtt capacity must be greater than zero".into()));
            }
        }

        Ok(())
    }
}

impl ApiConfig {
    /// Base URL joined with the resource path, without query parameters.
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            url: format!("{}{}", self.base_url, self.path),
            reason,
        };

        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        let base = Url::parse(&base).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid("not a base URL".into()));
        }
        base.join(self.path.trim_start_matches('/')).map_err(|e| invalid(e.to_string()))
    }
}
