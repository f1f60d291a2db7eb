//! Configuration for the pet monitor.

use crate::core::{BehaviorConfig, ClassifierConfig, MotionConfig};
use crate::detector::DetectorBackendConfig;
use crate::eventlog::LogCooldowns;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "pet-monitor";

/// Main configuration for the monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frame differencing tunables
    pub motion: MotionConfig,

    /// Detector backend and acceptance rules
    pub detector: DetectorConfig,

    /// Behavior scoring thresholds
    pub behavior: BehaviorConfig,

    /// Where frames come from
    pub capture: CaptureConfig,

    /// PIR / RFID board
    pub sensors: SensorConfig,

    /// HTTP dashboard boundary
    pub server: ServerConfig,

    /// Event log read by the dashboard
    pub log_path: PathBuf,

    /// IANA timezone for log timestamps; local time when unset
    pub timezone: Option<String>,

    /// Minimum seconds between log lines of the same kind
    pub log_cooldowns: LogCooldowns,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            motion: MotionConfig::default(),
            detector: DetectorConfig::default(),
            behavior: BehaviorConfig::default(),
            capture: CaptureConfig::default(),
            sensors: SensorConfig::default(),
            server: ServerConfig::default(),
            log_path: data_dir.join("motion_log.txt"),
            timezone: None,
            log_cooldowns: LogCooldowns::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Ensure the event log directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::IoError(e.to_string()))?;
            }
        }
        Ok(())
    }

    /// Parsed log timezone.
    pub fn timezone(&self) -> Result<Option<Tz>, ConfigError> {
        match &self.timezone {
            None => Ok(None),
            Some(name) => name
                .parse::<Tz>()
                .map(Some)
                .map_err(|_| ConfigError::Invalid(format!("unknown timezone '{name}'"))),
        }
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.behavior.window_size == 0 {
            return Err(ConfigError::Invalid(
                "behavior.window_size must be at least 1".to_string(),
            ));
        }
        if !(self.behavior.level_ceiling.is_finite() && self.behavior.level_ceiling > 0.0) {
            return Err(ConfigError::Invalid(
                "behavior.level_ceiling must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detector.min_confidence) {
            return Err(ConfigError::Invalid(
                "detector.min_confidence must be within 0..=1".to_string(),
            ));
        }
        if self.capture.frame_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "capture.frame_interval must be greater than zero".to_string(),
            ));
        }
        self.timezone()?;
        Ok(())
    }
}

/// Detector selection plus the classifier's acceptance rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Labels reported as pets
    pub accepted_labels: Vec<String>,
    /// Minimum confidence for a detection to count
    pub min_confidence: f32,
    pub backend: DetectorBackendConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        let classifier = ClassifierConfig::default();
        Self {
            accepted_labels: classifier.accepted_labels,
            min_confidence: classifier.min_confidence,
            backend: DetectorBackendConfig::default(),
        }
    }
}

impl DetectorConfig {
    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig {
            accepted_labels: self.accepted_labels.clone(),
            min_confidence: self.min_confidence,
        }
    }
}

/// Frame source selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureSource {
    /// Generated scene, optionally with a moving subject
    Synthetic {
        #[serde(default)]
        moving_subject: bool,
    },
    /// Directory of still images replayed in name order
    Directory { path: PathBuf },
}

impl Default for CaptureSource {
    fn default() -> Self {
        CaptureSource::Synthetic {
            moving_subject: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub source: CaptureSource,

    /// Time between capture attempts
    #[serde(with = "duration_millis_serde")]
    pub frame_interval: Duration,

    /// Synthetic frame size
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: CaptureSource::default(),
            frame_interval: Duration::from_millis(33),
            width: 640,
            height: 480,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorMode {
    #[default]
    Simulated,
    Disconnected,
    /// An external bridge posts readings to `/update_pir` and `/update_rfid`
    Pushed,
}

impl std::fmt::Display for SensorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorMode::Simulated => write!(f, "simulated"),
            SensorMode::Disconnected => write!(f, "disconnected"),
            SensorMode::Pushed => write!(f, "pushed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub mode: SensorMode,

    /// Time between sensor samples
    #[serde(with = "duration_serde")]
    pub poll_interval: Duration,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            mode: SensorMode::default(),
            poll_interval: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    /// Listening port; 0 picks a free port
    pub port: u16,
    /// JPEG quality of the live feed (1-100)
    pub jpeg_quality: u8,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            jpeg_quality: 80,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration in whole seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Serde support for Duration in milliseconds.
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
