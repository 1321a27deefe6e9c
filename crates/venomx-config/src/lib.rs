//! Environment-driven settings for the VenomX server.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key} is out of range: {reason}")]
    OutOfRange { key: &'static str, reason: String },
}

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_DATABASE_PATH: &str = "data/venomx.db";
pub const DEFAULT_DETECTION_MODEL: &str = "models/snake_detection.onnx";
pub const DEFAULT_CLASSIFICATION_MODEL: &str = "models/snake_classification.onnx";
pub const DEFAULT_CLASSIFICATION_LABELS: &str = "models/snake_classification.labels";
pub const DEFAULT_OSRM_BASE_URL: &str = "https://router.project-osrm.org";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Which origins the CORS layer accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub seed_data_path: Option<PathBuf>,

    pub detection_model_path: PathBuf,
    pub detection_input_size: u32,
    /// Detection model emits an extra rotation channel (YOLO OBB export).
    pub detection_oriented: bool,
    pub classification_model_path: PathBuf,
    pub classification_labels_path: PathBuf,
    pub classification_input_size: u32,
    pub classification_min_confidence: f32,
    pub default_confidence_threshold: f32,

    pub max_upload_bytes: usize,
    pub temp_dir: PathBuf,

    /// `None` disables road routing; distances stay straight-line.
    pub osrm_base_url: Option<String>,
    pub routing_timeout: Duration,
    pub routing_top_n: usize,

    pub inference_timeout: Duration,
    pub inference_workers: usize,

    pub cors_origins: CorsOrigins,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            database_path: DEFAULT_DATABASE_PATH.into(),
            seed_data_path: None,
            detection_model_path: DEFAULT_DETECTION_MODEL.into(),
            detection_input_size: 640,
            detection_oriented: true,
            classification_model_path: DEFAULT_CLASSIFICATION_MODEL.into(),
            classification_labels_path: DEFAULT_CLASSIFICATION_LABELS.into(),
            classification_input_size: 224,
            classification_min_confidence: 0.90,
            default_confidence_threshold: 0.5,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            temp_dir: "temp".into(),
            osrm_base_url: Some(DEFAULT_OSRM_BASE_URL.into()),
            routing_timeout: Duration::from_secs(5),
            routing_top_n: 5,
            inference_timeout: Duration::from_secs(30),
            inference_workers: 2,
            cors_origins: CorsOrigins::Any,
        }
    }
}

impl Settings {
    /// Reads settings from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through an arbitrary key lookup. Unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut s = Settings::default();

        if let Some(v) = get("BIND_ADDR") {
            s.bind_addr = v;
        }
        if let Some(v) = get("DATABASE_PATH") {
            s.database_path = v.into();
        }
        s.seed_data_path = get("SEED_DATA_PATH").map(PathBuf::from);

        if let Some(v) = get("DETECTION_MODEL_PATH") {
            s.detection_model_path = v.into();
        }
        if let Some(v) = get("CLASSIFICATION_MODEL_PATH") {
            s.classification_model_path = v.into();
        }
        if let Some(v) = get("CLASSIFICATION_LABELS_PATH") {
            s.classification_labels_path = v.into();
        }
        if let Some(v) = get("TEMP_DIR") {
            s.temp_dir = v.into();
        }

        parse_into(&get, "DETECTION_INPUT_SIZE", &mut s.detection_input_size)?;
        parse_into(&get, "DETECTION_ORIENTED", &mut s.detection_oriented)?;
        parse_into(&get, "CLASSIFICATION_INPUT_SIZE", &mut s.classification_input_size)?;
        parse_into(&get, "CLASSIFICATION_MIN_CONFIDENCE", &mut s.classification_min_confidence)?;
        parse_into(&get, "DEFAULT_CONFIDENCE_THRESHOLD", &mut s.default_confidence_threshold)?;
        parse_into(&get, "MAX_UPLOAD_BYTES", &mut s.max_upload_bytes)?;
        parse_into(&get, "ROUTING_TOP_N", &mut s.routing_top_n)?;
        parse_into(&get, "INFERENCE_WORKERS", &mut s.inference_workers)?;

        let mut routing_secs = s.routing_timeout.as_secs();
        parse_into(&get, "ROUTING_TIMEOUT_SECS", &mut routing_secs)?;
        s.routing_timeout = Duration::from_secs(routing_secs);

        let mut inference_secs = s.inference_timeout.as_secs();
        parse_into(&get, "INFERENCE_TIMEOUT_SECS", &mut inference_secs)?;
        s.inference_timeout = Duration::from_secs(inference_secs);

        // Set-but-empty disables routing, unset keeps the public OSRM default.
        if let Some(v) = lookup("OSRM_BASE_URL") {
            let trimmed = v.trim().trim_end_matches('/');
            s.osrm_base_url = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }

        if let Some(v) = get("CORS_ORIGINS") {
            s.cors_origins = parse_cors(&v);
        }

        s.validate()?;
        Ok(s)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("CLASSIFICATION_MIN_CONFIDENCE", self.classification_min_confidence)?;
        check_unit("DEFAULT_CONFIDENCE_THRESHOLD", self.default_confidence_threshold)?;

        if self.detection_input_size == 0 || self.classification_input_size == 0 {
            return Err(ConfigError::OutOfRange {
                key: "INPUT_SIZE",
                reason: "model input sizes must be non-zero".into(),
            });
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::OutOfRange {
                key: "MAX_UPLOAD_BYTES",
                reason: "must be greater than zero".into(),
            });
        }
        if self.inference_workers == 0 {
            return Err(ConfigError::OutOfRange {
                key: "INFERENCE_WORKERS",
                reason: "at least one worker is required".into(),
            });
        }
        if self.inference_timeout.is_zero() || self.routing_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                key: "TIMEOUT_SECS",
                reason: "timeouts must be at least one second".into(),
            });
        }
        if self.osrm_base_url.is_some() && self.routing_top_n == 0 {
            warn!("ROUTING_TOP_N is 0: routing is configured but no facility will be enriched");
        }
        Ok(())
    }
}

fn parse_into<T, G>(get: &G, key: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return Ok(());
    };
    *target = raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })?;
    Ok(())
}

fn check_unit(key: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            key,
            reason: format!("{value} is not within 0.0..=1.0"),
        })
    }
}

fn parse_cors(raw: &str) -> CorsOrigins {
    if raw.trim() == "*" {
        return CorsOrigins::Any;
    }
    let origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if origins.is_empty() {
        CorsOrigins::Any
    } else {
        CorsOrigins::List(origins)
    }
}
