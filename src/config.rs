use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::MAX_IMAGE_BYTES;

/// Application-level constants
pub const APP_NAME: &str = "digit-facts";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Artifact file names inside the models directory
pub const SCALER_FILE: &str = "scaler.json";
pub const REDUCER_FILE: &str = "pca.json";
pub const CLASSIFIER_FILE: &str = "digit_model.json";

pub const ENV_MODELS_DIR: &str = "DIGIT_FACTS_MODELS_DIR";
pub const ENV_FACTS_PATH: &str = "DIGIT_FACTS_FACTS_PATH";
pub const ENV_BIND: &str = "DIGIT_FACTS_BIND";
pub const ENV_MAX_UPLOAD_BYTES: &str = "DIGIT_FACTS_MAX_UPLOAD_BYTES";

/// Log filter used when `RUST_LOG` is unset
pub fn default_log_filter() -> &'static str {
    "digit_facts_lib=info,digit_facts=info,tower_http=info"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

/// Runtime configuration resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub models_dir: PathBuf,
    pub facts_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            facts_path: PathBuf::from("facts.json"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            max_upload_bytes: MAX_IMAGE_BYTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Resolve from an arbitrary variable source. Unset variables take
    /// their defaults; set but unparseable ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let bind_addr = match lookup(ENV_BIND) {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
                var: ENV_BIND,
                value,
            })?,
            None => defaults.bind_addr,
        };

        let max_upload_bytes = match lookup(ENV_MAX_UPLOAD_BYTES) {
            Some(value) => match value.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: ENV_MAX_UPLOAD_BYTES,
                        value,
                    })
                }
            },
            None => defaults.max_upload_bytes,
        };

        Ok(Self {
            models_dir: lookup(ENV_MODELS_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.models_dir),
            facts_path: lookup(ENV_FACTS_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.facts_path),
            bind_addr,
            max_upload_bytes,
        })
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.models_dir.join(SCALER_FILE)
    }

    pub fn reducer_path(&self) -> PathBuf {
        self.models_dir.join(REDUCER_FILE)
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.models_dir.join(CLASSIFIER_FILE)
    }
}
