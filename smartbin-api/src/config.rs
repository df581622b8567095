use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_ASK_MODEL: &str = "gemini-1.5-flash-latest";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 12 * 1024 * 1024;

/// Configuration loading errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },

    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),
}

/// Runtime settings of the API server
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub bind_addr: String,
    /// Gemini API key; classify and ask fail with a clear error without it
    pub gemini_api_key: Option<String>,
    /// Vision model candidates, tried in order while a model is reported missing
    pub gemini_models: Vec<String>,
    pub ask_model: String,
    pub gemini_endpoint: String,
    pub request_timeout: Duration,
    pub max_upload_bytes: usize,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub history_limit: Option<usize>,
    pub downscale_images: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_addr: "0.0.0.0".to_string(),
            gemini_api_key: None,
            gemini_models: vec![DEFAULT_MODEL.to_string()],
            ask_model: DEFAULT_ASK_MODEL.to_string(),
            gemini_endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(120),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            data_dir: PathBuf::from("data"),
            static_dir: PathBuf::from("public"),
            history_limit: None,
            downscale_images: true,
        }
    }
}

impl ApiConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let gemini_models = match get("GEMINI_MODEL") {
            Some(list) => {
                let models: Vec<String> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect();
                if models.is_empty() {
                    return Err(ConfigError::Invalid {
                        key: "GEMINI_MODEL".to_string(),
                        value: list,
                    });
                }
                models
            }
            None => defaults.gemini_models,
        };

        Ok(Self {
            port: parse_or(&get, "PORT", defaults.port)?,
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_models,
            ask_model: get("GEMINI_ASK_MODEL").unwrap_or(defaults.ask_model),
            gemini_endpoint: get("GEMINI_ENDPOINT")
                .map(|e| e.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini_endpoint),
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 120u64)?),
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            static_dir: get("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            history_limit: get("HISTORY_LIMIT")
                .map(|v| parse_value("HISTORY_LIMIT", &v))
                .transpose()?,
            downscale_images: match get("DOWNSCALE_IMAGES") {
                Some(v) => parse_bool("DOWNSCALE_IMAGES", &v)?,
                None => defaults.downscale_images,
            },
        })
    }

    /// Address the server listens on
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_addr, self.port);
        addr.parse()
            .map_err(|_| ConfigError::InvalidAddress(addr.clone()))
    }

    /// Location of the JSON history file
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("db.json")
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
