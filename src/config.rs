//! Identification service configuration.
//!
//! Resolution order (later wins):
//!
//! 1. Built-in defaults (local development service on port 8000)
//! 2. Optional YAML file
//! 3. Environment variables, with `.env` loaded via dotenvy
//!
//! | Variable                         | Field              |
//! |----------------------------------|--------------------|
//! | `MEDSCAN_UPLOAD_URL`             | `upload_url`       |
//! | `MEDSCAN_RESULTS_URL`            | `results_url`      |
//! | `MEDSCAN_REQUEST_TIMEOUT_SECS`   | `request_timeout`  |
//! | `MEDSCAN_ANALYSIS_TIMEOUT_SECS`  | `analysis_timeout` (`0` disables) |
//! | `MEDSCAN_SCAN_ID_FIELD`          | `scan_id_field`    |

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;
use crate::identification::ScanId;

const DEFAULT_UPLOAD_URL: &str = "http://localhost:8000/api/upload_images";
const DEFAULT_RESULTS_URL: &str = "http://localhost:8000/api/get_results/{scan_id}";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ANALYSIS_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SCAN_ID_FIELD: &str = "scan_id";

/// Placeholder substituted with the scan identifier in `results_url`.
pub const SCAN_ID_PLACEHOLDER: &str = "{scan_id}";

pub const ENV_UPLOAD_URL: &str = "MEDSCAN_UPLOAD_URL";
pub const ENV_RESULTS_URL: &str = "MEDSCAN_RESULTS_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "MEDSCAN_REQUEST_TIMEOUT_SECS";
pub const ENV_ANALYSIS_TIMEOUT_SECS: &str = "MEDSCAN_ANALYSIS_TIMEOUT_SECS";
pub const ENV_SCAN_ID_FIELD: &str = "MEDSCAN_SCAN_ID_FIELD";

/// Endpoints and limits for the identification service exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// `POST` target for the multipart image upload.
    pub upload_url: Url,
    /// `GET` target template containing `{scan_id}`.
    pub results_url: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Deadline for a whole analysis attempt; `None` waits indefinitely.
    pub analysis_timeout: Option<Duration>,
    /// Name of the identifier field in the upload response.
    pub scan_id_field: String,
}

/// On-disk form. Every field is optional and overlays the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceConfigFile {
    upload_url: Option<String>,
    results_url: Option<String>,
    request_timeout_secs: Option<u64>,
    analysis_timeout_secs: Option<u64>,
    scan_id_field: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            upload_url: Url::parse(DEFAULT_UPLOAD_URL).expect("default upload URL is valid"),
            results_url: DEFAULT_RESULTS_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            analysis_timeout: Some(Duration::from_secs(DEFAULT_ANALYSIS_TIMEOUT_SECS)),
            scan_id_field: DEFAULT_SCAN_ID_FIELD.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Build a config for explicit endpoints, keeping default limits.
    pub fn new(upload_url: &str, results_url: &str) -> Result<Self, ConfigError> {
        let config = Self {
            upload_url: parse_url("upload_url", upload_url)?,
            results_url: results_url.to_string(),
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_with(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the YAML file if given, then the environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    fn load_with(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(path) = path {
            config
                .apply_file(path)
                .with_context(|| format!("Loading service config from {}", path.display()))?;
        }
        config.apply_env_with(lookup)?;
        config.validate()?;
        tracing::info!(
            upload_url = %config.upload_url,
            results_url = %config.results_url,
            "identification service configured"
        );
        Ok(config)
    }

    /// Overlay values from a YAML file.
    pub fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ServiceConfigFile =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(url) = file.upload_url {
            self.upload_url = parse_url("upload_url", &url)?;
        }
        if let Some(url) = file.results_url {
            self.results_url = url;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = request_timeout("request_timeout_secs", secs)?;
        }
        if let Some(secs) = file.analysis_timeout_secs {
            self.analysis_timeout = analysis_timeout(secs);
        }
        if let Some(field) = file.scan_id_field {
            self.scan_id_field = field;
        }
        Ok(())
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_UPLOAD_URL) {
            self.upload_url = parse_url(ENV_UPLOAD_URL, &url)?;
        }
        if let Some(url) = lookup(ENV_RESULTS_URL) {
            self.results_url = url;
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            let secs = parse_secs(ENV_REQUEST_TIMEOUT_SECS, &raw)?;
            self.request_timeout = request_timeout(ENV_REQUEST_TIMEOUT_SECS, secs)?;
        }
        if let Some(raw) = lookup(ENV_ANALYSIS_TIMEOUT_SECS) {
            self.analysis_timeout = analysis_timeout(parse_secs(ENV_ANALYSIS_TIMEOUT_SECS, &raw)?);
        }
        if let Some(field) = lookup(ENV_SCAN_ID_FIELD) {
            self.scan_id_field = field;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.upload_url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "upload_url",
                format!("unsupported scheme `{}`", self.upload_url.scheme()),
            ));
        }
        if self.results_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "results_url".into(),
            });
        }
        if !self.results_url.contains(SCAN_ID_PLACEHOLDER) {
            return Err(ConfigError::invalid(
                "results_url",
                format!("template must contain {SCAN_ID_PLACEHOLDER}"),
            ));
        }
        let probe = parse_url("results_url", &self.results_url.replace(SCAN_ID_PLACEHOLDER, "x"))?;
        if !matches!(probe.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(
                "results_url",
                format!("unsupported scheme `{}`", probe.scheme()),
            ));
        }
        if self.scan_id_field.trim().is_empty() {
            return Err(ConfigError::Missing {
                key: "scan_id_field".into(),
            });
        }
        Ok(())
    }

    /// Concrete results URL for a scan identifier.
    pub fn results_url_for(&self, scan_id: &ScanId) -> Result<Url, ConfigError> {
        let url = self
            .results_url
            .replace(SCAN_ID_PLACEHOLDER, &encode_path_segment(scan_id.as_str()));
        parse_url("results_url", &url)
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::invalid(key, format!("`{raw}`: {e}")))
}

fn parse_secs(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("`{raw}` is not a number of seconds")))
}

fn request_timeout(key: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(secs))
}

fn analysis_timeout(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Percent-encode an identifier for use as a single path segment.
fn encode_path_segment(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            b => format!("%{:02X}", b),
        })
        .collect()
}
