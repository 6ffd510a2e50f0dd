use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::models::Language;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct KrishiConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    /// No client-side timeout unless set.
    pub timeout_seconds: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WorkflowConfig {
    pub default_language: Language,
    pub default_location_label: String,
    pub fallback_subsidy_name: String,
    pub error_marker: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_language: Language::English,
            default_location_label: "India".to_string(),
            fallback_subsidy_name: "Govt Subsidy".to_string(),
            error_marker: "Error".to_string(),
        }
    }
}

/// Stand-in for device geolocation. Both coordinates must be set for the
/// device to report a position.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DeviceConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl DeviceConfig {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

impl KrishiConfig {
    /// Load from a TOML file (optional) with `KRISHI__SECTION__KEY` overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("KRISHI")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        s.try_deserialize()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        s.try_deserialize()
    }
}
