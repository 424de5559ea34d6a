use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::error::LoadError;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
/// Names an extra TOML file layered over the default one
pub const CONFIG_PATH_ENV: &str = "STRESS_CONFIG";
pub const ENV_PREFIX: &str = "STRESS__";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub target: TargetConfig,
    #[validate(nested)]
    pub load: LoadConfig,
    #[validate(nested)]
    pub payload: PayloadConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TargetConfig {
    #[validate(custom(function = "validate_target_url"))]
    pub url: String,
    #[validate(length(min = 1))]
    pub content_type: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3002/ingest".to_string(),
            content_type: "application/json".to_string(),
        }
    }
}

impl TargetConfig {
    pub fn parse_url(&self) -> Result<Url, LoadError> {
        let url = Url::parse(&self.url).map_err(|e| LoadError::InvalidTarget {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(LoadError::InvalidTarget {
                url: self.url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        if url.host_str().is_none() {
            return Err(LoadError::InvalidTarget {
                url: self.url.clone(),
                reason: "missing host".to_string(),
            });
        }
        Ok(url)
    }
}

fn validate_target_url(url: &str) -> Result<(), ValidationError> {
    let target = TargetConfig {
        url: url.to_string(),
        ..TargetConfig::default()
    };
    target
        .parse_url()
        .map(|_| ())
        .map_err(|_| ValidationError::new("target_url"))
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoadConfig {
    /// Number of concurrent workers
    #[validate(range(min = 1))]
    pub workers: usize,
    /// Length of the measurement window
    #[validate(range(min = 1))]
    pub duration_secs: u64,
    /// How long stopped workers get to finish their in-flight request
    #[validate(range(min = 1000))]
    pub grace_period_ms: u64,
    #[validate(range(min = 1))]
    pub request_timeout_ms: u64,
    /// Optional attempt budget per worker; the run ends early once all are spent
    #[validate(range(min = 1))]
    pub max_requests_per_worker: Option<u64>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            workers: 50,
            duration_secs: 10,
            grace_period_ms: 1000,
            request_timeout_ms: 5000,
            max_requests_per_worker: None,
        }
    }
}

impl LoadConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Longest a run can take: the window plus the grace period. Workers still
    /// in flight after that are aborted, whatever their request timeout.
    pub fn shutdown_bound(&self) -> Duration {
        self.duration() + self.grace_period()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_user_id_range"))]
pub struct PayloadConfig {
    #[validate(length(min = 1))]
    pub message: String,
    #[validate(range(min = 1))]
    pub records_per_request: usize,
    pub filler_len: usize,
    pub user_id_min: u32,
    pub user_id_max: u32,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            message: "Stress test log entry - Rust vs Python".to_string(),
            records_per_request: 1,
            filler_len: 50,
            user_id_min: 1,
            user_id_max: 10_000,
        }
    }
}

fn validate_user_id_range(payload: &PayloadConfig) -> Result<(), ValidationError> {
    if payload.user_id_min > payload.user_id_max {
        return Err(ValidationError::new("user_id_range"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub format: ReportFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl Config {
    /// Defaults, then `config/default.toml`, then the file named by
    /// `STRESS_CONFIG`, then `STRESS__SECTION__KEY` environment variables.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(DEFAULT_CONFIG_PATH));
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load() -> Result<Self> {
        let cfg: Config = Self::figment().extract()?;
        cfg.validate()?;
        Ok(cfg)
    }
}
