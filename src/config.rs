use crate::error::ConfigError;
use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use serde_derive::Deserialize;
use std::str::FromStr;
use std::time::Duration;

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AppConfig {
    pub fn log_level(&self) -> tracing::Level {
        tracing::Level::from_str(self.log_level.as_str()).unwrap_or(tracing::Level::INFO)
    }
}

pub(crate) fn load_app_config() -> Result<AppConfig> {
    match envy::from_env::<AppConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load AppConfig: {}", err)),
    }
}

fn default_timezone() -> String {
    "Europe/Vienna".to_string()
}

#[derive(Deserialize, Debug, Clone)]
pub struct MeterConfig {
    /// Opaque meter identifier, written as the `meterId` tag.
    pub id: String,
    /// IANA timezone the portal reports local times in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl MeterConfig {
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        Tz::from_str(&self.timezone).map_err(|e| ConfigError::invalid("METER_TIMEZONE", e.to_string()))
    }
}

pub fn load_meter_config() -> Result<MeterConfig> {
    match envy::prefixed("METER_").from_env::<MeterConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load MeterConfig: {}", err)),
    }
}

fn default_max_pages() -> usize {
    50
}

#[derive(Deserialize, Debug, Clone)]
pub struct PortalConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    // upper bound on paginated table pages per measurement and day
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

pub(crate) fn load_portal_config() -> Result<PortalConfig> {
    match envy::prefixed("PORTAL_").from_env::<PortalConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load PortalConfig: {}", err)),
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

pub fn load_influx_config() -> Result<InfluxConfig> {
    match envy::prefixed("INFLUXDB_").from_env::<InfluxConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load InfluxConfig: {}", err)),
    }
}

fn default_empty_day_budget() -> i64 {
    7
}

fn default_failure_ceiling() -> u32 {
    5
}

fn default_delay_ms() -> u64 {
    300
}

fn default_failure_delay_ms() -> u64 {
    5000
}

fn default_expected_daily_count() -> usize {
    // 24 hours x 4 quarter hours x 2 measurements
    24 * 4 * 2
}

fn default_revalidation_days() -> u32 {
    7
}

/// Policy constants of the backfill engine.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PolicyConfig {
    #[serde(default = "default_empty_day_budget")]
    pub empty_day_budget: i64,
    #[serde(default = "default_failure_ceiling")]
    pub failure_ceiling: u32,
    #[serde(default = "default_failure_ceiling")]
    pub forward_failure_ceiling: u32,
    #[serde(default = "default_failure_ceiling")]
    pub audit_failure_ceiling: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_failure_delay_ms")]
    pub failure_delay_ms: u64,
    #[serde(default = "default_expected_daily_count")]
    pub expected_daily_count: usize,
    #[serde(default = "default_revalidation_days")]
    pub revalidation_days: u32,
}

impl PolicyConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn failure_delay(&self) -> Duration {
        Duration::from_millis(self.failure_delay_ms)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            empty_day_budget: default_empty_day_budget(),
            failure_ceiling: default_failure_ceiling(),
            forward_failure_ceiling: default_failure_ceiling(),
            audit_failure_ceiling: default_failure_ceiling(),
            delay_ms: default_delay_ms(),
            failure_delay_ms: default_failure_delay_ms(),
            expected_daily_count: default_expected_daily_count(),
            revalidation_days: default_revalidation_days(),
        }
    }
}

pub fn load_policy_config() -> Result<PolicyConfig> {
    match envy::prefixed("POLICY_").from_env::<PolicyConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load PolicyConfig: {}", err)),
    }
}
