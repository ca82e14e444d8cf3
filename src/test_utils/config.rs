//! Configuration utilities for testing.
//!
//! Builders for portal and InfluxDB configurations pointing at mock servers,
//! plus engine settings with delays switched off.

use crate::config::{InfluxConfig, PolicyConfig, PortalConfig};
use crate::engine::EngineSettings;
use chrono_tz::Europe::Vienna;

pub const TEST_METER_ID: &str = "meter-1";

/// Builder for creating test portal configurations.
#[derive(Debug)]
pub struct TestPortalConfigBuilder {
    url: String,
    user: String,
    password: String,
    max_pages: usize,
}

impl TestPortalConfigBuilder {
    pub fn new() -> Self {
        Self {
            url: "http://test.local".to_string(),
            user: "test_user".to_string(),
            password: "test_password".to_string(),
            max_pages: 50,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn build(self) -> PortalConfig {
        PortalConfig {
            url: self.url,
            user: self.user,
            password: self.password,
            max_pages: self.max_pages,
        }
    }
}

/// Creates a test portal configuration with a custom URL.
pub fn test_portal_config_with_url(url: impl Into<String>) -> PortalConfig {
    TestPortalConfigBuilder::new().with_url(url).build()
}

/// Creates a test InfluxDB configuration with a custom URL.
pub fn test_influx_config_with_url(url: impl Into<String>) -> InfluxConfig {
    InfluxConfig {
        url: url.into(),
        org: "test-org".to_string(),
        token: "test-token".to_string(),
        bucket: "test-bucket".to_string(),
    }
}

/// Default policy with both delays at zero so walks run instantly.
pub fn test_policy() -> PolicyConfig {
    PolicyConfig {
        delay_ms: 0,
        failure_delay_ms: 0,
        ..PolicyConfig::default()
    }
}

pub fn test_settings() -> EngineSettings {
    test_settings_with_policy(test_policy())
}

pub fn test_settings_with_policy(policy: PolicyConfig) -> EngineSettings {
    EngineSettings {
        meter_id: TEST_METER_ID.to_string(),
        tz: Vienna,
        policy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portal_config_builder() {
        let config = TestPortalConfigBuilder::new()
            .with_url("http://portal.local")
            .with_max_pages(3)
            .build();

        assert_eq!(config.url, "http://portal.local");
        assert_eq!(config.user, "test_user");
        assert_eq!(config.max_pages, 3);
    }

    #[test]
    fn test_policy_has_no_delays() {
        let policy = test_policy();
        assert!(policy.delay().is_zero());
        assert!(policy.failure_delay().is_zero());
        assert_eq!(policy.empty_day_budget, 7);
    }
}
