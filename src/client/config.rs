//! Configuration for the call integration controller
//!
//! [`ClientConfig`] carries the vendor credentials plus every tunable the
//! controller's timers and retry loops run on. Defaults match the shipped
//! product behavior: a 30-second post-login grace window, five reconnection
//! attempts on a doubling backoff, three DOM-readiness retries, and a
//! 24-hour trust window for cached logins.
//!
//! # Examples
//!
//! ```rust
//! use aircall_client_core::client::config::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::new("app-id", "app-token", "support.example.com")
//!     .with_max_reconnect_attempts(3)
//!     .with_reconnect_base_delay(Duration::from_millis(500));
//!
//! assert!(config.validate().is_ok());
//! assert_eq!(config.max_reconnect_attempts, 3);
//! assert_eq!(config.login_grace_period, Duration::from_secs(30));
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::sdk::SdkConfig;

/// Controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Vendor API identifier
    pub api_id: String,
    /// Vendor API token
    pub api_token: String,
    /// Tenant domain the workspace is embedded under
    pub domain_name: String,
    /// Deadline for the SDK `initialize` call
    pub init_timeout: Duration,
    /// Interval at which login status is polled while in `needs-login`
    pub login_poll_interval: Duration,
    /// Window after login during which logout events are treated as noise
    pub login_grace_period: Duration,
    /// Maximum automatic reconnection attempts before giving up
    pub max_reconnect_attempts: u32,
    /// Base delay of the exponential reconnection backoff
    pub reconnect_base_delay: Duration,
    /// Window within which overlapping reconnection triggers are skipped
    pub reconnect_debounce: Duration,
    /// How many times to retry the container lookup before giving up
    pub container_retry_attempts: u32,
    /// Interval between container lookup retries
    pub container_retry_interval: Duration,
    /// Delay before the tracked call is cleared after it ends
    pub call_clear_delay: Duration,
    /// How long a persisted login timestamp is trusted
    pub cached_login_ttl: Duration,
}

impl ClientConfig {
    /// Create a configuration with product-default timings
    pub fn new(
        api_id: impl Into<String>,
        api_token: impl Into<String>,
        domain_name: impl Into<String>,
    ) -> Self {
        Self {
            api_id: api_id.into(),
            api_token: api_token.into(),
            domain_name: domain_name.into(),
            init_timeout: Duration::from_secs(30),
            login_poll_interval: Duration::from_secs(2),
            login_grace_period: Duration::from_secs(30),
            max_reconnect_attempts: 5,
            reconnect_base_delay: Duration::from_secs(1),
            reconnect_debounce: Duration::from_secs(5),
            container_retry_attempts: 3,
            container_retry_interval: Duration::from_millis(300),
            call_clear_delay: Duration::from_secs(5),
            cached_login_ttl: Duration::from_secs(24 * 3600),
        }
    }

    /// Set the deadline for the SDK `initialize` call
    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Set the login polling interval
    pub fn with_login_poll_interval(mut self, interval: Duration) -> Self {
        self.login_poll_interval = interval;
        self
    }

    /// Set the post-login grace window
    pub fn with_login_grace_period(mut self, period: Duration) -> Self {
        self.login_grace_period = period;
        self
    }

    /// Set the reconnection attempt budget
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Set the backoff base delay
    pub fn with_reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.reconnect_base_delay = delay;
        self
    }

    /// Set the cross-trigger reconnection debounce window
    pub fn with_reconnect_debounce(mut self, window: Duration) -> Self {
        self.reconnect_debounce = window;
        self
    }

    /// Set the container lookup retry parameters
    pub fn with_container_retry(mut self, attempts: u32, interval: Duration) -> Self {
        self.container_retry_attempts = attempts;
        self.container_retry_interval = interval;
        self
    }

    /// Set the delay before an ended call is cleared
    pub fn with_call_clear_delay(mut self, delay: Duration) -> Self {
        self.call_clear_delay = delay;
        self
    }

    /// Set how long a persisted login timestamp is trusted
    pub fn with_cached_login_ttl(mut self, ttl: Duration) -> Self {
        self.cached_login_ttl = ttl;
        self
    }

    /// Whether vendor credentials are present
    ///
    /// Initialization is skipped entirely when they are not; an integration
    /// without credentials is simply not configured, not broken.
    pub fn has_credentials(&self) -> bool {
        !self.api_id.trim().is_empty() && !self.api_token.trim().is_empty()
    }

    /// The subset of this configuration handed to the vendor SDK
    pub fn sdk_config(&self) -> SdkConfig {
        SdkConfig {
            api_id: self.api_id.clone(),
            api_token: self.api_token.clone(),
            domain_name: self.domain_name.clone(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ClientResult<()> {
        if self.domain_name.trim().is_empty() {
            return Err(ClientError::InvalidConfiguration {
                field: "domain_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if Url::parse(&format!("https://{}", self.domain_name)).is_err() {
            return Err(ClientError::InvalidConfiguration {
                field: "domain_name".to_string(),
                reason: "not a valid host name".to_string(),
            });
        }
        if self.max_reconnect_attempts == 0 {
            return Err(ClientError::InvalidConfiguration {
                field: "max_reconnect_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.reconnect_base_delay.is_zero() {
            return Err(ClientError::InvalidConfiguration {
                field: "reconnect_base_delay".to_string(),
                reason: "must be non-zero".to_string(),
            });
        }
        if self.login_poll_interval.is_zero() {
            return Err(ClientError::InvalidConfiguration {
                field: "login_poll_interval".to_string(),
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ClientConfig::new("id", "token", "support.example.com");
        assert!(config.validate().is_ok());
        assert!(config.has_credentials());
    }

    #[test]
    fn empty_credentials_are_detected() {
        let config = ClientConfig::new("", "token", "support.example.com");
        assert!(!config.has_credentials());
        let config = ClientConfig::new("id", "   ", "support.example.com");
        assert!(!config.has_credentials());
    }

    #[test]
    fn bad_domain_is_rejected() {
        let config = ClientConfig::new("id", "token", "");
        assert!(matches!(
            config.validate(),
            Err(ClientError::InvalidConfiguration { field, .. }) if field == "domain_name"
        ));
    }

    #[test]
    fn zero_backoff_base_is_rejected() {
        let config = ClientConfig::new("id", "token", "support.example.com")
            .with_reconnect_base_delay(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn sdk_config_carries_the_credentials() {
        let config = ClientConfig::new("id", "token", "support.example.com");
        let sdk = config.sdk_config();
        assert_eq!(sdk.api_id, "id");
        assert_eq!(sdk.api_token, "token");
        assert_eq!(sdk.domain_name, "support.example.com");
    }
}
