use serde::Deserialize;

use crate::{reconcile::GracePolicy, utils::error::LicenceError};

#[derive(Debug, Clone, Deserialize)]
pub struct LicenceConfig {
    /// Port the licence service listens on (default 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    pub redis_url: String,

    /// Billing backend the poller and purchase flows talk to
    pub billing_api_url: String,

    pub billing_api_key: String,

    /// Shared secret for signed purchase webhooks; unsigned webhooks are accepted when unset
    pub webhook_secret: Option<String>,

    /// Identifies this installation's entitlement state and notification channel
    #[serde(default = "default_installation_id")]
    pub installation_id: String,

    /// How often the purchase inventory is re-queried
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Days a licence survives without a backing purchase; unset downgrades immediately
    pub grace_period_days: Option<u32>,

    /// Per-request timeout in ms before the service returns 408
    #[serde(default = "default_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl LicenceConfig {
    pub fn load() -> Result<Self, LicenceError> {
        dotenvy::dotenv().ok();

        let cfg: LicenceConfig = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), LicenceError> {
        if self.installation_id.trim().is_empty() {
            return Err(LicenceError::ConfigError(
                "installation_id must not be empty".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(LicenceError::ConfigError(
                "poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        if matches!(self.webhook_secret.as_deref(), Some(s) if s.is_empty()) {
            return Err(LicenceError::ConfigError(
                "webhook_secret must not be empty when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn grace_policy(&self) -> GracePolicy {
        GracePolicy::from_days(self.grace_period_days)
    }
}

fn default_port() -> u16 {
    8080
}
fn default_installation_id() -> String {
    "default".to_string()
}
fn default_poll_interval_secs() -> u64 {
    300
}
fn default_timeout_ms() -> u64 {
    5_000
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn config() -> LicenceConfig {
        serde_json::from_value(serde_json::json!({
            "redis_url": "redis://127.0.0.1/",
            "billing_api_url": "http://billing.local",
            "billing_api_key": "key"
        }))
        .unwrap()
    }

    #[test]
    fn defaults_apply() {
        let cfg = config();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.installation_id, "default");
        assert_eq!(cfg.poll_interval_secs, 300);
        assert!(cfg.webhook_secret.is_none());
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.grace_policy(), GracePolicy::Immediate);
    }

    #[test]
    fn grace_days_become_a_window() {
        let mut cfg = config();
        cfg.grace_period_days = Some(7);
        assert_eq!(cfg.grace_policy(), GracePolicy::Window(Duration::days(7)));
    }

    #[test]
    fn rejects_empty_webhook_secret() {
        let mut cfg = config();
        cfg.webhook_secret = Some(String::new());
        assert!(matches!(cfg.validate(), Err(LicenceError::ConfigError(_))));
    }
}
