//! Webhook handling configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Webhook handling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Deployment-wide HMAC secret for `POST /webhooks/whatsapp`. When
    /// unset, each tenant's Meta Cloud secret applies, and tenants without
    /// one accept unsigned deliveries.
    #[serde(default)]
    pub messaging_secret: Option<SecretString>,

    /// How long provider credentials stay cached, in seconds
    #[serde(default = "default_provider_config_ttl")]
    pub provider_config_ttl_secs: u64,

    /// Compare-and-swap attempts per order/subscription transition
    #[serde(default = "default_max_transition_attempts")]
    pub max_transition_attempts: u32,

    /// Extra request headers redacted from audit records (comma-separated)
    #[serde(default)]
    pub audit_headers_redacted: Option<String>,

    /// Days to keep audit records. Unset keeps them forever.
    #[serde(default)]
    pub audit_retention_days: Option<u32>,
}

impl WebhookConfig {
    pub fn provider_config_ttl(&self) -> Duration {
        Duration::from_secs(self.provider_config_ttl_secs)
    }

    /// Redacted header names as a list.
    pub fn redacted_headers(&self) -> Vec<String> {
        self.audit_headers_redacted
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(|h| h.trim().to_ascii_lowercase())
                    .filter(|h| !h.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Validate webhook configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=10).contains(&self.max_transition_attempts) {
            return Err(ValidationError::InvalidTransitionAttempts);
        }
        if self.audit_retention_days == Some(0) {
            return Err(ValidationError::InvalidRetention);
        }
        if let Some(secret) = &self.messaging_secret {
            if secret.expose_secret().trim().is_empty() {
                return Err(ValidationError::BlankMessagingSecret);
            }
        }
        Ok(())
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            messaging_secret: None,
            provider_config_ttl_secs: default_provider_config_ttl(),
            max_transition_attempts: default_max_transition_attempts(),
            audit_headers_redacted: None,
            audit_retention_days: None,
        }
    }
}

fn default_provider_config_ttl() -> u64 {
    60
}

fn default_max_transition_attempts() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = WebhookConfig::default();
        assert_eq!(config.provider_config_ttl(), Duration::from_secs(60));
        assert_eq!(config.max_transition_attempts, 3);
        assert!(config.redacted_headers().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn redacted_headers_are_split_and_lowercased() {
        let config = WebhookConfig {
            audit_headers_redacted: Some("X-Api-Key, x-webhook-signature,,".to_string()),
            ..Default::default()
        };
        assert_eq!(config.redacted_headers(), vec!["x-api-key", "x-webhook-signature"]);
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let config = WebhookConfig {
            max_transition_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidTransitionAttempts)));
    }

    #[test]
    fn blank_messaging_secret_is_rejected() {
        let config = WebhookConfig {
            messaging_secret: Some(SecretString::new("  ".to_string())),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::BlankMessagingSecret)));
    }

    #[test]
    fn zero_retention_is_rejected() {
        let config = WebhookConfig {
            audit_retention_days: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidRetention)));
    }
}
