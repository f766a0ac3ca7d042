//! Configuration schema definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default Direct Line token issuance endpoint
pub const DEFAULT_TOKEN_ENDPOINT: &str =
    "https://directline.botframework.com/v3/directline/tokens/generate";

/// Root configuration for the bridge
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Upstream Direct Line connection
    #[serde(default)]
    pub directline: DirectLineConfig,
    /// HTTP surface configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Direct Line session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectLineConfig {
    /// Channel secret used to mint tokens
    #[serde(default)]
    pub secret: String,
    /// Conversation creation endpoint of the bot
    #[serde(default)]
    pub bot_endpoint: String,
    /// Token issuance endpoint
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    /// Sender id used for outbound activities; replies from this id are ignored
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Delay before every activity poll, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Lifetime of an issued token, in seconds
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_secs: u64,
    /// Optional per-request transport timeout, in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_token_endpoint() -> String {
    DEFAULT_TOKEN_ENDPOINT.to_string()
}

fn default_user_id() -> String {
    "user1".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_token_lifetime() -> u64 {
    3600
}

impl Default for DirectLineConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            bot_endpoint: String::new(),
            token_endpoint: default_token_endpoint(),
            user_id: default_user_id(),
            poll_interval_ms: default_poll_interval_ms(),
            token_lifetime_secs: default_token_lifetime(),
            request_timeout_secs: None,
        }
    }
}

/// HTTP surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Service title reported by `/api-info`
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_api_version")]
    pub version: String,
    #[serde(default)]
    pub contact: ContactConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_title() -> String {
    "Direct Line Bridge".to_string()
}

fn default_description() -> String {
    "A microservice that relays messages to a bot over the Direct Line API.".to_string()
}

fn default_api_version() -> String {
    "1.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            title: default_title(),
            description: default_description(),
            version: default_api_version(),
            contact: ContactConfig::default(),
        }
    }
}

/// Contact details reported by `/api-info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    pub name: String,
    pub email: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            name: "Support Team".to_string(),
            email: "support@example.com".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for log files
    #[serde(default = "default_log_dir")]
    pub dir: String,
    /// Module-specific overrides
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: default_log_dir(),
            overrides: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directline_defaults() {
        let config = DirectLineConfig::default();
        assert_eq!(config.token_endpoint, DEFAULT_TOKEN_ENDPOINT);
        assert_eq!(config.user_id, "user1");
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.token_lifetime_secs, 3600);
        assert!(config.request_timeout_secs.is_none());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"directline":{"secret":"S","bot_endpoint":"http://e"}}"#)
                .unwrap();
        assert_eq!(config.directline.secret, "S");
        assert_eq!(config.directline.user_id, "user1");
        assert_eq!(config.gateway.port, 8000);
        assert_eq!(config.logging.level, "info");
    }
}
