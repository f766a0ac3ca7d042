//! Configuration validation rules.

use super::schema::Config;

/// Longest accepted token lifetime (one year)
pub const MAX_TOKEN_LIFETIME_SECS: u64 = 365 * 24 * 3600;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();
    let directline = &config.directline;

    if directline.secret.trim().is_empty() {
        errors.push("directline.secret is required (or set DIRECT_LINE_SECRET)".to_string());
    }
    if directline.bot_endpoint.trim().is_empty() {
        errors.push("directline.bot_endpoint is required (or set BOT_ENDPOINT)".to_string());
    } else if !is_http_url(&directline.bot_endpoint) {
        errors.push("directline.bot_endpoint must be an http(s) URL".to_string());
    }
    if !is_http_url(&directline.token_endpoint) {
        errors.push("directline.token_endpoint must be an http(s) URL".to_string());
    }
    if directline.user_id.trim().is_empty() {
        errors.push("directline.user_id must not be empty".to_string());
    }
    if directline.poll_interval_ms == 0 {
        errors.push("directline.poll_interval_ms must be > 0".to_string());
    }
    if directline.token_lifetime_secs == 0 {
        errors.push("directline.token_lifetime_secs must be > 0".to_string());
    } else if directline.token_lifetime_secs > MAX_TOKEN_LIFETIME_SECS {
        errors.push(format!(
            "directline.token_lifetime_secs must be <= {}",
            MAX_TOKEN_LIFETIME_SECS
        ));
    }
    if directline.request_timeout_secs == Some(0) {
        errors.push("directline.request_timeout_secs must be > 0 when set".to_string());
    }

    if config.gateway.host.trim().is_empty() {
        errors.push("gateway.host must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

fn is_http_url(value: &str) -> bool {
    let value = value.trim();
    value.starts_with("http://") || value.starts_with("https://")
}
