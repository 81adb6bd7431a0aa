use std::path::PathBuf;

use crate::app_config::{AppConfig, ScrapeConfig, WebhookConfig};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process, without touching `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual
/// environment so it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u16 = |var: &str, default: &str| -> Result<u16, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u16>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let bot_token = require("TELEGRAM_BOT_TOKEN")?;
    let log_level = or_default("PHARMBOT_LOG_LEVEL", "info");
    let chrome_binary = lookup("GOOGLE_CHROME_BIN").ok().map(PathBuf::from);

    // APP_NAME marks a Heroku-style deployment: serve a webhook on PORT
    // instead of long polling.
    let webhook = match lookup("APP_NAME") {
        Ok(app_name) => Some(WebhookConfig {
            app_name,
            port: parse_u16("PORT", "8443")?,
        }),
        Err(_) => None,
    };

    let scrape = ScrapeConfig {
        base_url: or_default("PHARMBOT_BASE_URL", "https://www.pharmdata.co.uk")
            .trim_end_matches('/')
            .to_string(),
        page_timeout_secs: parse_u64("PHARMBOT_PAGE_TIMEOUT_SECS", "15")?,
        lookup_budget_secs: parse_u64("PHARMBOT_LOOKUP_BUDGET_SECS", "45")?,
        max_concurrent_details: parse_usize("PHARMBOT_MAX_CONCURRENT_DETAILS", "3")?,
        max_results: parse_usize("PHARMBOT_MAX_RESULTS", "5")?,
        inter_fetch_delay_ms: parse_u64("PHARMBOT_INTER_FETCH_DELAY_MS", "500")?,
        priority_chain: lookup("PHARMBOT_PRIORITY_CHAIN").ok(),
    };

    Ok(AppConfig {
        bot_token,
        log_level,
        chrome_binary,
        webhook,
        scrape,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    /// Returns a map with all required env vars populated with valid values.
    fn full_env<'a>() -> HashMap<&'a str, &'a str> {
        let mut m = HashMap::new();
        m.insert("TELEGRAM_BOT_TOKEN", "123456:test-token");
        m
    }

    #[test]
    fn fails_without_bot_token() {
        let map: HashMap<&str, &str> = HashMap::new();
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "TELEGRAM_BOT_TOKEN"),
            "expected MissingEnvVar(TELEGRAM_BOT_TOKEN), got: {result:?}"
        );
    }

    #[test]
    fn succeeds_with_defaults() {
        let cfg = build_app_config(lookup_from_map(&full_env())).unwrap();
        assert_eq!(cfg.bot_token, "123456:test-token");
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.chrome_binary.is_none());
        assert!(cfg.webhook.is_none());
        assert_eq!(cfg.scrape.base_url, "https://www.pharmdata.co.uk");
        assert_eq!(cfg.scrape.page_timeout_secs, 15);
        assert_eq!(cfg.scrape.lookup_budget_secs, 45);
        assert_eq!(cfg.scrape.max_concurrent_details, 3);
        assert_eq!(cfg.scrape.max_results, 5);
        assert_eq!(cfg.scrape.inter_fetch_delay_ms, 500);
        assert!(cfg.scrape.priority_chain.is_none());
    }

    #[test]
    fn app_name_enables_webhook_with_default_port() {
        let mut map = full_env();
        map.insert("APP_NAME", "pharmbot-prod");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        let webhook = cfg.webhook.expect("webhook config");
        assert_eq!(webhook.app_name, "pharmbot-prod");
        assert_eq!(webhook.port, 8443);
    }

    #[test]
    fn port_override_is_parsed() {
        let mut map = full_env();
        map.insert("APP_NAME", "pharmbot-prod");
        map.insert("PORT", "5000");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.webhook.unwrap().port, 5000);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut map = full_env();
        map.insert("APP_NAME", "pharmbot-prod");
        map.insert("PORT", "not-a-port");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "PORT"),
            "expected InvalidEnvVar(PORT), got: {result:?}"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let mut map = full_env();
        map.insert("PHARMBOT_BASE_URL", "https://example.test/");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.scrape.base_url, "https://example.test");
    }

    #[test]
    fn scrape_tunables_can_be_overridden() {
        let mut map = full_env();
        map.insert("PHARMBOT_PAGE_TIMEOUT_SECS", "30");
        map.insert("PHARMBOT_MAX_CONCURRENT_DETAILS", "1");
        map.insert("PHARMBOT_PRIORITY_CHAIN", "Boots");
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.scrape.page_timeout_secs, 30);
        assert_eq!(cfg.scrape.max_concurrent_details, 1);
        assert_eq!(cfg.scrape.priority_chain.as_deref(), Some("Boots"));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let mut map = full_env();
        map.insert("PHARMBOT_PAGE_TIMEOUT_SECS", "soon");
        let result = build_app_config(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. })
                if var == "PHARMBOT_PAGE_TIMEOUT_SECS"),
            "expected InvalidEnvVar(PHARMBOT_PAGE_TIMEOUT_SECS), got: {result:?}"
        );
    }

    #[test]
    fn debug_redacts_bot_token() {
        let cfg = build_app_config(lookup_from_map(&full_env())).unwrap();
        let rendered = format!("{cfg:?}");
        assert!(rendered.contains("[redacted]"));
        assert!(!rendered.contains("test-token"));
    }
}
