use std::path::PathBuf;

/// Webhook transport settings, present only when the deployment exposes a
/// public hostname (`APP_NAME` is set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Heroku-style app name; the public URL is derived from it.
    pub app_name: String,
    /// Port the webhook listener binds to.
    pub port: u16,
}

/// Tunables for the scraping pipeline. Every field has an env-var override
/// and a default matching the original deployment's behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeConfig {
    /// Root of the source site, no trailing slash.
    pub base_url: String,
    /// Per-page load budget, in seconds.
    pub page_timeout_secs: u64,
    /// Whole-lookup budget (search plus all detail fetches), in seconds.
    pub lookup_budget_secs: u64,
    /// Bounded fan-out for concurrent detail-page fetches.
    pub max_concurrent_details: usize,
    /// Cap on identifiers taken from one search page.
    pub max_results: usize,
    /// Courtesy delay between detail fetches when they run sequentially.
    pub inter_fetch_delay_ms: u64,
    /// When set, records whose name starts with this chain sort first.
    pub priority_chain: Option<String>,
}

#[derive(Clone)]
pub struct AppConfig {
    pub bot_token: String,
    pub log_level: String,
    /// Explicit Chrome binary path; discovery runs when absent.
    pub chrome_binary: Option<PathBuf>,
    /// Webhook transport when set, long polling otherwise.
    pub webhook: Option<WebhookConfig>,
    pub scrape: ScrapeConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bot_token", &"[redacted]")
            .field("log_level", &self.log_level)
            .field("chrome_binary", &self.chrome_binary)
            .field("webhook", &self.webhook)
            .field("scrape", &self.scrape)
            .finish()
    }
}
