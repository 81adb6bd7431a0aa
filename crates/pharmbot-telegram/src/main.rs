mod format;
mod handlers;

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tracing_subscriber::EnvFilter;

use pharmbot_core::AppConfig;
use pharmbot_scraper::browser::BrowserSession;
use pharmbot_scraper::{ChromeFetcher, PharmacyLookup};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pharmbot_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    chrome_self_test(&config).await;

    let fetcher = ChromeFetcher::new(config.scrape.clone(), config.chrome_binary.clone());
    let lookup = Arc::new(PharmacyLookup::new(
        Arc::new(fetcher),
        config.scrape.clone(),
    ));

    let bot = Bot::new(config.bot_token.clone());
    let mut dispatcher = Dispatcher::builder(bot.clone(), handlers::schema())
        .dependencies(dptree::deps![lookup])
        .enable_ctrlc_handler()
        .build();

    match &config.webhook {
        Some(webhook) => {
            let addr = ([0, 0, 0, 0], webhook.port).into();
            let url = format!("https://{}.herokuapp.com/webhook", webhook.app_name).parse()?;
            tracing::info!(%url, port = webhook.port, "starting webhook listener");
            let listener = webhooks::axum(bot, webhooks::Options::new(addr, url)).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("error from the webhook listener"),
                )
                .await;
        }
        None => {
            tracing::info!("starting long polling");
            dispatcher.dispatch().await;
        }
    }

    Ok(())
}

/// Launch-and-close Chrome once at startup so a broken browser install shows
/// up in the logs immediately instead of on the first user query. Non-fatal:
/// the bot still starts and reports failures per request.
async fn chrome_self_test(config: &AppConfig) {
    match BrowserSession::launch(config.chrome_binary.as_deref()).await {
        Ok(session) => {
            session.close().await;
            tracing::info!("Chrome initialization test successful");
        }
        Err(error) => {
            tracing::error!(%error, "Chrome initialization test failed; lookups will fail until a browser is available");
        }
    }
}
