//! Telegram update handling.
//!
//! Every submitted query ends in exactly one final informative message:
//! results, "nothing found", a format hint, or a generic failure. The
//! progress message sent up front is edited in place for terminal non-result
//! outcomes and deleted once a result block is ready.

use std::sync::Arc;

use pharmbot_core::{QueryError, SearchQuery};
use pharmbot_scraper::{LookupError, PharmacyLookup};
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::format;

const FAILURE_TEXT: &str =
    "Sorry, something went wrong while fetching pharmacy data. Please try again later.";

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "introduce the bot.")]
    Start,
    #[command(description = "show usage help.")]
    Help,
}

pub fn schema() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(dptree::endpoint(handle_text))
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command) -> ResponseResult<()> {
    let text = match cmd {
        Command::Start => {
            tracing::info!(chat = %msg.chat.id, "received /start");
            "Hello! I am a pharmacy information bot. \
             Send me a UK postcode and I will find pharmacies in that area."
        }
        Command::Help => {
            "Send a UK postcode (e.g. SW1A 1AA) to list nearby pharmacies, \
             or a 5-character pharmacy code (e.g. FJ144) to look one up directly."
        }
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_text(bot: Bot, msg: Message, lookup: Arc<PharmacyLookup>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = msg.chat.id;
    tracing::info!(chat = %chat_id, "received lookup request");

    let query = match SearchQuery::parse(text) {
        Ok(query) => query,
        Err(QueryError::Empty) => {
            bot.send_message(
                chat_id,
                "Please send a UK postcode or a 5-character pharmacy code.",
            )
            .await?;
            return Ok(());
        }
        Err(error @ QueryError::Invalid { .. }) => {
            bot.send_message(chat_id, format!("{error}. Example: SW1A 1AA"))
                .await?;
            return Ok(());
        }
    };

    let status = bot
        .send_message(chat_id, format::searching_message(&query))
        .await?;

    match query {
        SearchQuery::Code(code) => match lookup.lookup_by_code(&code).await {
            Ok(Some(record)) => {
                bot.delete_message(chat_id, status.id).await?;
                bot.send_message(chat_id, format::format_records(&[record]))
                    .await?;
            }
            Ok(None) => {
                bot.edit_message_text(
                    chat_id,
                    status.id,
                    format!("No pharmacy found for code {code}."),
                )
                .await?;
            }
            Err(error) => {
                tracing::error!(%error, %code, "code lookup failed");
                bot.edit_message_text(chat_id, status.id, FAILURE_TEXT)
                    .await?;
            }
        },
        SearchQuery::Postcode(postcode) => match lookup.lookup_by_postcode(&postcode).await {
            Ok(records) if records.is_empty() => {
                bot.edit_message_text(
                    chat_id,
                    status.id,
                    "No pharmacies found for the given postcode.",
                )
                .await?;
            }
            Ok(records) => {
                tracing::info!(count = records.len(), "lookup finished");
                bot.delete_message(chat_id, status.id).await?;
                bot.send_message(chat_id, format::format_records(&records))
                    .await?;
            }
            Err(LookupError::Query(error)) => {
                bot.edit_message_text(chat_id, status.id, format!("{error}. Example: SW1A 1AA"))
                    .await?;
            }
            Err(error) => {
                tracing::error!(%error, %postcode, "postcode lookup failed");
                bot.edit_message_text(chat_id, status.id, FAILURE_TEXT)
                    .await?;
            }
        },
    }

    Ok(())
}
