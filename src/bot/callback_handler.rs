//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::debug;

// Import controller types
use crate::controller::InboundEvent;
use crate::session::{MessageRef, UserRef};

use super::transport::TelegramPhoto;
use super::BotController;

/// Handle callback queries from the adjustment keyboard
///
/// The query is always answered; failures are shown as an alert.
pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    controller: Arc<BotController>,
) -> Result<()> {
    let user_id = q.from.id.0 as i64;
    let action_id = q.data.clone().unwrap_or_default();
    debug!(user_id, action = %action_id, "Received callback query from user");

    let message = q.message.as_ref().map(|m| MessageRef {
        chat_id: m.chat().id.0,
        message_id: m.id().0,
    });
    let chat_id = message.map_or(user_id, |m| m.chat_id);
    let user = UserRef::new(user_id, chat_id).with_language(q.from.language_code.clone());

    let alert = controller
        .handle_event(InboundEvent::<TelegramPhoto>::ButtonPressed {
            user,
            message,
            action_id,
        })
        .await;

    match alert {
        Some(text) => {
            bot.answer_callback_query(q.id.clone())
                .text(text)
                .show_alert(true)
                .await?;
        }
        None => {
            bot.answer_callback_query(q.id.clone()).await?;
        }
    }
    Ok(())
}
