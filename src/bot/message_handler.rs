//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::debug;

// Import localization
use crate::localization::t_lang;

// Import controller types
use crate::controller::InboundEvent;
use crate::session::UserRef;

use super::transport::TelegramPhoto;
use super::ui_builder::{format_help_message, format_welcome_message};
use super::BotController;

/// Identity of the sender; falls back to the chat for anonymous senders
pub fn user_ref_from_message(msg: &Message) -> UserRef {
    let (user_id, language_code) = match msg.from.as_ref() {
        Some(user) => (user.id.0 as i64, user.language_code.clone()),
        None => (msg.chat.id.0, None),
    };
    UserRef::new(user_id, msg.chat.id.0).with_language(language_code)
}

/// Bot command at the start of `text`, without any `@botname` suffix
fn command_of(text: &str) -> Option<&str> {
    let first = text.split_whitespace().next()?;
    let command = first.strip_prefix('/')?;
    Some(command.split('@').next().unwrap_or(command))
}

async fn handle_text_message(
    bot: &Bot,
    msg: &Message,
    text: &str,
    controller: &BotController,
) -> Result<()> {
    let user = user_ref_from_message(msg);

    match command_of(text) {
        Some("start") => {
            debug!(user_id = user.user_id, "Sending welcome message");
            bot.send_message(msg.chat.id, format_welcome_message(user.lang()))
                .await?;
        }
        Some("help") => {
            debug!(user_id = user.user_id, "Sending help message");
            bot.send_message(msg.chat.id, format_help_message(user.lang()))
                .await?;
        }
        _ => {
            debug!(user_id = user.user_id, "Received text message from user");
            controller
                .handle_event(InboundEvent::<TelegramPhoto>::TextMessage {
                    user,
                    text: text.to_string(),
                })
                .await;
        }
    }
    Ok(())
}

async fn handle_photo_message(bot: &Bot, msg: &Message, controller: &BotController) -> Result<()> {
    let user = user_ref_from_message(msg);
    debug!(user_id = user.user_id, "Received photo message from user");

    if let Some(largest_photo) = msg.photo().and_then(|photos| photos.last()) {
        let photo = TelegramPhoto::new(
            bot.clone(),
            largest_photo.file.id.clone(),
            largest_photo.file.size,
        );
        controller
            .handle_event(InboundEvent::PhotoUploaded { user, photo })
            .await;
    }
    Ok(())
}

async fn handle_document_message(
    bot: &Bot,
    msg: &Message,
    controller: &BotController,
) -> Result<()> {
    let user = user_ref_from_message(msg);
    let Some(doc) = msg.document() else {
        return Ok(());
    };

    let is_image = doc
        .mime_type
        .as_ref()
        .is_some_and(|mime| mime.to_string().starts_with("image/"));

    if is_image {
        debug!(user_id = user.user_id, "Received image document from user");
        let photo = TelegramPhoto::new(bot.clone(), doc.file.id.clone(), doc.file.size);
        controller
            .handle_event(InboundEvent::PhotoUploaded { user, photo })
            .await;
    } else {
        debug!(
            user_id = user.user_id,
            mime_type = ?doc.mime_type,
            "Received non-image document from user"
        );
        bot.send_message(msg.chat.id, t_lang("error-unsupported-format", user.lang()))
            .await?;
    }
    Ok(())
}

async fn handle_unsupported_message(bot: &Bot, msg: &Message) -> Result<()> {
    let user = user_ref_from_message(msg);
    debug!(user_id = user.user_id, "Received unsupported message type from user");
    bot.send_message(msg.chat.id, t_lang("unsupported-message", user.lang()))
        .await?;
    Ok(())
}

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    controller: Arc<BotController>,
) -> Result<()> {
    if let Some(text) = msg.text() {
        handle_text_message(&bot, &msg, text, &controller).await?;
    } else if msg.photo().is_some() {
        handle_photo_message(&bot, &msg, &controller).await?;
    } else if msg.document().is_some() {
        handle_document_message(&bot, &msg, &controller).await?;
    } else {
        handle_unsupported_message(&bot, &msg).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(command_of("/start"), Some("start"));
        assert_eq!(command_of("/help@logo_bot extra"), Some("help"));
        assert_eq!(command_of("HELLO"), None);
        assert_eq!(command_of("   "), None);
    }
}
