//! Telegram implementations of the controller's transport and photo source seams

use anyhow::{Context, Result};
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, InputMedia, InputMediaPhoto, MessageId};
use tracing::debug;

use crate::controller::Transport;
use crate::controls::ControlSurface;
use crate::photo_storage::PhotoSource;
use crate::session::MessageRef;

use super::ui_builder::build_control_keyboard;

/// Outbound messages through the Bot API
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

impl Transport for TelegramTransport {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &Path,
        caption: &str,
        controls: &ControlSurface,
    ) -> Result<MessageRef> {
        let sent = self
            .bot
            .send_photo(ChatId(chat_id), InputFile::file(photo.to_path_buf()))
            .caption(caption)
            .reply_markup(build_control_keyboard(controls))
            .await?;
        Ok(MessageRef {
            chat_id,
            message_id: sent.id.0,
        })
    }

    async fn edit_photo(
        &self,
        message: MessageRef,
        photo: &Path,
        caption: &str,
        controls: &ControlSurface,
    ) -> Result<()> {
        let media = InputMedia::Photo(
            InputMediaPhoto::new(InputFile::file(photo.to_path_buf())).caption(caption),
        );
        self.bot
            .edit_message_media(ChatId(message.chat_id), MessageId(message.message_id), media)
            .reply_markup(build_control_keyboard(controls))
            .await?;
        Ok(())
    }

    async fn send_document(&self, chat_id: i64, document: &Path, caption: &str) -> Result<()> {
        self.bot
            .send_document(ChatId(chat_id), InputFile::file(document.to_path_buf()))
            .caption(caption)
            .await?;
        Ok(())
    }
}

/// A photo or image document announced by Telegram, downloaded on demand
pub struct TelegramPhoto {
    bot: Bot,
    file_id: FileId,
    declared_size: u64,
}

impl TelegramPhoto {
    pub fn new(bot: Bot, file_id: FileId, declared_size: u32) -> Self {
        Self {
            bot,
            file_id,
            declared_size: u64::from(declared_size),
        }
    }
}

impl PhotoSource for TelegramPhoto {
    fn declared_size(&self) -> u64 {
        self.declared_size
    }

    async fn fetch(self) -> Result<Vec<u8>> {
        download_file(&self.bot, self.file_id).await
    }
}

/// Download a file's bytes from the Bot API file endpoint
pub async fn download_file(bot: &Bot, file_id: FileId) -> Result<Vec<u8>> {
    let file = bot.get_file(file_id).await?;
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot.token(),
        file.path
    );

    let response = reqwest::get(&url)
        .await
        .context("Failed to request file from Telegram")?
        .error_for_status()
        .context("Telegram file endpoint returned an error")?;
    let bytes = response.bytes().await?;

    debug!(bytes = bytes.len(), "File downloaded");
    Ok(bytes.to_vec())
}
