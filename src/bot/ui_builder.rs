//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::controls::ControlSurface;
use crate::localization::t_lang;

/// Convert the transport-neutral control surface into an inline keyboard
pub fn build_control_keyboard(controls: &ControlSurface) -> InlineKeyboardMarkup {
    let rows = controls
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|c| InlineKeyboardButton::callback(c.label.clone(), c.action_id.clone()))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(rows)
}

/// Message sent for /start
pub fn format_welcome_message(language_code: Option<&str>) -> String {
    format!(
        "👋 {}\n\n{}\n\n{}",
        t_lang("welcome-title", language_code),
        t_lang("welcome-description", language_code),
        t_lang("welcome-send-image", language_code)
    )
}

/// Message sent for /help
pub fn format_help_message(language_code: Option<&str>) -> String {
    format!(
        "ℹ️ {}\n\n{}\n{}\n{}\n{}",
        t_lang("help-title", language_code),
        t_lang("help-step1", language_code),
        t_lang("help-step2", language_code),
        t_lang("help-step3", language_code),
        t_lang("help-step4", language_code)
    )
}
