//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules for better organization:
//! - `message_handler`: Handles commands, text, photo, and document messages
//! - `callback_handler`: Handles adjustment keyboard callback queries
//! - `ui_builder`: Creates keyboards and formats messages
//! - `transport`: Bot API implementations of the controller's outbound seams

pub mod callback_handler;
pub mod message_handler;
pub mod transport;
pub mod ui_builder;

use crate::controller::SessionController;
use crate::session_store::SessionBackend;

/// Controller wired to the runtime-selected store and the Telegram transport
pub type BotController = SessionController<SessionBackend, transport::TelegramTransport>;

// Re-export main handler functions for use in main.rs
pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

pub use transport::{download_file, TelegramPhoto, TelegramTransport};
pub use ui_builder::build_control_keyboard;
