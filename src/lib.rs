//! # Logo Telegram Bot
//!
//! A Telegram bot that places styled text on a user's photo, lets the user move,
//! resize, recolor and restyle it through inline buttons, and delivers the final
//! image as a file.

pub mod bot;
pub mod composition;
pub mod config;
pub mod controller;
pub mod controls;
pub mod db;
pub mod errors;
pub mod fonts;
pub mod localization;
pub mod photo_storage;
pub mod session;
pub mod session_store;
