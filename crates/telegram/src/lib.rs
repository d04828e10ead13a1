//! Telegram adapter for the relay: teloxide-based long polling, update
//! conversion, outbound transport, command replies, and notice templates.

pub mod bot;
pub mod commands;
pub mod config;
pub mod convert;
pub mod outbound;
pub mod templates;

pub use {
    bot::{connect, start_polling},
    config::TelegramConfig,
    outbound::TelegramTransport,
    templates::TelegramNotices,
};
