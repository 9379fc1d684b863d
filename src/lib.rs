//! Token Mention Alert Bot
//!
//! Watches Telegram chatter and on-chain swap logs for token mentions,
//! enriches them through market-data providers, and posts alerts.

pub mod broadcast;
pub mod config;
pub mod detection;
pub mod error;
pub mod events;
pub mod keys;
pub mod providers;
pub mod queue;
pub mod storage;
pub mod types;
