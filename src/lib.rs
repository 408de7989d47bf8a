//! Numerologist, a Telegram bot that collects a profile and asks a
//! completion service for a numerology forecast.

pub mod bot;
pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod profile;
pub mod store;
