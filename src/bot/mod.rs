//! Conversation logic: commands, keyboards, texts and the session router.

pub mod commands;
pub mod keyboards;
pub mod messages;
pub mod router;

pub use commands::Command;
pub use router::{Route, Router, classify};
