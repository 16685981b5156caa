//! Channel-subscription gate for Telegram groups.
//!
//! Deletes group messages posted by users who are not subscribed to a
//! required channel and points them at a subscribe → verify flow.
//! Group administrators reconfigure the required channel and the prompt
//! texts through bot commands.

/// Telegram handlers, command routing, and the set-channel conversation
pub mod bot;
/// Process settings loaded from the environment
pub mod config;
/// Admission decisions and deny-path side effects
pub mod gate;
/// Channel membership lookups and channel references
pub mod membership;
/// Persisted gate configuration document
pub mod storage;
/// Shared Telegram API helpers
pub mod utils;
