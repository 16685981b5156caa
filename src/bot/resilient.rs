//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! Thin wrappers around the send/edit/delete calls the gate relies on.
//! Transient network failures are retried with exponential backoff;
//! permanent API rejections surface immediately. The `delete` and
//! `edit ... safe` variants additionally absorb their errors, because
//! the gate treats those side effects as best-effort.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, Message, MessageId};
use teloxide::{ApiError, RequestError};
use tracing::{debug, warn};

use crate::utils::retry_telegram_operation;

/// Send a plain text message with automatic retry on transient failures.
///
/// # Errors
///
/// Returns the underlying request error once retries are exhausted.
pub async fn send_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
) -> Result<Message, RequestError> {
    retry_telegram_operation(|| async { bot.send_message(chat_id, text).await }).await
}

/// Send a text message with an inline keyboard attached.
///
/// # Errors
///
/// Returns the underlying request error once retries are exhausted.
pub async fn send_with_keyboard_resilient(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    keyboard: InlineKeyboardMarkup,
) -> Result<Message, RequestError> {
    retry_telegram_operation(|| async {
        bot.send_message(chat_id, text)
            .reply_markup(keyboard.clone())
            .await
    })
    .await
}

/// Edit a message's text, optionally replacing its inline keyboard.
///
/// # Errors
///
/// Returns the underlying request error once retries are exhausted.
pub async fn edit_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: &str,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<Message, RequestError> {
    retry_telegram_operation(|| async {
        let mut req = bot.edit_message_text(chat_id, msg_id, text);
        if let Some(kb) = keyboard.clone() {
            req = req.reply_markup(kb);
        }
        req.await
    })
    .await
}

/// Edit a message, treating a no-op edit as success.
///
/// A repeated verify press renders the exact same text; Telegram
/// rejects such edits with "message is not modified", which for the
/// gate means the prompt already shows the intended state.
///
/// Returns whether the message now displays the requested content.
pub async fn edit_message_safe_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: &str,
    keyboard: Option<InlineKeyboardMarkup>,
) -> bool {
    match edit_message_resilient(bot, chat_id, msg_id, text, keyboard).await {
        Ok(_) => true,
        Err(RequestError::Api(ApiError::MessageNotModified)) => {
            debug!("Message {} in {chat_id} already up to date", msg_id.0);
            true
        }
        Err(e) => {
            warn!("Failed to edit message {} in {chat_id}: {e}", msg_id.0);
            false
        }
    }
}

/// Delete a message, logging failure instead of propagating it.
///
/// Deletion regularly fails for mundane reasons (the message is already
/// gone, the bot lost its delete permission); the caller continues with
/// its remaining side effects either way.
pub async fn delete_message_resilient(bot: &Bot, chat_id: ChatId, msg_id: MessageId) -> bool {
    match retry_telegram_operation(|| async { bot.delete_message(chat_id, msg_id).await }).await {
        Ok(_) => true,
        Err(e) => {
            warn!("Failed to delete message {} in {chat_id}: {e}", msg_id.0);
            false
        }
    }
}
