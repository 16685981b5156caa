//! The set-channel conversation.
//!
//! `/setchannel` opens a short admin-driven exchange: the bot asks for
//! a channel handle and the next text message from the same operator in
//! the same chat is treated as the submission. Invalid submissions keep
//! the exchange open for another try; a successful submission or an
//! explicit `/cancel` ends it.

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::Recipient;
use tracing::info;

use crate::bot::handlers::operator_rejection;
use crate::bot::resilient::send_message_resilient;
use crate::bot::sessions::SessionMap;
use crate::bot::views;
use crate::membership::MembershipChecker;
use crate::storage::ConfigStore;
use crate::utils::retry_telegram_operation;

/// Open a session once the operator checks pass.
///
/// Issued again with a session already open, this simply re-prompts;
/// the existing session is replaced.
pub async fn begin(
    bot: &Bot,
    msg: &Message,
    checker: &MembershipChecker,
    sessions: &SessionMap,
) -> Result<()> {
    if let Some(rejection) = operator_rejection(checker, msg).await {
        send_message_resilient(bot, msg.chat.id, rejection).await?;
        return Ok(());
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    sessions.open(msg.chat.id, user.id).await;
    send_message_resilient(bot, msg.chat.id, views::CHANNEL_PROMPT).await?;
    Ok(())
}

/// Whether `msg` is a submission for an open session.
///
/// True only for non-command text whose author holds an open session in
/// the same chat. The lookup refreshes the session's idle timer, so an
/// operator who keeps trying does not get timed out mid-exchange.
pub async fn has_open_session(msg: Message, sessions: SessionMap) -> bool {
    let Some(user) = msg.from.as_ref() else {
        return false;
    };
    match msg.text() {
        Some(text) if !text.starts_with('/') => sessions.get(msg.chat.id, user.id).await.is_some(),
        _ => false,
    }
}

/// Validate a submitted channel handle and apply it.
///
/// The handle must carry the `@` prefix and resolve to a chat the bot
/// can see. On success the configuration is persisted and the session
/// closed; on either validation failure the session stays open and the
/// operator gets a corrective message.
pub async fn handle_submission(
    bot: &Bot,
    msg: &Message,
    store: &ConfigStore,
    sessions: &SessionMap,
) -> Result<()> {
    let (Some(user), Some(text)) = (msg.from.as_ref(), msg.text()) else {
        return Ok(());
    };

    let submitted = text.trim();
    if !submitted.starts_with('@') {
        send_message_resilient(bot, msg.chat.id, views::CHANNEL_NEEDS_SIGIL).await?;
        return Ok(());
    }

    let resolved = retry_telegram_operation(|| {
        let bot = bot.clone();
        let target = Recipient::ChannelUsername(submitted.to_string());
        async move { bot.get_chat(target).await }
    })
    .await;

    match resolved {
        Ok(chat) => {
            store
                .update(|config| config.required_channel = submitted.to_string())
                .await?;
            sessions.close(msg.chat.id, user.id).await;
            info!("Required channel changed to {submitted} by user {}", user.id);

            let title = chat.title().unwrap_or(submitted);
            send_message_resilient(bot, msg.chat.id, &views::channel_set(title, submitted)).await?;
        }
        Err(e) => {
            send_message_resilient(bot, msg.chat.id, &views::channel_rejected(&e.to_string()))
                .await?;
        }
    }
    Ok(())
}

/// Cancel the operator's open session, if there is one.
///
/// `/cancel` outside an exchange is ignored, like any other command the
/// bot has no use for.
pub async fn cancel(bot: &Bot, msg: &Message, sessions: &SessionMap) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Some(session) = sessions.get(msg.chat.id, user.id).await else {
        return Ok(());
    };

    sessions.close(msg.chat.id, session.operator).await;
    info!(
        "Set-channel exchange in chat {} cancelled by user {}",
        msg.chat.id, session.operator
    );
    send_message_resilient(bot, msg.chat.id, views::CANCELLED).await?;
    Ok(())
}
