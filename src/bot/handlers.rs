//! Command routing and handlers.
//!
//! [`dispatch_tree`] is the single routing surface: callbacks first,
//! then commands, then open set-channel sessions, and finally the
//! subscription gate for ordinary group text. Endpoints log their
//! errors and keep the dispatcher running.

use std::sync::Arc;

use anyhow::Result;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::utils::command::BotCommands;
use tracing::error;

use crate::bot::resilient::{send_message_resilient, send_with_keyboard_resilient};
use crate::bot::sessions::SessionMap;
use crate::bot::{setchannel, views};
use crate::gate::SubscriptionGate;
use crate::membership::{ChannelRef, Membership, MembershipChecker};
use crate::storage::ConfigStore;

/// Commands understood by the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Greeting plus the subscribe/verify actions
    #[command(description = "بدء التفاعل مع البوت")]
    Start,
    /// Opens the set-channel exchange (group admins only)
    #[command(description = "تعيين القناة المطلوبة")]
    SetChannel,
    /// Replaces the not-subscribed notice (group admins only)
    #[command(description = "تعيين رسالة التنبيه")]
    SetMessage(String),
    /// Shows the current configuration (group admins only)
    #[command(description = "عرض حالة البوت")]
    Status,
    /// Cancels an open set-channel exchange
    #[command(description = "إلغاء العملية الحالية")]
    Cancel,
}

/// Build the update dispatch tree.
///
/// Branch order is significant: commands are matched before session
/// submissions so a command is never mistaken for a channel handle, and
/// the gate branch comes last so it only sees ordinary group text.
/// Slash-text that matches no known command falls through every branch
/// and is ignored, gate included.
#[must_use]
pub fn dispatch_tree() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_callback_query()
                .filter(|q: CallbackQuery| {
                    q.data.as_deref() == Some(views::CHECK_SUBSCRIPTION_CALLBACK)
                })
                .endpoint(handle_verify_callback),
        )
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter_async(setchannel::has_open_session)
                        .endpoint(handle_session_submission),
                )
                .branch(
                    dptree::filter(|msg: Message| {
                        !msg.chat.is_private() && msg.text().is_some_and(|t| !t.starts_with('/'))
                    })
                    .endpoint(handle_group_message),
                ),
        )
}

async fn handle_verify_callback(
    gate: SubscriptionGate,
    q: CallbackQuery,
) -> Result<(), teloxide::RequestError> {
    gate.verify(&q).await;
    respond(())
}

async fn handle_group_message(
    gate: SubscriptionGate,
    msg: Message,
) -> Result<(), teloxide::RequestError> {
    gate.admit(&msg).await;
    respond(())
}

async fn handle_session_submission(
    bot: Bot,
    msg: Message,
    store: Arc<ConfigStore>,
    sessions: SessionMap,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = setchannel::handle_submission(&bot, &msg, &store, &sessions).await {
        error!("Set-channel submission error: {e}");
    }
    respond(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    store: Arc<ConfigStore>,
    checker: MembershipChecker,
    sessions: SessionMap,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => start(&bot, &msg, &store).await,
        Command::SetChannel => setchannel::begin(&bot, &msg, &checker, &sessions).await,
        Command::SetMessage(text) => set_message(&bot, &msg, &checker, &store, &text).await,
        Command::Status => status(&bot, &msg, &checker, &store).await,
        Command::Cancel => setchannel::cancel(&bot, &msg, &sessions).await,
    };
    if let Err(e) = res {
        error!("Command error: {e}");
    }
    respond(())
}

/// Operator gate for configuration commands: group chats only, group
/// admins only.
///
/// Returns the rejection text to reply with, or `None` when the invoker
/// may proceed. An unresolved role lookup rejects rather than allows.
pub async fn operator_rejection(
    checker: &MembershipChecker,
    msg: &Message,
) -> Option<&'static str> {
    if msg.chat.is_private() {
        return Some(views::GROUPS_ONLY);
    }
    let Some(user) = msg.from.as_ref() else {
        return Some(views::ROLE_CHECK_FAILED);
    };
    match checker.chat_standing(msg.chat.id, user.id).await {
        Membership::Admin => None,
        Membership::Unknown => Some(views::ROLE_CHECK_FAILED),
        Membership::Member | Membership::NotMember => Some(views::ADMINS_ONLY),
    }
}

/// Greet the user and show the subscribe/verify actions
async fn start(bot: &Bot, msg: &Message, store: &ConfigStore) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    let config = store.snapshot();
    let channel = ChannelRef::parse(&config.required_channel).ok();
    let keyboard = views::subscription_keyboard(channel.as_ref().and_then(ChannelRef::join_link));

    let greeting = views::greeting(&user.first_name, &config.welcome_message);
    send_with_keyboard_resilient(bot, msg.chat.id, &greeting, keyboard).await?;
    Ok(())
}

/// Replace the not-subscribed notice with the command's argument
async fn set_message(
    bot: &Bot,
    msg: &Message,
    checker: &MembershipChecker,
    store: &ConfigStore,
    text: &str,
) -> Result<()> {
    if let Some(rejection) = operator_rejection(checker, msg).await {
        send_message_resilient(bot, msg.chat.id, rejection).await?;
        return Ok(());
    }

    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        send_message_resilient(bot, msg.chat.id, views::SET_MESSAGE_USAGE).await?;
        return Ok(());
    }

    store
        .update(|config| config.not_subscribed_message = text.clone())
        .await?;
    send_message_resilient(bot, msg.chat.id, &views::message_set(&text)).await?;
    Ok(())
}

/// Report the current configuration to a group admin
async fn status(
    bot: &Bot,
    msg: &Message,
    checker: &MembershipChecker,
    store: &ConfigStore,
) -> Result<()> {
    if let Some(rejection) = operator_rejection(checker, msg).await {
        send_message_resilient(bot, msg.chat.id, rejection).await?;
        return Ok(());
    }

    send_message_resilient(bot, msg.chat.id, &views::status_report(&store.snapshot())).await?;
    Ok(())
}
