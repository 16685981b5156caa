//! Admission decisions and deny-path side effects
//!
//! Every gated group message gets an allow/deny decision. Denied
//! messages are removed from the group and their author is pointed, in
//! private, at the required channel with a subscribe link and a verify
//! button. The verify button re-checks membership on every press and
//! edits the prompt in place.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::{info, warn};

use crate::bot::resilient::{
    delete_message_resilient, edit_message_safe_resilient, send_with_keyboard_resilient,
};
use crate::bot::views;
use crate::membership::{ChannelRef, Membership, MembershipChecker};
use crate::storage::{ConfigStore, GateConfig};
use crate::utils::retry_telegram_operation;

/// The subscription gate.
///
/// Holds the pieces every decision needs: the bot for side effects, the
/// configuration snapshot source, and the membership checker. Decisions
/// are independent of each other; no state is carried between messages.
#[derive(Clone)]
pub struct SubscriptionGate {
    bot: Bot,
    store: Arc<ConfigStore>,
    checker: MembershipChecker,
}

impl SubscriptionGate {
    #[must_use]
    pub fn new(bot: Bot, store: Arc<ConfigStore>, checker: MembershipChecker) -> Self {
        Self {
            bot,
            store,
            checker,
        }
    }

    /// Decide admission for a group message and apply side effects.
    ///
    /// Private chats are never gated. Admins of the posting group are
    /// exempt from the subscription requirement; a failed role lookup
    /// only means "not exempt" and the membership check still runs. On
    /// deny, the delete and the private notification are independent
    /// best-effort steps: either may fail without blocking the other.
    pub async fn admit(&self, msg: &Message) {
        if msg.chat.is_private() {
            return;
        }
        let Some(user) = msg.from.as_ref() else {
            // Channel posts and service messages have no author to check
            return;
        };

        if self.checker.chat_standing(msg.chat.id, user.id).await == Membership::Admin {
            return;
        }

        let config = self.store.snapshot();
        let (verdict, channel) = self.channel_verdict(&config, user.id).await;
        if verdict.is_subscribed() {
            return;
        }

        info!(
            "Removing message {} from unsubscribed user {} in chat {}",
            msg.id.0, user.id, msg.chat.id
        );
        delete_message_resilient(&self.bot, msg.chat.id, msg.id).await;

        let keyboard =
            views::subscription_keyboard(channel.as_ref().and_then(ChannelRef::join_link));
        let private = ChatId(user.id.0.cast_signed());
        if let Err(e) =
            send_with_keyboard_resilient(&self.bot, private, &config.not_subscribed_message, keyboard)
                .await
        {
            warn!("Failed to notify user {} in private: {e}", user.id);
        }
    }

    /// Re-check subscription from the verify button and update the
    /// prompt in place.
    ///
    /// Safe to press any number of times: membership and configuration
    /// are re-read on every invocation, and rendering an unchanged
    /// prompt counts as success.
    pub async fn verify(&self, query: &CallbackQuery) {
        // Answer first so the client stops its loading spinner even if
        // the rest of the flow fails
        let answer = retry_telegram_operation(|| {
            let bot = self.bot.clone();
            let id = query.id.clone();
            async move { bot.answer_callback_query(id).await }
        })
        .await;
        if let Err(e) = answer {
            warn!("Failed to answer callback query: {e}");
        }

        let Some(prompt) = query.message.as_ref() else {
            // Telegram no longer references the original prompt
            return;
        };

        let config = self.store.snapshot();
        let (verdict, channel) = self.channel_verdict(&config, query.from.id).await;

        if verdict.is_subscribed() {
            edit_message_safe_resilient(
                &self.bot,
                prompt.chat().id,
                prompt.id(),
                &config.subscribed_message,
                None,
            )
            .await;
        } else {
            let keyboard =
                views::subscription_keyboard(channel.as_ref().and_then(ChannelRef::join_link));
            edit_message_safe_resilient(
                &self.bot,
                prompt.chat().id,
                prompt.id(),
                &config.not_subscribed_message,
                Some(keyboard),
            )
            .await;
        }
    }

    /// The user's standing in the configured channel, failing closed.
    ///
    /// An unparseable configured value behaves like a failed lookup:
    /// the verdict is Unknown and no join link can be offered.
    async fn channel_verdict(
        &self,
        config: &GateConfig,
        user: UserId,
    ) -> (Membership, Option<ChannelRef>) {
        match ChannelRef::parse(&config.required_channel) {
            Ok(channel) => {
                let verdict = self.checker.channel_standing(&channel, user).await;
                (verdict, Some(channel))
            }
            Err(e) => {
                warn!("Configured channel is unusable, denying by default: {e}");
                (Membership::Unknown, None)
            }
        }
    }
}
