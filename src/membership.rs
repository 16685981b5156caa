//! Channel membership lookups
//!
//! Wraps the remote chat-member query and normalizes every failure to an
//! explicit verdict, so gate decisions stay decisive even when Telegram
//! does not answer.

use std::fmt;

use teloxide::prelude::*;
use teloxide::types::{ChatMember, Recipient};
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::utils::retry_telegram_operation;

/// Outcome of a membership lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// Administrator or owner of the chat
    Admin,
    /// Ordinary member
    Member,
    /// Left, banned, restricted, or never joined
    NotMember,
    /// Lookup failed; counts as not subscribed
    Unknown,
}

impl Membership {
    /// Whether this verdict satisfies the subscription requirement
    #[must_use]
    pub const fn is_subscribed(self) -> bool {
        matches!(self, Self::Admin | Self::Member)
    }
}

#[derive(Error, Debug)]
#[error("not a channel reference: {0:?} (expected @handle or numeric chat id)")]
pub struct BadChannelRef(pub String);

/// Reference to the channel users must be subscribed to.
///
/// Public channels are referenced by `@handle`; private channels can only
/// be referenced by their numeric chat identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// Public `@handle`
    Handle(String),
    /// Numeric chat identifier
    Id(ChatId),
}

impl ChannelRef {
    /// Parse a configured channel value.
    ///
    /// # Errors
    ///
    /// Returns an error unless the value is an `@handle` or a numeric
    /// chat identifier.
    pub fn parse(raw: &str) -> Result<Self, BadChannelRef> {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix('@') {
            if rest.is_empty() {
                return Err(BadChannelRef(raw.to_string()));
            }
            return Ok(Self::Handle(raw.to_string()));
        }
        raw.parse::<i64>()
            .map(|id| Self::Id(ChatId(id)))
            .map_err(|_| BadChannelRef(raw.to_string()))
    }

    /// Public join link for the channel, when one can be derived.
    ///
    /// Handles map to `t.me/<handle>`. Supergroup-style numeric ids map
    /// to `t.me/c/<internal id>`; other numeric ids have no public link.
    #[must_use]
    pub fn join_link(&self) -> Option<Url> {
        let target = match self {
            Self::Handle(handle) => handle.trim_start_matches('@').to_string(),
            Self::Id(id) => {
                let raw = id.0.to_string();
                let internal = raw.strip_prefix("-100")?;
                if internal.is_empty() {
                    return None;
                }
                format!("c/{internal}")
            }
        };
        Url::parse(&format!("https://t.me/{target}")).ok()
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handle(handle) => f.write_str(handle),
            Self::Id(id) => write!(f, "{}", id.0),
        }
    }
}

impl From<&ChannelRef> for Recipient {
    fn from(channel: &ChannelRef) -> Self {
        match channel {
            ChannelRef::Handle(handle) => Self::ChannelUsername(handle.clone()),
            ChannelRef::Id(id) => Self::Id(*id),
        }
    }
}

/// Membership lookups with failures normalized to [`Membership::Unknown`]
#[derive(Clone)]
pub struct MembershipChecker {
    bot: Bot,
}

impl MembershipChecker {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// The user's standing in the required channel
    pub async fn channel_standing(&self, channel: &ChannelRef, user: UserId) -> Membership {
        self.standing(Recipient::from(channel), user).await
    }

    /// The user's standing in an ordinary chat (used for admin checks)
    pub async fn chat_standing(&self, chat: ChatId, user: UserId) -> Membership {
        self.standing(Recipient::Id(chat), user).await
    }

    async fn standing(&self, target: Recipient, user: UserId) -> Membership {
        let lookup = retry_telegram_operation(|| {
            let bot = self.bot.clone();
            let target = target.clone();
            async move { bot.get_chat_member(target, user).await }
        })
        .await;

        match lookup {
            Ok(member) => verdict(&member),
            Err(e) => {
                warn!("Membership lookup for user {user} in {target:?} failed: {e}");
                Membership::Unknown
            }
        }
    }
}

fn verdict(member: &ChatMember) -> Membership {
    if member.kind.is_privileged() {
        Membership::Admin
    } else if member.kind.is_member() {
        Membership::Member
    } else {
        Membership::NotMember
    }
}
