//! Open set-channel session tracking
//!
//! Sessions live in a bounded in-memory map keyed by (chat, operator).
//! Nothing is persisted: a restart simply drops whatever was in flight
//! and the operator re-issues the command. Abandoned sessions are
//! evicted once they sit idle past a configured window, so a forgotten
//! `/setchannel` cannot capture the operator's group messages forever.

use std::time::Duration;

use moka::future::Cache;
use teloxide::types::{ChatId, UserId};

/// A set-channel exchange in progress.
///
/// Presence in the map is the state: an entry means the bot is waiting
/// for the operator to submit a channel handle, and a finished exchange
/// is simply removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSession {
    /// Operator the session is bound to; nobody else can advance it
    pub operator: UserId,
}

/// In-memory map of open set-channel sessions.
///
/// Backed by a moka cache with a time-to-idle policy: every lookup of a
/// session refreshes its idle timer, so an exchange stays alive while
/// the operator keeps interacting and silently expires otherwise.
#[derive(Clone)]
pub struct SessionMap {
    cache: Cache<(ChatId, UserId), ChannelSession>,
}

impl SessionMap {
    /// Creates a session map bounded by `max_capacity` entries, each
    /// expiring after `idle` without activity
    #[must_use]
    pub fn new(idle: Duration, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(idle)
            .build();

        Self { cache }
    }

    /// Opens a session for `operator` in `chat`, replacing any previous one
    pub async fn open(&self, chat: ChatId, operator: UserId) {
        let session = ChannelSession { operator };
        self.cache.insert((chat, operator), session).await;
    }

    /// Returns the operator's open session in `chat`, refreshing its idle timer
    pub async fn get(&self, chat: ChatId, operator: UserId) -> Option<ChannelSession> {
        self.cache.get(&(chat, operator)).await
    }

    /// Drops the operator's session in `chat`, if any
    pub async fn close(&self, chat: ChatId, operator: UserId) {
        self.cache.invalidate(&(chat, operator)).await;
    }

    /// Number of sessions currently tracked
    ///
    /// Useful for monitoring; the count may lag behind evictions until
    /// the cache runs its pending maintenance.
    #[must_use]
    pub fn open_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
