//! Persisted gate configuration
//!
//! One JSON document on disk holds the whole gate configuration. It is
//! loaded once at startup and rewritten on every mutation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Gate configuration document
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Channel every participant must be subscribed to (`@handle` or numeric id)
    #[serde(default = "default_required_channel")]
    pub required_channel: String,
    /// Greeting sent by /start in private conversations
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
    /// Notice sent to users whose group message was removed
    #[serde(default = "default_not_subscribed_message")]
    pub not_subscribed_message: String,
    /// Confirmation shown once a verify check passes
    #[serde(default = "default_subscribed_message")]
    pub subscribed_message: String,
    /// Group the gate is deployed for, informational only
    #[serde(default = "default_target_group")]
    pub target_group: String,
}

fn default_required_channel() -> String {
    "@your_channel".to_string()
}

fn default_welcome_message() -> String {
    "مرحباً! يجب عليك الاشتراك في القناة المطلوبة أولاً.".to_string()
}

fn default_not_subscribed_message() -> String {
    "عذراً، يجب عليك الاشتراك في القناة المطلوبة أولاً للتفاعل في هذه المجموعة.".to_string()
}

fn default_subscribed_message() -> String {
    "شكراً لاشتراكك! يمكنك الآن التفاعل في المجموعة.".to_string()
}

fn default_target_group() -> String {
    "@workinegypt9".to_string()
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            required_channel: default_required_channel(),
            welcome_message: default_welcome_message(),
            not_subscribed_message: default_not_subscribed_message(),
            subscribed_message: default_subscribed_message(),
            target_group: default_target_group(),
        }
    }
}

/// Shared handle to the persisted configuration.
///
/// Reads take a cheap pointer clone and never wait on a write in
/// progress. Writes are serialized: the mutate+persist section runs
/// under a single lock so two simultaneous admin edits cannot lose an
/// update, and the in-memory document only advances once the disk
/// write succeeded.
pub struct ConfigStore {
    path: PathBuf,
    current: RwLock<Arc<GateConfig>>,
    persist: Mutex<()>,
}

impl ConfigStore {
    /// Open the configuration document at `path`
    ///
    /// A missing document is created with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read, parsed, or created.
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        let config = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Configuration file {} not found, creating it with defaults",
                    path.display()
                );
                let defaults = GateConfig::default();
                tokio::fs::write(&path, serde_json::to_string_pretty(&defaults)?).await?;
                defaults
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            current: RwLock::new(Arc::new(config)),
            persist: Mutex::new(()),
        })
    }

    /// Returns the most recently persisted configuration
    #[must_use]
    pub fn snapshot(&self) -> Arc<GateConfig> {
        let guard = self
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Atomically modify the configuration using a closure and persist it.
    ///
    /// Returns the new configuration on success. If the disk write
    /// fails the in-memory configuration is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the disk write fails.
    pub async fn update<F>(&self, modifier: F) -> Result<Arc<GateConfig>, StoreError>
    where
        F: FnOnce(&mut GateConfig),
    {
        let _persist = self.persist.lock().await;

        let mut next = self.snapshot().as_ref().clone();
        modifier(&mut next);
        tokio::fs::write(&self.path, serde_json::to_string_pretty(&next)?).await?;

        let next = Arc::new(next);
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::clone(&next);
        Ok(next)
    }
}
