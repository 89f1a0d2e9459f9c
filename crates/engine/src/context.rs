//! # Resolution Context
//!
//! The [`Context`] is the session-scoped store of named values that resolvers
//! read from. Entries are either ready values or pending resolutions; a pending
//! entry is a shared future, so any number of lookups await the same single
//! resolution.
//!
//! The store is append-only: once a key is set it may only be "set again" to an
//! identical value.
//!
//! Lookups accept dotted paths. `request.headers.host` first tries the exact key,
//! then the longest prefix that exists (`request.headers`, then `request`) and
//! walks the remainder into that value.

use std::{collections::HashMap, fmt};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::{error::ResolveError, values::select_path};

type PendingValue = Shared<BoxFuture<'static, Result<Value, ResolveError>>>;

#[derive(Clone)]
enum ContextEntry {
    Ready(Value),
    Pending(PendingValue),
}

/// Session-scoped store of resolved and pending values.
#[derive(Default)]
pub struct Context {
    entries: RwLock<HashMap<String, ContextEntry>>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry_count = self.entries.try_read().map(|entries| entries.len()).ok();
        f.debug_struct("Context").field("entry_count", &entry_count).finish()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a context with ready values.
    pub fn from_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        let entries = values.into_iter().map(|(key, value)| (key, ContextEntry::Ready(value))).collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Look up a value by key, awaiting it if its resolution is still pending.
    ///
    /// # Errors
    /// [`ResolveError::KeyNotFound`] when neither the key nor any dotted prefix
    /// of it was seeded, or when the remaining path does not exist in the value.
    /// A failed pending resolution yields that resolution's error.
    pub async fn get(&self, key: &str) -> Result<Value, ResolveError> {
        let (entry, remainder) = {
            let entries = self.entries.read().await;
            let Some((entry, remainder)) = lookup_entry(&entries, key) else {
                trace!(key, "context lookup missed");
                return Err(ResolveError::key_not_found(key));
            };
            (entry.clone(), remainder)
        };

        let value = match entry {
            ContextEntry::Ready(value) => value,
            ContextEntry::Pending(pending) => {
                trace!(key, "awaiting pending context entry");
                pending.await?
            }
        };

        match remainder {
            None => Ok(value),
            Some(path) => select_path(&value, path).cloned().ok_or_else(|| ResolveError::key_not_found(key)),
        }
    }

    /// Add a ready value.
    ///
    /// # Errors
    /// [`ResolveError::ContextConflict`] when the key already holds a different
    /// value or a pending resolution.
    pub async fn set(&self, key: impl Into<String>, value: Value) -> Result<(), ResolveError> {
        let key = key.into();
        let mut entries = self.entries.write().await;
        match entries.get(&key) {
            Some(ContextEntry::Ready(existing)) if *existing == value => Ok(()),
            Some(_) => Err(ResolveError::ContextConflict { key }),
            None => {
                debug!(key = %key, "context value added");
                entries.insert(key, ContextEntry::Ready(value));
                Ok(())
            }
        }
    }

    /// Register a resolution that lookups of `key` will await.
    ///
    /// The future is not polled until the first lookup; it then runs once and
    /// every lookup observes its result.
    pub async fn set_pending(&self, key: impl Into<String>, resolution: BoxFuture<'static, Result<Value, ResolveError>>) -> Result<(), ResolveError> {
        let key = key.into();
        let mut entries = self.entries.write().await;
        if entries.contains_key(&key) {
            return Err(ResolveError::ContextConflict { key });
        }
        debug!(key = %key, "pending context entry registered");
        entries.insert(key, ContextEntry::Pending(resolution.shared()));
        Ok(())
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Drop pending entries whose resolution has not produced a value.
    ///
    /// Pending futures hold the session that owns this context; dropping them
    /// releases that session after an aborted resolution.
    pub(crate) async fn discard_pending(&self) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| match entry {
            ContextEntry::Ready(_) => true,
            ContextEntry::Pending(pending) => matches!(pending.peek(), Some(Ok(_))),
        });
    }
}

fn lookup_entry<'a, 'k>(entries: &'a HashMap<String, ContextEntry>, key: &'k str) -> Option<(&'a ContextEntry, Option<&'k str>)> {
    if let Some(entry) = entries.get(key) {
        return Some((entry, None));
    }
    key.rmatch_indices('.').find_map(|(index, _)| {
        let prefix = &key[..index];
        entries.get(prefix).map(|entry| (entry, Some(&key[index + 1..])))
    })
}
