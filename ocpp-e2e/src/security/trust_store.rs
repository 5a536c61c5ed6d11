//! Public keys trusted for verification

use std::collections::BTreeSet;

use parking_lot::RwLock;
use tracing::info;

use crate::crypto::{CurveAlgorithm, PublicKey};

/// A trusted public key and the actions it may sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedKey {
    public_key: PublicKey,
    /// Empty means every action
    actions: BTreeSet<String>,
}

impl TrustedKey {
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            actions: BTreeSet::new(),
        }
    }

    pub fn for_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(String::as_str)
    }

    pub fn authorizes(&self, action: &str) -> bool {
        self.actions.is_empty() || self.actions.contains(action) || self.actions.contains("*")
    }

    fn same_point(&self, other: &PublicKey) -> bool {
        self.public_key.verifying_key() == other.verifying_key()
    }
}

/// Shared set of trusted keys. Keys may be added while verification runs.
///
/// Entries are identified by the decoded curve point, so the same key
/// published in another encoding or serialization is one entry.
#[derive(Debug, Default)]
pub struct TrustStore {
    keys: RwLock<Vec<TrustedKey>>,
}

/// Point-in-time copy of the entries
impl Clone for TrustStore {
    fn clone(&self) -> Self {
        Self {
            keys: RwLock::new(self.keys.read().clone()),
        }
    }
}

impl TrustStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(self, key: TrustedKey) -> Self {
        self.add(key);
        self
    }

    /// Add a key, replacing an existing entry for the same public key.
    pub fn add(&self, key: TrustedKey) {
        let mut keys = self.keys.write();
        let id = key.public_key.short_id();
        if let Some(existing) = keys.iter_mut().find(|k| k.same_point(&key.public_key)) {
            *existing = key;
            info!("Updated trusted key {}", id);
        } else {
            keys.push(key);
            info!("Trusted key {} ({} keys)", id, keys.len());
        }
    }

    pub fn remove(&self, public_key: &PublicKey) -> bool {
        let mut keys = self.keys.write();
        let before = keys.len();
        keys.retain(|k| !k.same_point(public_key));
        let removed = keys.len() != before;
        if removed {
            info!("Removed trusted key {}", public_key.short_id());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Entries whose key matches `key_id`, on `algorithm` when one is given
    /// and on any curve otherwise.
    pub fn candidates(&self, key_id: &[u8], algorithm: Option<&CurveAlgorithm>) -> Vec<TrustedKey> {
        self.keys
            .read()
            .iter()
            .filter(|k| algorithm.map_or(true, |a| k.public_key.algorithm() == a))
            .filter(|k| k.public_key.matches_key_id(key_id))
            .cloned()
            .collect()
    }

    pub fn snapshot(&self) -> Vec<TrustedKey> {
        self.keys.read().clone()
    }
}
