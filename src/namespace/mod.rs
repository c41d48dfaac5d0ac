//! Per-namespace cache of the last known configuration state.
//!
//! `release_key` and `configs` are published together through one
//! [`ArcSwap`], so a reader sees either the old pair or the new pair and
//! never a mix. The notification id lives in its own atomic: it only feeds
//! request construction and is never read together with the configs.


use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::constants::INITIAL_NOTIFICATION_ID;
use crate::ConfigMap;

/// Immutable `(release_key, configs)` pair as last committed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceSnapshot {
    /// Opaque server-issued version token, empty before the first load
    pub release_key: String,
    pub configs: ConfigMap,
}

#[derive(Debug)]
pub struct NamespaceState {
    snapshot: ArcSwap<NamespaceSnapshot>,
    notification_id: AtomicI64,
}

impl Default for NamespaceState {
    fn default() -> Self {
        Self::new(String::new(), INITIAL_NOTIFICATION_ID)
    }
}

impl NamespaceState {
    pub fn new(
        release_key: String,
        notification_id: i64,
    ) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(NamespaceSnapshot {
                release_key,
                configs: ConfigMap::new(),
            }),
            notification_id: AtomicI64::new(notification_id),
        }
    }

    /// Returns an independent copy of the committed pair.
    pub fn get(&self) -> (String, ConfigMap) {
        let snapshot = self.snapshot.load();
        (snapshot.release_key.clone(), snapshot.configs.clone())
    }

    /// Shared view of the committed pair, without copying the map.
    pub fn snapshot(&self) -> Arc<NamespaceSnapshot> {
        self.snapshot.load_full()
    }

    pub fn release_key(&self) -> String {
        self.snapshot.load().release_key.clone()
    }

    pub fn configs(&self) -> ConfigMap {
        self.snapshot.load().configs.clone()
    }

    /// Publishes a new pair in one store.
    pub fn set(
        &self,
        release_key: String,
        configs: ConfigMap,
    ) {
        self.snapshot.store(Arc::new(NamespaceSnapshot { release_key, configs }));
    }

    pub fn notification_id(&self) -> i64 {
        // Relaxed: the id orders nothing else, it only shapes the next request.
        self.notification_id.load(Ordering::Relaxed)
    }

    pub fn set_notification_id(
        &self,
        notification_id: i64,
    ) {
        self.notification_id.store(notification_id, Ordering::Relaxed);
    }
}
