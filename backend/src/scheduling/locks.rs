//! Per-participant serialization of booking writes.
//!
//! Two bookings can only conflict if they share a doctor or a patient, so
//! writes are serialized per participant instead of globally. Each key maps
//! to an async mutex that lives as long as some task holds or waits on it.
//!
//! Keys are always acquired in ascending [`LockKey`] order, which rules out
//! lock-order deadlocks between concurrent bookings.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::{DoctorId, PatientId, PatientIdentity};

/// Something a booking write must hold exclusively.
///
/// Variant order is the acquisition order. `Patient` sorts last so the
/// combined flow can take it after resolving the identity without breaking
/// the global order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    Doctor(DoctorId),
    PatientIdentity(PatientIdentity),
    Patient(PatientId),
}

/// Held locks. Dropping the guard releases them.
#[derive(Debug)]
pub struct BookingGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

#[derive(Debug, Default)]
pub struct BookingLocks {
    slots: Mutex<HashMap<LockKey, Weak<AsyncMutex<()>>>>,
}

impl BookingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &LockKey) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock();
        if let Some(existing) = slots.get(key).and_then(Weak::upgrade) {
            return existing;
        }
        slots.retain(|_, weak| weak.strong_count() > 0);
        let fresh = Arc::new(AsyncMutex::new(()));
        slots.insert(key.clone(), Arc::downgrade(&fresh));
        fresh
    }

    /// Acquire every key, in sorted order, skipping duplicates.
    pub async fn acquire(&self, keys: impl IntoIterator<Item = LockKey>) -> BookingGuard {
        let mut keys: Vec<LockKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            guards.push(self.slot(key).lock_owned().await);
        }
        BookingGuard { _guards: guards }
    }

    /// Acquire additional keys while already holding `held`.
    ///
    /// Callers must only extend with keys that sort after everything in
    /// `held`; [`LockKey::Patient`] satisfies that for the combined flow.
    pub async fn extend(
        &self,
        mut held: BookingGuard,
        keys: impl IntoIterator<Item = LockKey>,
    ) -> BookingGuard {
        let more = self.acquire(keys).await;
        held._guards.extend(more._guards);
        held
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
