//! Tracking of instantiated prefabs
//!
//! Maps every live instance back to the handle that produced it so the
//! instance can later be released by reference.

use std::cell::RefCell;
use std::fmt;

use rustc_hash::FxHashMap;

use super::backend::AddressableBackend;
use super::handle::{OperationHandle, OperationStatus};

/// Stable identity of an instantiated object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Wrap a raw identity token issued by the host
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw identity token
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance:{}", self.0)
    }
}

/// Instance → handle bookkeeping
#[derive(Debug, Default)]
pub struct InstanceTracker {
    entries: RefCell<FxHashMap<InstanceId, OperationHandle<InstanceId>>>,
}

impl InstanceTracker {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed instantiation.
    ///
    /// Returns the produced instance, or `None` if the handle has not
    /// succeeded. Untracked handles stay the caller's to release.
    pub fn track(&self, handle: OperationHandle<InstanceId>) -> Option<InstanceId> {
        if handle.status() != OperationStatus::Succeeded {
            return None;
        }
        let instance = handle.result()?;
        self.entries.borrow_mut().insert(instance, handle);
        Some(instance)
    }

    /// Check whether an instance is tracked
    #[must_use]
    pub fn contains(&self, instance: InstanceId) -> bool {
        self.entries.borrow().contains_key(&instance)
    }

    /// Handle that produced a tracked instance
    #[must_use]
    pub fn handle(&self, instance: InstanceId) -> Option<OperationHandle<InstanceId>> {
        self.entries.borrow().get(&instance).cloned()
    }

    /// Number of tracked instances
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Check whether no instance is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Destroy an instance through the backend and forget its handle.
    ///
    /// The backend is asked to destroy any non-`None` instance, tracked or
    /// not. The return value only tells whether the instance was tracked.
    pub fn release<B: AddressableBackend>(&self, backend: &B, instance: Option<InstanceId>) -> bool {
        let Some(instance) = instance else {
            return false;
        };

        let tracked = self.entries.borrow_mut().remove(&instance);
        backend.release_instance(instance);

        if tracked.is_some() {
            log::debug!("Released tracked {instance}");
            true
        } else {
            log::debug!("Released untracked {instance}");
            false
        }
    }

    /// Release every tracked instance, returning how many there were
    pub fn release_all<B: AddressableBackend>(&self, backend: &B) -> usize {
        let entries = self.entries.take();
        let count = entries.len();

        for handle in entries.into_values() {
            match handle.result() {
                // Destroying the instance also releases its handle
                Some(instance) if backend.instance_exists(instance) => {
                    backend.release_instance(instance);
                }
                _ => {
                    log::debug!("Releasing handle {} of a destroyed instance", handle.id());
                    backend.release(handle);
                }
            }
        }

        count
    }
}
