//! Address-keyed handle cache
//!
//! [`HandleCache`] loads addressable assets once per key and keeps the
//! handle until the key is released or the cache is torn down. Prefab
//! instantiations are never cached by key; each produces a new instance
//! tracked by an [`InstanceTracker`] instead.
//!
//! # Example
//!
//! ```ignore
//! let cache = HandleCache::new(backend);
//!
//! let texture = cache.load_asset::<Texture>("brick_texture").await?;
//! let enemy = cache.instantiate("enemy_prefab", None, false).await?;
//!
//! cache.release_instance(Some(enemy));
//! cache.release_asset("brick_texture");
//! ```

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::backend::AddressableBackend;
use super::error::{AssetError, is_blank};
use super::handle::{AssetRef, AssetType, OperationHandle, OperationStatus, downcast_asset};
use super::instances::{InstanceId, InstanceTracker};

/// Cache of addressable load handles plus the instances spawned through it.
///
/// All operations take `&self`; state lives in `RefCell`s that are never
/// borrowed across an await point, so several loads can be in flight on the
/// same cache at once.
pub struct HandleCache<B: AddressableBackend> {
    backend: B,
    /// Completed load handles by address
    assets: RefCell<FxHashMap<String, OperationHandle<AssetRef>>>,
    instances: InstanceTracker,
    closed: Cell<bool>,
}

impl<B: AddressableBackend> HandleCache<B> {
    /// Create an empty cache over the given backend
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            assets: RefCell::new(FxHashMap::default()),
            instances: InstanceTracker::new(),
            closed: Cell::new(false),
        }
    }

    /// Backend the cache issues its requests to
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Load the asset at `key`, reusing the cached handle if there is one.
    ///
    /// # Errors
    ///
    /// - [`AssetError::InvalidKey`] for a blank key, before any backend call
    /// - [`AssetError::LoadFailure`] if the backend fails; the handle is released
    /// - [`AssetError::TypeMismatch`] if the asset is not a `T`
    /// - [`AssetError::Closed`] after [`teardown`](Self::teardown)
    pub async fn load_asset<T: Any>(&self, key: &str) -> Result<Rc<T>, AssetError> {
        if is_blank(key) {
            return Err(AssetError::InvalidKey);
        }
        if self.closed.get() {
            return Err(AssetError::Closed);
        }

        if let Some(asset) = self.cached(key) {
            log::debug!("Cache hit for '{key}'");
            return Self::typed(key, asset);
        }

        log::debug!("Loading '{key}' as {}", AssetType::of::<T>());
        let handle = self.backend.load_by_key(key, AssetType::of::<T>());
        handle.completion().await;

        let asset = match (handle.status(), handle.result()) {
            (OperationStatus::Succeeded, Some(asset)) => asset,
            _ => {
                log::warn!(
                    "Load of '{key}' failed: {}",
                    handle.error().unwrap_or_default()
                );
                self.backend.release(handle);
                return Err(AssetError::LoadFailure {
                    key: key.to_owned(),
                });
            }
        };

        if self.closed.get() {
            self.backend.release(handle);
            return Err(AssetError::Closed);
        }

        // A duplicate request for the same key may have finished first
        if let Some(existing) = self.cached(key) {
            log::debug!("Dropping duplicate load of '{key}'");
            self.backend.release(handle);
            return Self::typed(key, existing);
        }

        self.assets.borrow_mut().insert(key.to_owned(), handle);
        Self::typed(key, asset)
    }

    /// Instantiate the prefab at `key` and track the new instance.
    ///
    /// Every call issues a fresh backend request.
    ///
    /// # Errors
    ///
    /// - [`AssetError::InvalidKey`] for a blank key, before any backend call
    /// - [`AssetError::InstantiateFailure`] if the backend fails; the handle is released
    /// - [`AssetError::Closed`] after [`teardown`](Self::teardown)
    pub async fn instantiate(
        &self,
        key: &str,
        parent: Option<InstanceId>,
        keep_world_space: bool,
    ) -> Result<InstanceId, AssetError> {
        if is_blank(key) {
            return Err(AssetError::InvalidKey);
        }
        if self.closed.get() {
            return Err(AssetError::Closed);
        }

        let handle = self
            .backend
            .instantiate_by_key(key, parent, keep_world_space);
        handle.completion().await;

        let Some(instance) = self.instances.track(handle.clone()) else {
            log::warn!(
                "Instantiation of '{key}' failed: {}",
                handle.error().unwrap_or_default()
            );
            self.backend.release(handle);
            return Err(AssetError::InstantiateFailure {
                key: key.to_owned(),
            });
        };

        if self.closed.get() {
            self.instances.release(&self.backend, Some(instance));
            return Err(AssetError::Closed);
        }

        log::debug!("Instantiated '{key}' as {instance}");
        Ok(instance)
    }

    /// Release the handle cached for `key`.
    ///
    /// Returns `false` without touching anything if the key is not cached.
    pub fn release_asset(&self, key: &str) -> bool {
        let removed = self.assets.borrow_mut().remove(key);
        match removed {
            Some(handle) => {
                log::debug!("Releasing '{key}'");
                self.backend.release(handle);
                true
            }
            None => false,
        }
    }

    /// Destroy an instance and stop tracking it.
    ///
    /// See [`InstanceTracker::release`].
    pub fn release_instance(&self, instance: Option<InstanceId>) -> bool {
        self.instances.release(&self.backend, instance)
    }

    /// Release every cached handle and every tracked instance.
    ///
    /// Safe to call more than once; later calls find nothing to release.
    /// Loads still in flight release their handle when they complete.
    pub fn teardown(&self) {
        self.closed.set(true);

        let assets = self.assets.take();
        let asset_count = assets.len();
        for handle in assets.into_values() {
            self.backend.release(handle);
        }

        let instance_count = self.instances.release_all(&self.backend);
        if asset_count > 0 || instance_count > 0 {
            log::debug!("Teardown released {asset_count} assets and {instance_count} instances");
        }
    }

    /// Check whether `key` has a cached handle
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.assets.borrow().contains_key(key)
    }

    /// Number of cached asset handles
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.assets.borrow().len()
    }

    /// Number of tracked instances
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Tracker holding every live instance spawned through this cache
    #[must_use]
    pub fn instances(&self) -> &InstanceTracker {
        &self.instances
    }

    /// Check whether the cache has been torn down
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    fn cached(&self, key: &str) -> Option<AssetRef> {
        self.assets.borrow().get(key).and_then(OperationHandle::result)
    }

    fn typed<T: Any>(key: &str, asset: AssetRef) -> Result<Rc<T>, AssetError> {
        downcast_asset::<T>(asset).ok_or_else(|| AssetError::TypeMismatch {
            key: key.to_owned(),
            expected: std::any::type_name::<T>(),
        })
    }
}

impl<B: AddressableBackend> Drop for HandleCache<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<B: AddressableBackend> std::fmt::Debug for HandleCache<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandleCache")
            .field("cached", &self.cached_count())
            .field("instances", &self.instance_count())
            .field("closed", &self.closed.get())
            .finish()
    }
}
