//! Path-keyed resource loader
//!
//! Caches everything loaded from a folder-based [`ResourceBackend`] so that
//! repeated calls are served from memory, and lets callers drop entries (and
//! optionally the engine-side objects) when they are no longer needed.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::backend::ResourceBackend;
use super::error::{ResourceError, is_blank};
use super::handle::{AssetRef, AssetType, downcast_asset};
use crate::core::Spawner;

struct LoaderShared<B> {
    backend: B,
    cache: RefCell<FxHashMap<String, AssetRef>>,
}

impl<B: ResourceBackend> LoaderShared<B> {
    fn cached(&self, path: &str) -> Option<AssetRef> {
        self.cache.borrow().get(path).cloned()
    }

    fn store(&self, path: &str, asset: &AssetRef) {
        self.cache
            .borrow_mut()
            .insert(path.to_owned(), Rc::clone(asset));
    }

    async fn load_async<T: Any>(&self, path: &str) -> Option<Rc<T>> {
        if let Some(asset) = self.cached(path) {
            return typed_or_log(path, asset);
        }

        let request = self.backend.load_by_path_async(path, AssetType::of::<T>());
        request.completion().await;

        // An overlapping load of the same path may have finished first
        if let Some(cached) = self.cached(path) {
            return typed_or_log(path, cached);
        }

        let Some(asset) = request.result() else {
            log::error!("Failed to load asset at path '{path}'.");
            return None;
        };

        self.store(path, &asset);
        typed_or_log(path, asset)
    }
}

fn typed_or_log<T: Any>(path: &str, asset: AssetRef) -> Option<Rc<T>> {
    let typed = downcast_asset::<T>(asset);
    if typed.is_none() {
        log::error!(
            "Asset at path '{path}' is not of type {}",
            std::any::type_name::<T>()
        );
    }
    typed
}

/// Cache-aware loader over a [`ResourceBackend`].
///
/// Cloning is cheap and every clone shares the same cache, so one loader can
/// be handed to every consumer of an application.
pub struct SimpleResourceLoader<B> {
    shared: Rc<LoaderShared<B>>,
    spawner: Spawner,
}

impl<B: ResourceBackend + 'static> SimpleResourceLoader<B> {
    /// Create a loader whose asynchronous loads run on `spawner`
    #[must_use]
    pub fn new(backend: B, spawner: Spawner) -> Self {
        Self {
            shared: Rc::new(LoaderShared {
                backend,
                cache: RefCell::new(FxHashMap::default()),
            }),
            spawner,
        }
    }

    /// Backend the loader reads from
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.shared.backend
    }

    /// Load a resource synchronously, caching it on success.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::InvalidPath`] for a blank path, before any backend call
    /// - [`ResourceError::NotFound`] if the backend has nothing at `path`
    /// - [`ResourceError::TypeMismatch`] if the cached resource is not a `T`
    pub fn load<T: Any>(&self, path: &str) -> Result<Rc<T>, ResourceError> {
        if is_blank(path) {
            return Err(ResourceError::InvalidPath);
        }

        let asset = match self.shared.cached(path) {
            Some(asset) => asset,
            None => {
                let asset = self
                    .shared
                    .backend
                    .load_by_path(path, AssetType::of::<T>())
                    .ok_or_else(|| ResourceError::NotFound {
                        path: path.to_owned(),
                    })?;
                self.shared.store(path, &asset);
                asset
            }
        };

        downcast_asset::<T>(asset).ok_or_else(|| ResourceError::TypeMismatch {
            path: path.to_owned(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Load a resource asynchronously and hand it to `on_complete`.
    ///
    /// The load starts immediately and a cached resource is delivered before
    /// this returns. Otherwise the callback runs on a later frame. A missing
    /// resource is logged and delivered as `None`.
    ///
    /// # Errors
    ///
    /// - [`ResourceError::NullCallback`] if `on_complete` is `None`
    /// - [`ResourceError::InvalidPath`] for a blank path, before any backend call
    pub fn load_async<T, F>(&self, path: &str, on_complete: Option<F>) -> Result<(), ResourceError>
    where
        T: Any,
        F: FnOnce(Option<Rc<T>>) + 'static,
    {
        let Some(on_complete) = on_complete else {
            return Err(ResourceError::NullCallback);
        };
        if is_blank(path) {
            return Err(ResourceError::InvalidPath);
        }

        let shared = Rc::clone(&self.shared);
        let path = path.to_owned();
        self.spawner.start(async move {
            let asset = shared.load_async::<T>(&path).await;
            on_complete(asset);
        });
        Ok(())
    }

    /// Forget the resource at `path`, optionally unloading it from memory.
    ///
    /// Unknown paths are ignored.
    pub fn unload(&self, path: &str, unload_from_memory: bool) {
        let removed = self.shared.cache.borrow_mut().remove(path);
        if let Some(asset) = removed {
            if unload_from_memory {
                self.shared.backend.unload_object(&asset);
            }
            log::debug!("Unloaded '{path}'");
        }
    }

    /// Forget every cached resource, optionally unloading each from memory
    pub fn clear_cache(&self, unload_from_memory: bool) {
        let cache = self.shared.cache.take();
        if unload_from_memory {
            for asset in cache.values() {
                self.shared.backend.unload_object(asset);
            }
        }
        log::debug!("Cleared {} cached resources", cache.len());
    }

    /// Check whether `path` is cached
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.shared.cache.borrow().contains_key(path)
    }

    /// Number of cached resources
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.cache.borrow().len()
    }

    /// Check whether nothing is cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.cache.borrow().is_empty()
    }
}

impl<B> Clone for SimpleResourceLoader<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            spawner: self.spawner.clone(),
        }
    }
}

impl<B> std::fmt::Debug for SimpleResourceLoader<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleResourceLoader")
            .field("cached", &self.shared.cache.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::assets::{Completer, FrameDriven, OperationHandle};
    use crate::core::FrameScheduler;
    use crate::host::MemoryResources;

    #[derive(Debug)]
    struct Icon {
        name: &'static str,
    }

    fn setup() -> (FrameScheduler, MemoryResources, SimpleResourceLoader<MemoryResources>) {
        let scheduler = FrameScheduler::new();
        let backend = MemoryResources::new();
        backend.insert("icons/shield", Icon { name: "shield" });
        let loader = SimpleResourceLoader::new(backend.clone(), scheduler.spawner());
        (scheduler, backend, loader)
    }

    fn capture<T: 'static>() -> (Rc<RefCell<Option<Option<Rc<T>>>>>, impl FnOnce(Option<Rc<T>>)) {
        let slot = Rc::new(RefCell::new(None));
        let out = Rc::clone(&slot);
        (slot, move |asset| *out.borrow_mut() = Some(asset))
    }

    #[test]
    fn test_load_caches_result() {
        let (_scheduler, backend, loader) = setup();

        let first = loader.load::<Icon>("icons/shield").unwrap();
        let second = loader.load::<Icon>("icons/shield").unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.name, "shield");
        assert_eq!(backend.stats().sync_loads, 1);
    }

    #[test]
    fn test_load_missing_leaves_cache_unchanged() {
        let (_scheduler, _backend, loader) = setup();

        let result = loader.load::<Icon>("icons/sword");
        assert_eq!(
            result.unwrap_err(),
            ResourceError::NotFound {
                path: "icons/sword".to_string()
            }
        );
        assert!(loader.is_empty());
    }

    #[test]
    fn test_blank_paths_issue_no_backend_call() {
        let (_scheduler, backend, loader) = setup();

        for path in ["", "  "] {
            assert_eq!(
                loader.load::<Icon>(path).unwrap_err(),
                ResourceError::InvalidPath
            );
            let (_slot, callback) = capture::<Icon>();
            assert_eq!(
                loader.load_async(path, Some(callback)).unwrap_err(),
                ResourceError::InvalidPath
            );
        }

        let stats = backend.stats();
        assert_eq!(stats.sync_loads, 0);
        assert_eq!(stats.async_loads, 0);
    }

    #[test]
    fn test_load_async_requires_callback() {
        let (_scheduler, backend, loader) = setup();

        let result = loader.load_async::<Icon, fn(Option<Rc<Icon>>)>("icons/shield", None);
        assert_eq!(result.unwrap_err(), ResourceError::NullCallback);
        assert_eq!(backend.stats().async_loads, 0);
    }

    #[test]
    fn test_load_async_after_latency() {
        let (mut scheduler, backend, loader) = setup();
        let backend = backend.with_latency(2);
        let (slot, callback) = capture::<Icon>();

        loader.load_async("icons/shield", Some(callback)).unwrap();
        assert!(slot.borrow().is_none());

        let frames = scheduler.run_until_idle(10, || backend.advance_frame());
        assert_eq!(frames, 2);

        let delivered = slot.borrow_mut().take().flatten().unwrap();
        assert_eq!(delivered.name, "shield");
        assert!(loader.contains("icons/shield"));
    }

    #[test]
    fn test_load_async_cached_delivers_immediately() {
        let (_scheduler, backend, loader) = setup();
        loader.load::<Icon>("icons/shield").unwrap();
        let (slot, callback) = capture::<Icon>();

        loader.load_async("icons/shield", Some(callback)).unwrap();

        assert!(slot.borrow().as_ref().is_some_and(Option::is_some));
        assert_eq!(backend.stats().async_loads, 0);
    }

    #[test]
    fn test_load_async_missing_delivers_none() {
        let (_scheduler, _backend, loader) = setup();
        let (slot, callback) = capture::<Icon>();

        loader.load_async("icons/sword", Some(callback)).unwrap();

        assert!(matches!(*slot.borrow(), Some(None)));
        assert!(!loader.contains("icons/sword"));
    }

    /// Hands out a fresh copy for every asynchronous load
    #[derive(Default)]
    struct CopyingResources {
        requests: RefCell<Vec<Completer<AssetRef>>>,
    }

    impl ResourceBackend for CopyingResources {
        fn load_by_path(&self, _path: &str, _asset_type: AssetType) -> Option<AssetRef> {
            None
        }

        fn load_by_path_async(&self, _path: &str, _asset_type: AssetType) -> OperationHandle<AssetRef> {
            let (handle, completer) = OperationHandle::pending();
            self.requests.borrow_mut().push(completer);
            handle
        }

        fn unload_object(&self, _asset: &AssetRef) {}
    }

    #[test]
    fn test_overlapping_async_loads_share_cached_value() {
        let mut scheduler = FrameScheduler::new();
        let loader = SimpleResourceLoader::new(CopyingResources::default(), scheduler.spawner());
        let (first, first_callback) = capture::<Icon>();
        let (second, second_callback) = capture::<Icon>();

        loader.load_async("icons/bow", Some(first_callback)).unwrap();
        loader.load_async("icons/bow", Some(second_callback)).unwrap();

        let requests = loader.backend().requests.take();
        assert_eq!(requests.len(), 2);
        for completer in requests {
            completer.succeed(Rc::new(Icon { name: "bow" }));
        }
        assert_eq!(scheduler.tick(), 0);

        let cached = loader.load::<Icon>("icons/bow").unwrap();
        let first = first.borrow_mut().take().flatten().unwrap();
        let second = second.borrow_mut().take().flatten().unwrap();
        assert!(Rc::ptr_eq(&first, &cached));
        assert!(Rc::ptr_eq(&second, &cached));
        assert_eq!(loader.len(), 1);
    }

    #[test]
    fn test_callback_may_reenter_loader() {
        let (_scheduler, _backend, loader) = setup();
        let reentered = Rc::new(Cell::new(false));

        let inner = loader.clone();
        let flag = Rc::clone(&reentered);
        loader
            .load_async("icons/shield", Some(move |_: Option<Rc<Icon>>| {
                flag.set(inner.load::<Icon>("icons/shield").is_ok());
            }))
            .unwrap();

        assert!(reentered.get());
    }

    #[test]
    fn test_unload() {
        let (_scheduler, backend, loader) = setup();

        loader.unload("icons/sword", true);
        assert_eq!(backend.stats().unloads, 0);

        loader.load::<Icon>("icons/shield").unwrap();
        loader.unload("icons/shield", false);
        assert!(!loader.contains("icons/shield"));
        assert_eq!(backend.stats().unloads, 0);

        loader.load::<Icon>("icons/shield").unwrap();
        loader.unload("icons/shield", true);
        assert_eq!(backend.unloaded(), vec!["icons/shield".to_string()]);
    }

    #[test]
    fn test_clear_cache() {
        let (_scheduler, backend, loader) = setup();
        backend.insert("icons/bow", Icon { name: "bow" });

        loader.load::<Icon>("icons/shield").unwrap();
        loader.load::<Icon>("icons/bow").unwrap();

        loader.clear_cache(true);
        assert!(loader.is_empty());
        assert_eq!(backend.stats().unloads, 2);
    }
}
