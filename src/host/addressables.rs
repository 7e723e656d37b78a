//! In-memory addressable catalog
//!
//! Stands in for an engine's addressable subsystem: assets and prefabs are
//! registered by address, operations complete after a configurable number
//! of frames, and every handle given out is reference-counted so leaks and
//! double releases show up in [`AddressableStats`].

use std::any::Any;
use std::cell::{Ref, RefCell};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::scene::{Prefab, SceneWorld};
use crate::assets::{
    AddressableBackend, AssetRef, AssetType, Completer, FrameDriven, HandleId, InstanceId,
    OperationHandle,
};

/// Call counters for [`MemoryAddressables`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressableStats {
    /// Calls to `load_by_key`
    pub load_calls: usize,
    /// Calls to `instantiate_by_key`
    pub instantiate_calls: usize,
    /// Handles given back through `release`
    pub releases: usize,
    /// Calls to `release_instance`
    pub instance_releases: usize,
    /// Releases of handles or instances that were unknown or already released
    pub invalid_releases: usize,
}

enum Request {
    Load {
        key: String,
        asset_type: AssetType,
        completer: Completer<AssetRef>,
    },
    Instantiate {
        key: String,
        parent: Option<InstanceId>,
        keep_world_space: bool,
        completer: Completer<InstanceId>,
    },
}

struct PendingRequest {
    frames_left: u32,
    request: Request,
}

/// Engine-side record of an outstanding handle
struct LiveHandle {
    key: String,
    instance: Option<InstanceId>,
}

#[derive(Default)]
struct AddressablesState {
    assets: FxHashMap<String, AssetRef>,
    prefabs: FxHashMap<String, Prefab>,
    scene: SceneWorld,
    pending: Vec<PendingRequest>,
    live: FxHashMap<HandleId, LiveHandle>,
    instance_handles: FxHashMap<InstanceId, HandleId>,
    latency: u32,
    stats: AddressableStats,
}

impl AddressablesState {
    fn submit(&mut self, id: HandleId, key: &str, request: Request) {
        self.live.insert(
            id,
            LiveHandle {
                key: key.to_owned(),
                instance: None,
            },
        );

        if self.latency == 0 {
            self.resolve(request);
        } else {
            self.pending.push(PendingRequest {
                frames_left: self.latency,
                request,
            });
        }
    }

    fn resolve(&mut self, request: Request) {
        match request {
            Request::Load {
                key,
                asset_type,
                completer,
            } => match self.assets.get(&key) {
                Some(asset) if asset_type.matches(asset) => completer.succeed(Rc::clone(asset)),
                Some(_) => completer.fail(format!("'{key}' is not a {asset_type}")),
                None => completer.fail(format!("unknown address '{key}'")),
            },
            Request::Instantiate {
                key,
                parent,
                keep_world_space,
                completer,
            } => {
                let id = completer.handle_id();
                if !self.live.contains_key(&id) {
                    completer.fail("released before completion");
                    return;
                }
                let Some(prefab) = self.prefabs.get(&key) else {
                    completer.fail(format!("unknown prefab '{key}'"));
                    return;
                };
                let Some(instance) = self.scene.spawn_instance(prefab, parent, keep_world_space)
                else {
                    completer.fail(format!("parent of '{key}' does not exist"));
                    return;
                };

                if let Some(live) = self.live.get_mut(&id) {
                    live.instance = Some(instance);
                }
                self.instance_handles.insert(instance, id);
                completer.succeed(instance);
            }
        }
    }

    /// Release the handle behind an instance and destroy it with its
    /// descendants.
    ///
    /// Descendants keep their own handles; those stay outstanding until
    /// released themselves. Returns `false` if neither a handle nor a live
    /// instance matched.
    fn destroy(&mut self, instance: InstanceId) -> bool {
        let handle = self.instance_handles.remove(&instance);
        if let Some(id) = handle {
            self.live.remove(&id);
        }
        let despawned = !self.scene.despawn_instance(instance).is_empty();
        handle.is_some() || despawned
    }
}

/// Addressable backend keeping everything in memory.
///
/// Clones share the same catalog, scene and counters.
#[derive(Clone, Default)]
pub struct MemoryAddressables {
    state: Rc<RefCell<AddressablesState>>,
}

impl MemoryAddressables {
    /// Create a backend completing every operation synchronously
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete operations after `frames` calls to `advance_frame`
    #[must_use]
    pub fn with_latency(self, frames: u32) -> Self {
        self.state.borrow_mut().latency = frames;
        self
    }

    /// Register an asset under an address
    pub fn insert<T: Any>(&self, key: impl Into<String>, asset: T) {
        self.state
            .borrow_mut()
            .assets
            .insert(key.into(), Rc::new(asset));
    }

    /// Register a prefab under an address
    pub fn insert_prefab(&self, key: impl Into<String>, prefab: Prefab) {
        self.state.borrow_mut().prefabs.insert(key.into(), prefab);
    }

    /// Remove an asset or prefab from the catalog
    pub fn remove(&self, key: &str) -> bool {
        let mut state = self.state.borrow_mut();
        let asset = state.assets.remove(key).is_some();
        let prefab = state.prefabs.remove(key).is_some();
        asset || prefab
    }

    /// Call counters so far
    #[must_use]
    pub fn stats(&self) -> AddressableStats {
        self.state.borrow().stats
    }

    /// Number of handles given out and not yet released
    #[must_use]
    pub fn outstanding_handles(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// Number of outstanding handles for one address
    #[must_use]
    pub fn ref_count(&self, key: &str) -> usize {
        self.state
            .borrow()
            .live
            .values()
            .filter(|live| live.key == key)
            .count()
    }

    /// Number of requests waiting for a frame to complete
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Scene holding every live instance
    #[must_use]
    pub fn scene(&self) -> Ref<'_, SceneWorld> {
        Ref::map(self.state.borrow(), |state| &state.scene)
    }
}

impl AddressableBackend for MemoryAddressables {
    fn load_by_key(&self, key: &str, asset_type: AssetType) -> OperationHandle<AssetRef> {
        let mut state = self.state.borrow_mut();
        state.stats.load_calls += 1;

        let (handle, completer) = OperationHandle::pending();
        state.submit(
            handle.id(),
            key,
            Request::Load {
                key: key.to_owned(),
                asset_type,
                completer,
            },
        );
        handle
    }

    fn instantiate_by_key(
        &self,
        key: &str,
        parent: Option<InstanceId>,
        keep_world_space: bool,
    ) -> OperationHandle<InstanceId> {
        let mut state = self.state.borrow_mut();
        state.stats.instantiate_calls += 1;

        let (handle, completer) = OperationHandle::pending();
        state.submit(
            handle.id(),
            key,
            Request::Instantiate {
                key: key.to_owned(),
                parent,
                keep_world_space,
                completer,
            },
        );
        handle
    }

    fn release<T>(&self, handle: OperationHandle<T>) {
        let mut state = self.state.borrow_mut();
        let removed = state.live.remove(&handle.id());
        let Some(live) = removed else {
            log::warn!("Release of unknown handle {}", handle.id());
            state.stats.invalid_releases += 1;
            return;
        };

        state.stats.releases += 1;
        // Releasing an instantiation handle destroys what it produced
        if let Some(instance) = live.instance {
            state.destroy(instance);
        }
    }

    fn release_instance(&self, instance: InstanceId) -> bool {
        let mut state = self.state.borrow_mut();
        state.stats.instance_releases += 1;

        let destroyed = state.destroy(instance);
        if !destroyed {
            log::warn!("Release of unknown {instance}");
            state.stats.invalid_releases += 1;
        }
        destroyed
    }

    fn instance_exists(&self, instance: InstanceId) -> bool {
        self.state.borrow().scene.contains(instance)
    }
}

impl FrameDriven for MemoryAddressables {
    fn advance_frame(&self) {
        let mut state = self.state.borrow_mut();
        let pending = std::mem::take(&mut state.pending);

        for mut request in pending {
            request.frames_left = request.frames_left.saturating_sub(1);
            if request.frames_left == 0 {
                state.resolve(request.request);
            } else {
                state.pending.push(request);
            }
        }
    }
}

impl std::fmt::Debug for MemoryAddressables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryAddressables")
            .field("assets", &state.assets.len())
            .field("prefabs", &state.prefabs.len())
            .field("outstanding", &state.live.len())
            .field("latency", &state.latency)
            .finish()
    }
}
