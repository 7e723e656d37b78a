//! In-memory resource folder

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::assets::{AssetRef, AssetType, Completer, FrameDriven, OperationHandle, ResourceBackend};

/// Call counters for [`MemoryResources`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    /// Calls to `load_by_path`
    pub sync_loads: usize,
    /// Calls to `load_by_path_async`
    pub async_loads: usize,
    /// Calls to `unload_object`
    pub unloads: usize,
}

struct PendingLoad {
    frames_left: u32,
    path: String,
    asset_type: AssetType,
    completer: Completer<AssetRef>,
}

#[derive(Default)]
struct ResourcesState {
    entries: FxHashMap<String, AssetRef>,
    pending: Vec<PendingLoad>,
    unloaded: Vec<String>,
    latency: u32,
    stats: ResourceStats,
}

impl ResourcesState {
    fn lookup(&self, path: &str, asset_type: AssetType) -> Option<AssetRef> {
        self.entries
            .get(path)
            .filter(|asset| asset_type.matches(asset))
            .cloned()
    }
}

/// Resource backend serving values registered by path.
///
/// Clones share the same entries and counters.
#[derive(Clone, Default)]
pub struct MemoryResources {
    state: Rc<RefCell<ResourcesState>>,
}

impl MemoryResources {
    /// Create an empty registry completing loads synchronously
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete asynchronous loads after `frames` calls to `advance_frame`
    #[must_use]
    pub fn with_latency(self, frames: u32) -> Self {
        self.state.borrow_mut().latency = frames;
        self
    }

    /// Register a resource at `path`
    pub fn insert<T: Any>(&self, path: impl Into<String>, asset: T) {
        self.state
            .borrow_mut()
            .entries
            .insert(path.into(), Rc::new(asset));
    }

    /// Remove a resource from the registry
    pub fn remove(&self, path: &str) -> bool {
        self.state.borrow_mut().entries.remove(path).is_some()
    }

    #[must_use]
    pub fn stats(&self) -> ResourceStats {
        self.state.borrow().stats
    }

    /// Paths of every resource unloaded so far, in order
    #[must_use]
    pub fn unloaded(&self) -> Vec<String> {
        self.state.borrow().unloaded.clone()
    }
}

impl ResourceBackend for MemoryResources {
    fn load_by_path(&self, path: &str, asset_type: AssetType) -> Option<AssetRef> {
        let mut state = self.state.borrow_mut();
        state.stats.sync_loads += 1;
        state.lookup(path, asset_type)
    }

    fn load_by_path_async(&self, path: &str, asset_type: AssetType) -> OperationHandle<AssetRef> {
        let mut state = self.state.borrow_mut();
        state.stats.async_loads += 1;

        if state.latency == 0 {
            return match state.lookup(path, asset_type) {
                Some(asset) => OperationHandle::succeeded(asset),
                None => OperationHandle::failed(format!("no resource at '{path}'")),
            };
        }

        let (handle, completer) = OperationHandle::pending();
        let frames_left = state.latency;
        state.pending.push(PendingLoad {
            frames_left,
            path: path.to_owned(),
            asset_type,
            completer,
        });
        handle
    }

    fn unload_object(&self, asset: &AssetRef) {
        let mut state = self.state.borrow_mut();
        state.stats.unloads += 1;

        let path = state
            .entries
            .iter()
            .find(|(_, entry)| Rc::ptr_eq(entry, asset))
            .map(|(path, _)| path.clone());
        if let Some(path) = path {
            state.unloaded.push(path);
        }
    }
}

impl FrameDriven for MemoryResources {
    fn advance_frame(&self) {
        let mut state = self.state.borrow_mut();
        let pending = std::mem::take(&mut state.pending);

        for mut load in pending {
            load.frames_left = load.frames_left.saturating_sub(1);
            if load.frames_left > 0 {
                state.pending.push(load);
                continue;
            }
            match state.lookup(&load.path, load.asset_type) {
                Some(asset) => load.completer.succeed(asset),
                None => load.completer.fail(format!("no resource at '{}'", load.path)),
            }
        }
    }
}

impl std::fmt::Debug for MemoryResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryResources")
            .field("entries", &state.entries.len())
            .field("pending", &state.pending.len())
            .field("latency", &state.latency)
            .finish()
    }
}
