//! Interfaces to the host engine's asset subsystems

use super::handle::{AssetRef, AssetType, OperationHandle};
use super::instances::InstanceId;

/// Addressable asset subsystem: loads by address, instantiates prefabs and
/// reference-counts every handle it gives out.
pub trait AddressableBackend {
    /// Start loading the asset at `key` as `asset_type`
    fn load_by_key(&self, key: &str, asset_type: AssetType) -> OperationHandle<AssetRef>;

    /// Start instantiating the prefab at `key`
    fn instantiate_by_key(
        &self,
        key: &str,
        parent: Option<InstanceId>,
        keep_world_space: bool,
    ) -> OperationHandle<InstanceId>;

    /// Give back the reference owned by `handle`
    fn release<T>(&self, handle: OperationHandle<T>);

    /// Destroy an instance and release the handle that produced it.
    ///
    /// Returns `false` if the backend does not know the instance.
    fn release_instance(&self, instance: InstanceId) -> bool;

    /// Check whether an instance is still alive.
    ///
    /// Instances can be destroyed behind the cache's back, for example along
    /// with their parent. Backends that cannot tell report every instance as
    /// alive.
    fn instance_exists(&self, _instance: InstanceId) -> bool {
        true
    }
}

/// Folder-based resource subsystem
pub trait ResourceBackend {
    /// Load synchronously, returning `None` if nothing matches
    fn load_by_path(&self, path: &str, asset_type: AssetType) -> Option<AssetRef>;

    /// Start an asynchronous load. A missing resource completes without a result.
    fn load_by_path_async(&self, path: &str, asset_type: AssetType) -> OperationHandle<AssetRef>;

    /// Drop the engine-side copy of a previously loaded resource
    fn unload_object(&self, asset: &AssetRef);
}

/// Backends with work that progresses once per frame
pub trait FrameDriven {
    /// Advance pending operations by one frame
    fn advance_frame(&self) {}
}
