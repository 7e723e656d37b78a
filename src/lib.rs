//! Runtime asset loading for games
//!
//! This crate provides:
//! - Address-keyed asset caching over an asynchronous handle API
//! - Tracking of instantiated prefabs for release by reference
//! - Path-keyed resource loading with callback-based async loads
//! - A frame-driven cooperative scheduler for asynchronous work
//!
//! Every handle acquired is released exactly once, on success, failure or
//! teardown.

pub mod assets;
pub mod core;
pub mod host;

// Re-exports for convenience
pub use glam;
pub use hecs;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::assets::{
        AddressableBackend, AssetError, FrameDriven, HandleCache, InstanceId, InstanceTracker,
        OperationHandle, OperationStatus, ResourceBackend, ResourceError, SimpleResourceLoader,
    };
    pub use crate::core::{AssetConfig, AssetContext, FrameScheduler, Spawner};
    pub use crate::host::{DirectoryResources, MemoryAddressables, MemoryResources, Prefab, Transform};
    pub use glam::{Quat, Vec3};
}
