//! Asset loading with handle lifecycle tracking
//!
//! Provides cache-aware facades over an engine's asset subsystems:
//! - Address-keyed loading and prefab instantiation ([`HandleCache`])
//! - Instance → handle bookkeeping ([`InstanceTracker`])
//! - Path-keyed resource loading ([`SimpleResourceLoader`])
//!
//! Every handle acquired through these types is released exactly once.

mod backend;
mod cache;
mod error;
mod handle;
mod instances;
mod resources;

pub use backend::{AddressableBackend, FrameDriven, ResourceBackend};
pub use cache::HandleCache;
pub use error::{AssetError, ResourceError};
pub use handle::{
    AssetRef, AssetType, Completer, Completion, HandleId, OperationHandle, OperationStatus,
    downcast_asset,
};
pub use instances::{InstanceId, InstanceTracker};
pub use resources::SimpleResourceLoader;
