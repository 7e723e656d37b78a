//! Host-side asset subsystems
//!
//! Reference implementations of the backend traits: an in-memory
//! addressable catalog with a hecs scene for instances, an in-memory
//! resource folder, and a resource folder on disk.

mod addressables;
mod directory;
mod resources;
mod scene;

pub use addressables::{AddressableStats, MemoryAddressables};
pub use directory::DirectoryResources;
pub use resources::{MemoryResources, ResourceStats};
pub use scene::{Name, Parent, Prefab, SceneWorld, Transform};
