//! On-disk resource folder
//!
//! Resolves resource paths the way engine resource folders do: relative to
//! a root, with the file extension left out. Each requested type needs a
//! decoder; text and raw bytes are available out of the box and serde types
//! can be read from `.ron` or `.json` files.

use std::any::{Any, TypeId};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;

use crate::assets::{AssetRef, AssetType, FrameDriven, OperationHandle, ResourceBackend};
use crate::core::AssetConfig;

type Decoder = Box<dyn Fn(&Path, &[u8]) -> Option<AssetRef>>;

/// Resource backend reading files below a root directory
pub struct DirectoryResources {
    root: PathBuf,
    decoders: FxHashMap<TypeId, Decoder>,
}

impl DirectoryResources {
    /// Create a backend rooted at `root` with the text and bytes decoders
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut resources = Self {
            root: root.into(),
            decoders: FxHashMap::default(),
        };
        resources.register_decoder(|_, bytes| String::from_utf8(bytes.to_vec()).ok());
        resources.register_decoder(|_, bytes| Some(bytes.to_vec()));
        resources
    }

    /// Create a backend rooted at the configured resource folder
    #[must_use]
    pub fn from_config(config: &AssetConfig) -> Self {
        Self::new(config.resources_root.clone())
    }

    /// Folder every resource path is resolved against
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register how to turn file contents into a `T`
    pub fn register_decoder<T: Any>(
        &mut self,
        decode: impl Fn(&Path, &[u8]) -> Option<T> + 'static,
    ) {
        let decoder: Decoder = Box::new(move |path: &Path, bytes: &[u8]| {
            decode(path, bytes).map(|asset| Rc::new(asset) as AssetRef)
        });
        self.decoders.insert(TypeId::of::<T>(), decoder);
    }

    /// Decode `T` with serde from `.ron` or `.json` files
    pub fn register_data<T: DeserializeOwned + 'static>(&mut self) {
        self.register_decoder(|path: &Path, bytes: &[u8]| {
            let text = std::str::from_utf8(bytes).ok()?;
            let decoded = match path.extension().and_then(|ext| ext.to_str()) {
                Some("ron") => ron::from_str::<T>(text).map_err(|e| e.to_string()),
                Some("json") => serde_json::from_str::<T>(text).map_err(|e| e.to_string()),
                _ => Err(String::from("unsupported data format")),
            };
            decoded
                .map_err(|e| log::warn!("Could not decode {}: {e}", path.display()))
                .ok()
        });
    }

    /// Find the file a resource path refers to
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        if !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return None;
        }

        let candidate = self.root.join(relative);
        if candidate.is_file() {
            return Some(candidate);
        }

        let stem = candidate.file_name()?;
        let dir = candidate.parent()?;
        fs::read_dir(dir)
            .ok()?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|file| file.is_file() && file.file_stem() == Some(stem))
            .min()
    }

    fn read(&self, path: &str, asset_type: AssetType) -> Option<AssetRef> {
        let Some(decoder) = self.decoders.get(&asset_type.id()) else {
            log::warn!("No decoder registered for {asset_type}");
            return None;
        };
        let file = self.resolve(path)?;
        let bytes = fs::read(&file)
            .map_err(|e| log::warn!("Could not read {}: {e}", file.display()))
            .ok()?;
        decoder(&file, &bytes)
    }
}

impl ResourceBackend for DirectoryResources {
    fn load_by_path(&self, path: &str, asset_type: AssetType) -> Option<AssetRef> {
        self.read(path, asset_type)
    }

    fn load_by_path_async(&self, path: &str, asset_type: AssetType) -> OperationHandle<AssetRef> {
        match self.read(path, asset_type) {
            Some(asset) => OperationHandle::succeeded(asset),
            None => OperationHandle::failed(format!("no resource at '{path}'")),
        }
    }

    fn unload_object(&self, _asset: &AssetRef) {
        // Nothing stays resident besides the caller's copy
    }
}

impl FrameDriven for DirectoryResources {}

impl std::fmt::Debug for DirectoryResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryResources")
            .field("root", &self.root)
            .field("decoders", &self.decoders.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::assets::downcast_asset;

    #[derive(Debug, PartialEq, Deserialize)]
    struct WeaponStats {
        damage: u32,
        range: f32,
    }

    fn folder() -> (tempfile::TempDir, DirectoryResources) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("icons")).unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        fs::write(dir.path().join("icons/sword.txt"), "sword icon").unwrap();
        fs::write(dir.path().join("data/bow.ron"), "(damage: 7, range: 30.0)").unwrap();
        fs::write(dir.path().join("data/axe.json"), "{\"damage\": 12, \"range\": 1.5}").unwrap();

        let mut resources = DirectoryResources::new(dir.path());
        resources.register_data::<WeaponStats>();
        (dir, resources)
    }

    #[test]
    fn test_load_without_extension() {
        let (_dir, resources) = folder();

        let asset = resources
            .load_by_path("icons/sword", AssetType::of::<String>())
            .unwrap();
        assert_eq!(*downcast_asset::<String>(asset).unwrap(), "sword icon");

        let bytes = resources
            .load_by_path("icons/sword.txt", AssetType::of::<Vec<u8>>())
            .unwrap();
        assert_eq!(downcast_asset::<Vec<u8>>(bytes).unwrap().len(), 10);
    }

    #[test]
    fn test_load_serde_data() {
        let (_dir, resources) = folder();

        let bow = resources
            .load_by_path("data/bow", AssetType::of::<WeaponStats>())
            .and_then(downcast_asset::<WeaponStats>)
            .unwrap();
        assert_eq!(bow.damage, 7);

        let axe = resources
            .load_by_path("data/axe", AssetType::of::<WeaponStats>())
            .and_then(downcast_asset::<WeaponStats>)
            .unwrap();
        assert_eq!(axe.damage, 12);
    }

    #[test]
    fn test_missing_or_undecodable() {
        let (_dir, resources) = folder();

        assert!(resources.load_by_path("icons/shield", AssetType::of::<String>()).is_none());
        assert!(resources.load_by_path("icons/sword", AssetType::of::<u64>()).is_none());
        assert!(resources.load_by_path("icons/sword", AssetType::of::<WeaponStats>()).is_none());
        assert!(resources.load_by_path("../outside", AssetType::of::<String>()).is_none());
    }

    #[test]
    fn test_async_load_completes_immediately() {
        let (_dir, resources) = folder();

        let found = resources.load_by_path_async("icons/sword", AssetType::of::<String>());
        assert!(found.result().is_some());

        let missing = resources.load_by_path_async("icons/shield", AssetType::of::<String>());
        assert!(missing.is_done());
        assert!(missing.result().is_none());
    }
}
