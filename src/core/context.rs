//! Application-wide asset services
//!
//! One [`AssetContext`] per application owns the frame scheduler, the
//! addressable cache and the resource loader, and hands them to consumers
//! explicitly.

use std::future::Future;
use std::rc::Rc;

use crate::assets::{
    AddressableBackend, FrameDriven, HandleCache, ResourceBackend, SimpleResourceLoader,
};
use crate::core::{AssetConfig, FrameScheduler, Spawner};

/// Asset services shared by an application
pub struct AssetContext<A, R>
where
    A: AddressableBackend + FrameDriven,
    R: ResourceBackend + FrameDriven + 'static,
{
    config: AssetConfig,
    scheduler: FrameScheduler,
    addressables: Rc<HandleCache<A>>,
    resources: SimpleResourceLoader<R>,
}

impl<A, R> AssetContext<A, R>
where
    A: AddressableBackend + FrameDriven,
    R: ResourceBackend + FrameDriven + 'static,
{
    /// Create the services over the given backends
    #[must_use]
    pub fn new(config: AssetConfig, addressables: A, resources: R) -> Self {
        let scheduler = FrameScheduler::new();
        let resources = SimpleResourceLoader::new(resources, scheduler.spawner());
        Self {
            config,
            scheduler,
            addressables: Rc::new(HandleCache::new(addressables)),
            resources,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    /// Addressable cache, shareable with tasks
    #[must_use]
    pub fn addressables(&self) -> &Rc<HandleCache<A>> {
        &self.addressables
    }

    #[must_use]
    pub fn resources(&self) -> &SimpleResourceLoader<R> {
        &self.resources
    }

    #[must_use]
    pub fn spawner(&self) -> Spawner {
        self.scheduler.spawner()
    }

    /// Start a task on the frame scheduler
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) {
        self.scheduler.spawner().start(future);
    }

    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.scheduler.frame()
    }

    /// Advance both backends by one frame, then resume suspended tasks.
    ///
    /// Returns the number of tasks still suspended.
    pub fn tick(&mut self) -> usize {
        self.addressables.backend().advance_frame();
        self.resources.backend().advance_frame();
        self.scheduler.tick()
    }

    /// Tick until every task has finished or the configured limit is hit.
    ///
    /// Returns the number of frames ticked.
    pub fn run_until_idle(&mut self) -> u32 {
        let addressables = &self.addressables;
        let resources = &self.resources;
        let frames = self
            .scheduler
            .run_until_idle(self.config.max_frames_per_wait, || {
                addressables.backend().advance_frame();
                resources.backend().advance_frame();
            });

        let pending = self.scheduler.pending_tasks();
        if pending > 0 {
            log::warn!("{pending} asset tasks still pending after {frames} frames");
        }
        frames
    }

    /// Release every addressable handle and drop every cached resource
    pub fn shutdown(&self) {
        self.addressables.teardown();
        self.resources.clear_cache(true);
        log::info!("Asset services shut down at frame {}", self.frame());
    }
}

impl<A, R> std::fmt::Debug for AssetContext<A, R>
where
    A: AddressableBackend + FrameDriven,
    R: ResourceBackend + FrameDriven + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetContext")
            .field("frame", &self.scheduler.frame())
            .field("addressables", &self.addressables)
            .field("resources", &self.resources)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::host::{MemoryAddressables, MemoryResources, Prefab};

    fn context() -> AssetContext<MemoryAddressables, MemoryResources> {
        let config = AssetConfig::default().with_async_latency(2);
        let addressables = MemoryAddressables::new().with_latency(config.async_latency_frames);
        addressables.insert_prefab("enemy_prefab", Prefab::new("Enemy"));
        let resources = MemoryResources::new().with_latency(config.async_latency_frames);
        resources.insert("icons/sword", String::from("sword"));
        AssetContext::new(config, addressables, resources)
    }

    #[test]
    fn test_spawned_instantiation_completes() {
        let mut ctx = context();
        let spawned = Rc::new(Cell::new(None));

        let cache = Rc::clone(ctx.addressables());
        let out = Rc::clone(&spawned);
        ctx.spawn(async move {
            out.set(cache.instantiate("enemy_prefab", None, false).await.ok());
        });

        assert_eq!(ctx.run_until_idle(), 2);
        assert!(spawned.get().is_some());
        assert_eq!(ctx.addressables().instance_count(), 1);
    }

    #[test]
    fn test_resources_share_scheduler() {
        let mut ctx = context();
        let delivered = Rc::new(Cell::new(false));

        let flag = Rc::clone(&delivered);
        ctx.resources()
            .load_async("icons/sword", Some(move |icon: Option<Rc<String>>| {
                flag.set(icon.is_some());
            }))
            .unwrap();

        assert_eq!(ctx.tick(), 1);
        assert_eq!(ctx.tick(), 0);
        assert!(delivered.get());
        assert_eq!(ctx.frame(), 2);
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let mut ctx = context();
        let cache = Rc::clone(ctx.addressables());
        ctx.spawn(async move {
            let _ = cache.instantiate("enemy_prefab", None, false).await;
        });
        ctx.run_until_idle();
        ctx.resources().load::<String>("icons/sword").unwrap();

        ctx.shutdown();

        assert_eq!(ctx.addressables().backend().outstanding_handles(), 0);
        assert!(ctx.resources().is_empty());
        assert_eq!(ctx.resources().backend().stats().unloads, 1);
    }
}
