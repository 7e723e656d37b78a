//! Example scene demonstrating asset lifecycle management

use std::cell::RefCell;
use std::rc::Rc;

use asset_lifecycle::prelude::*;

/// Texture asset used by the demo scene
#[derive(Debug)]
struct Texture {
    width: u32,
    height: u32,
}

/// Audio clip asset used by the demo scene
#[derive(Debug)]
struct AudioClip {
    sample_rate: u32,
    seconds: f32,
}

fn load_config() -> AssetConfig {
    let Some(path) = std::env::args().nth(1) else {
        return AssetConfig::default();
    };
    match AssetConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {e}");
            AssetConfig::default()
        }
    }
}

fn main() {
    let config = load_config();
    env_logger::Builder::new()
        .parse_filters(&config.log_filter)
        .parse_default_env()
        .init();

    let latency = config.async_latency_frames;
    let addressables = MemoryAddressables::new().with_latency(latency);
    addressables.insert("brick_texture", Texture {
        width: 512,
        height: 512,
    });
    addressables.insert("theme_music", AudioClip {
        sample_rate: 44_100,
        seconds: 92.5,
    });
    addressables.insert_prefab("arena", Prefab::new("Arena"));
    addressables.insert_prefab(
        "enemy_prefab",
        Prefab::new("Enemy").with_transform(Transform::from_position(Vec3::new(0.0, 1.0, -4.0))),
    );

    let resources = MemoryResources::new().with_latency(latency);
    resources.insert("icons/shield", Texture {
        width: 64,
        height: 64,
    });

    let mut ctx = AssetContext::new(config, addressables.clone(), resources.clone());
    let enemies = Rc::new(RefCell::new(Vec::new()));

    let cache = Rc::clone(ctx.addressables());
    let spawned = Rc::clone(&enemies);
    ctx.spawn(async move {
        match cache.load_asset::<Texture>("brick_texture").await {
            Ok(texture) => log::info!("Loaded brick texture {}x{}", texture.width, texture.height),
            Err(e) => log::error!("{e}"),
        }
        // Served from the cache
        if let Ok(texture) = cache.load_asset::<Texture>("brick_texture").await {
            log::info!("Cached brick texture {}x{}", texture.width, texture.height);
        }
        if let Ok(clip) = cache.load_asset::<AudioClip>("theme_music").await {
            log::info!("Loaded theme {:.1}s at {} Hz", clip.seconds, clip.sample_rate);
        }

        let arena = cache.instantiate("arena", None, false).await.ok();
        for _ in 0..3 {
            match cache.instantiate("enemy_prefab", arena, true).await {
                Ok(enemy) => spawned.borrow_mut().push(enemy),
                Err(e) => log::error!("{e}"),
            }
        }
        if let Err(e) = cache.instantiate("boss_prefab", arena, false).await {
            log::warn!("{e}");
        }
    });

    ctx.resources()
        .load_async("icons/shield", Some(|icon: Option<Rc<Texture>>| {
            if let Some(icon) = icon {
                log::info!("Shield icon ready: {}x{}", icon.width, icon.height);
            }
        }))
        .ok();
    ctx.resources()
        .load_async("icons/sword", Some(|icon: Option<Rc<Texture>>| {
            log::info!("Sword icon available: {}", icon.is_some());
        }))
        .ok();

    let frames = ctx.run_until_idle();
    log::info!("Scene loaded in {frames} frames");

    if let Err(e) = ctx.resources().load::<Texture>("icons/sword") {
        log::warn!("{e}");
    }

    // Release one enemy by reference, leave the rest to shutdown
    let first = enemies.borrow().first().copied();
    ctx.addressables().release_instance(first);
    ctx.addressables().release_asset("theme_music");

    log::info!(
        "Live instances: {}, cached assets: {}",
        ctx.addressables().instance_count(),
        ctx.addressables().cached_count()
    );

    ctx.shutdown();

    let stats = addressables.stats();
    log::info!(
        "Loads: {}, instantiations: {}, releases: {}, instance releases: {}, outstanding: {}",
        stats.load_calls,
        stats.instantiate_calls,
        stats.releases,
        stats.instance_releases,
        addressables.outstanding_handles()
    );
    log::info!("Resource unloads: {}", resources.stats().unloads);
}
