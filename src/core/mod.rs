//! Core runtime module
//!
//! Contains configuration, the frame scheduler and the application context

mod config;
mod context;
mod tasks;

pub use config::{AssetConfig, ConfigError};
pub use context::AssetContext;
pub use tasks::{FrameScheduler, Spawner};
