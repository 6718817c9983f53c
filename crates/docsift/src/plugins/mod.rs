//! Strategy plugin system.
//!
//! - [`Plugin`]: lifecycle and identity shared by every plugin
//! - [`ExtractionStrategy`]: one backend's extraction of one or more formats
//! - [`StrategyRegistry`]: extension → priority-ordered strategies

pub mod registry;
pub mod strategy;
pub mod traits;

pub use registry::StrategyRegistry;
pub use strategy::ExtractionStrategy;
pub use traits::Plugin;
