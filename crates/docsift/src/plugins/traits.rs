//! Base plugin trait definition.
//!
//! Every extraction strategy is a plugin: it has a stable name, a version and
//! lifecycle hooks the registry calls on register/remove.

use crate::Result;

/// Base trait that all plugins must implement.
///
/// # Thread Safety
///
/// Plugins are shared as `Arc<dyn …>` across tasks, so they must be `Send + Sync`.
///
/// # Example
///
/// ```rust
/// use docsift::plugins::Plugin;
/// use docsift::Result;
///
/// struct Upper;
///
/// impl Plugin for Upper {
///     fn name(&self) -> &str {
///         "upper"
///     }
///
///     fn version(&self) -> String {
///         "1.0.0".to_string()
///     }
///
///     fn initialize(&self) -> Result<()> {
///         Ok(())
///     }
///
///     fn shutdown(&self) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait Plugin: Send + Sync {
    /// Unique kebab-case identifier, e.g. `pdf-layout`.
    ///
    /// Appears in chain diagnostics and in [`crate::core::file_info::FileInfo`].
    fn name(&self) -> &str;

    /// Semantic version of this plugin.
    fn version(&self) -> String;

    /// Called once when the plugin is registered.
    ///
    /// # Errors
    ///
    /// A failing plugin is not registered.
    fn initialize(&self) -> Result<()>;

    /// Called when the plugin is removed from its registry.
    fn shutdown(&self) -> Result<()>;

    fn description(&self) -> &str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Tracked {
        initialized: AtomicBool,
    }

    impl Plugin for Tracked {
        fn name(&self) -> &str {
            "tracked"
        }

        fn version(&self) -> String {
            "0.1.0".to_string()
        }

        fn initialize(&self) -> Result<()> {
            self.initialized.store(true, Ordering::Release);
            Ok(())
        }

        fn shutdown(&self) -> Result<()> {
            self.initialized.store(false, Ordering::Release);
            Ok(())
        }
    }

    #[test]
    fn test_lifecycle() {
        let plugin = Tracked {
            initialized: AtomicBool::new(false),
        };
        plugin.initialize().unwrap();
        assert!(plugin.initialized.load(Ordering::Acquire));
        plugin.shutdown().unwrap();
        assert!(!plugin.initialized.load(Ordering::Acquire));
        assert_eq!(plugin.description(), "");
    }
}
