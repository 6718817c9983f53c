//! Backend availability, probed once per process.
//!
//! The dispatcher receives a `Capabilities` value instead of consulting ambient
//! globals, so tests can run the pipeline against any combination of backends.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Which optional backends can run in this process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// The pdfium library could be bound.
    pub pdfium: bool,
    /// Path to a `java` executable, if one was found.
    pub java: Option<PathBuf>,
    /// Path to the tabula jar, from `DOCSIFT_TABULA_JAR`.
    pub tabula_jar: Option<PathBuf>,
    pub pdf: bool,
    pub office: bool,
    pub excel: bool,
}

static GLOBAL_CAPABILITIES: Lazy<Capabilities> = Lazy::new(|| {
    let caps = Capabilities::detect();
    tracing::debug!(
        pdfium = caps.pdfium,
        java = caps.java.is_some(),
        tabula = caps.tabula_jar.is_some(),
        "Probed extraction backends"
    );
    caps
});

impl Capabilities {
    /// Probe the environment. Prefer [`Capabilities::global`], which caches the result.
    pub fn detect() -> Self {
        Self {
            pdfium: pdfium_available(),
            java: locate_java(),
            tabula_jar: env::var_os("DOCSIFT_TABULA_JAR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .filter(|p| p.is_file()),
            pdf: cfg!(feature = "pdf"),
            office: cfg!(feature = "office"),
            excel: cfg!(feature = "excel"),
        }
    }

    /// Process-wide capabilities, probed on first use.
    pub fn global() -> &'static Capabilities {
        &GLOBAL_CAPABILITIES
    }

    /// Only the backends compiled into this build, with nothing external.
    pub fn compiled_only() -> Self {
        Self {
            pdf: cfg!(feature = "pdf"),
            office: cfg!(feature = "office"),
            excel: cfg!(feature = "excel"),
            ..Self::default()
        }
    }

    /// Tabula needs both a JVM and the jar.
    pub fn tabula(&self) -> bool {
        self.java.is_some() && self.tabula_jar.is_some()
    }
}

#[cfg(feature = "pdf")]
fn pdfium_available() -> bool {
    crate::pdf::bindings::pdfium_available()
}

#[cfg(not(feature = "pdf"))]
fn pdfium_available() -> bool {
    false
}

fn locate_java() -> Option<PathBuf> {
    let exe = if cfg!(target_os = "windows") { "java.exe" } else { "java" };
    let mut candidates = Vec::new();

    if let Some(home) = env::var_os("JAVA_HOME").filter(|v| !v.is_empty()) {
        candidates.push(PathBuf::from(home).join("bin").join(exe));
    }
    if let Some(path_env) = env::var_os("PATH") {
        candidates.extend(env::split_paths(&path_env).map(|dir| dir.join(exe)));
    }

    candidates.into_iter().find(|c| c.is_file())
}
