use super::error::PdfError;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use std::env;
use std::path::PathBuf;
use std::sync::Mutex;

/// Directory holding the pdfium shared library, overriding the system search.
pub const PDFIUM_PATH_ENV: &str = "DOCSIFT_PDFIUM_PATH";

/// Outcome of the first binding attempt, cached for the process.
enum BindingState {
    Uninitialized,
    Bound { lib_dir: Option<PathBuf> },
    Failed(String),
}

static PDFIUM_STATE: Lazy<Mutex<BindingState>> = Lazy::new(|| Mutex::new(BindingState::Uninitialized));

fn configured_dir() -> Option<PathBuf> {
    env::var_os(PDFIUM_PATH_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn bind_at(lib_dir: Option<&PathBuf>) -> Result<Box<dyn PdfiumLibraryBindings>, String> {
    match lib_dir {
        Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            .map_err(|e| format!("Failed to load pdfium from {}: {}", dir.display(), e)),
        None => Pdfium::bind_to_system_library().map_err(|e| format!("Failed to load system pdfium: {}", e)),
    }
}

/// Fresh pdfium bindings.
///
/// The first call decides where the library lives (`DOCSIFT_PDFIUM_PATH`,
/// then the system search path). A failure is remembered so later calls fail
/// fast instead of probing the filesystem again.
pub(crate) fn bind_pdfium(context: &'static str) -> Result<Box<dyn PdfiumLibraryBindings>, PdfError> {
    let mut state = PDFIUM_STATE
        .lock()
        .map_err(|e| PdfError::BindingFailed(format!("pdfium state poisoned ({}): {}", context, e)))?;

    if let BindingState::Uninitialized = &*state {
        let dir = configured_dir();
        match bind_at(dir.as_ref()) {
            Ok(bindings) => {
                *state = BindingState::Bound { lib_dir: dir };
                return Ok(bindings);
            }
            Err(err) => {
                tracing::debug!(context, "pdfium binding failed: {}", err);
                *state = BindingState::Failed(err.clone());
                return Err(PdfError::BindingFailed(err));
            }
        }
    }

    match &*state {
        BindingState::Bound { lib_dir } => bind_at(lib_dir.as_ref()).map_err(PdfError::BindingFailed),
        BindingState::Failed(err) => Err(PdfError::BindingFailed(format!("previously failed: {}", err))),
        BindingState::Uninitialized => Err(PdfError::BindingFailed("pdfium state not initialized".to_string())),
    }
}

/// Whether pdfium can be bound in this process.
pub fn pdfium_available() -> bool {
    bind_pdfium("capability probe").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_is_consistent() {
        // Whatever the host has, repeated probes must agree.
        assert_eq!(pdfium_available(), pdfium_available());
    }
}
