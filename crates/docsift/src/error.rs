//! Error types for docsift.
//!
//! Failures are recovered at the narrowest scope that can handle them:
//!
//! - `Unit` errors become an inline marker inside one page/slide/sheet
//! - `Backend` errors are absorbed by the fallback chain, which moves on to the
//!   next strategy
//! - `ChainExhausted`, `NotFound` and `UnsupportedFormat` end the call and surface
//!   in [`ExtractionResult::error`](crate::ExtractionResult)
//!
//! `Io` errors from `std::io` convert automatically with `?`.
use thiserror::Error;

/// Result type alias using `DocsiftError`.
pub type Result<T> = std::result::Result<T, DocsiftError>;

/// Main error type for all docsift operations.
#[derive(Debug, Error)]
pub enum DocsiftError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file not found")]
    NotFound { path: String },

    #[error("unsupported file type")]
    UnsupportedFormat { extension: String },

    /// One extraction strategy failed. The chain runner logs it and advances.
    #[error("{strategy} failed: {message}")]
    Backend {
        strategy: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Every strategy for a format failed; `last` carries the final diagnostic.
    #[error("all extraction strategies exhausted: {last}")]
    ChainExhausted { last: String },

    #[error("error processing unit {index}: {message}")]
    Unit { index: usize, message: String },

    #[error("Encoding error: {message}")]
    Encoding { message: String },

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "excel")]
impl From<calamine::Error> for DocsiftError {
    fn from(err: calamine::Error) -> Self {
        DocsiftError::Parsing {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "office")]
impl From<zip::result::ZipError> for DocsiftError {
    fn from(err: zip::result::ZipError) -> Self {
        DocsiftError::Parsing {
            message: format!("Failed to open archive: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "office")]
impl From<roxmltree::Error> for DocsiftError {
    fn from(err: roxmltree::Error) -> Self {
        DocsiftError::Parsing {
            message: format!("Failed to parse XML: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(feature = "pdf")]
impl From<crate::pdf::error::PdfError> for DocsiftError {
    fn from(err: crate::pdf::error::PdfError) -> Self {
        DocsiftError::Parsing {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<csv::Error> for DocsiftError {
    fn from(err: csv::Error) -> Self {
        DocsiftError::Parsing {
            message: format!("Failed to read delimited text: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for DocsiftError {
    fn from(err: serde_json::Error) -> Self {
        DocsiftError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl DocsiftError {
    error_constructor!(parsing, Parsing);
    error_constructor!(validation, Validation);
    error_constructor!(serialization, Serialization);

    pub fn backend<N: Into<String>, S: Into<String>>(strategy: N, message: S) -> Self {
        Self::Backend {
            strategy: strategy.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub fn unsupported(extension: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// Whether this error ends the whole call rather than a single strategy.
    pub fn is_call_scope(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::UnsupportedFormat { .. } | Self::ChainExhausted { .. }
        )
    }
}
