use std::fmt;

#[derive(Debug, Clone)]
pub enum PdfError {
    InvalidPdf(String),
    PasswordRequired,
    BindingFailed(String),
    ContentStreamFailed(String),
    TextExtractionFailed(String),
    IOError(String),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::InvalidPdf(msg) => write!(f, "Invalid PDF: {}", msg),
            PdfError::PasswordRequired => write!(f, "PDF is password-protected"),
            PdfError::BindingFailed(msg) => write!(f, "Pdfium unavailable: {}", msg),
            PdfError::ContentStreamFailed(msg) => write!(f, "Content stream unreadable: {}", msg),
            PdfError::TextExtractionFailed(msg) => write!(f, "Text extraction failed: {}", msg),
            PdfError::IOError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for PdfError {}

impl From<lopdf::Error> for PdfError {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(io_err) => PdfError::IOError(io_err.to_string()),
            _ => PdfError::InvalidPdf(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;

/// Classify a pdfium load failure by its message.
pub(crate) fn load_error(message: String) -> PdfError {
    if message.to_ascii_lowercase().contains("password") {
        PdfError::PasswordRequired
    } else {
        PdfError::InvalidPdf(message)
    }
}
