//! Error types for pdfsection library.

use std::io;
use thiserror::Error;

/// Result type alias for pdfsection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting, locating or reformatting.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// Error extracting embedded text from a page.
    #[error("Text extraction error on page {page}: {message}")]
    TextExtract { page: u32, message: String },

    /// The page could not be rendered to an image.
    #[error("Rasterization failed on page {page}: {message}")]
    Rasterize { page: u32, message: String },

    /// The OCR engine failed on a page.
    #[error("Recognition failed on page {page}: {message}")]
    Recognition { page: u32, message: String },

    /// An external engine did not finish in time.
    #[error("{0} timed out after {1:?}")]
    Timeout(String, std::time::Duration),

    /// Processing was cancelled by the caller.
    #[error("Processing cancelled after {0} pages")]
    Cancelled(u32),

    /// Page number is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// A start or end pattern is not a valid regular expression.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// An option value is outside its accepted range.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Error decoding or encoding a raster image.
    #[error("Image error: {0}")]
    Image(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Page number the error is attached to, if any.
    pub fn page(&self) -> Option<u32> {
        match self {
            Error::TextExtract { page, .. }
            | Error::Rasterize { page, .. }
            | Error::Recognition { page, .. } => Some(*page),
            Error::PageOutOfRange(page, _) => Some(*page),
            _ => None,
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}
