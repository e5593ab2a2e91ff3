//! Extraction options and configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// Lowest accepted render resolution for the OCR fallback.
pub const MIN_DPI: u32 = 150;
/// Highest accepted render resolution for the OCR fallback.
pub const MAX_DPI: u32 = 600;

/// Options for extracting the text of a document.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// OCR language hint (tesseract codes, e.g. "jpn+eng")
    pub ocr_lang: String,

    /// Render resolution used when falling back to OCR
    pub dpi: u32,

    /// Pages whose stripped embedded text is shorter than this are OCR'd
    pub min_chars: usize,

    /// Order text by layout blocks instead of the flow order
    pub keep_layout: bool,

    /// Extract pages concurrently
    pub parallel: bool,

    /// What to do when a page cannot be recognized
    pub error_mode: ErrorMode,

    /// Deadline for each external rasterize/recognize call
    pub ocr_timeout: Option<Duration>,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the OCR language hint.
    pub fn with_ocr_lang(mut self, lang: impl Into<String>) -> Self {
        self.ocr_lang = lang.into();
        self
    }

    /// Set the OCR render resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Set the OCR switch-over threshold.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Enable or disable layout-ordered extraction.
    pub fn with_layout(mut self, keep_layout: bool) -> Self {
        self.keep_layout = keep_layout;
        self
    }

    /// Enable or disable parallel page extraction.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Keep going when a page fails to be recognized.
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Set the per-call deadline for external engines.
    pub fn with_ocr_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ocr_timeout = timeout;
        self
    }

    /// Check that every value is inside its accepted range.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_DPI..=MAX_DPI).contains(&self.dpi) {
            return Err(Error::InvalidOption(format!(
                "dpi must be between {} and {}, got {}",
                MIN_DPI, MAX_DPI, self.dpi
            )));
        }
        if self.ocr_lang.trim().is_empty() {
            return Err(Error::InvalidOption(
                "OCR language must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            ocr_lang: "jpn+eng".to_string(),
            dpi: 300,
            min_chars: 10,
            keep_layout: false,
            parallel: false,
            error_mode: ErrorMode::Strict,
            ocr_timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Error handling mode for pages that cannot be recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Abort the document on the first failing page
    #[default]
    Strict,
    /// Keep the page's embedded text, record the failure and continue
    Lenient,
}
