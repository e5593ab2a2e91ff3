//! Per-page extraction with OCR fallback.

use serde::{Deserialize, Serialize};

use super::{ErrorMode, ExtractOptions};
use crate::error::{Error, Result};
use crate::ocr::OcrEngine;
use crate::source::{DocumentSource, TextBlock};

/// How the text of a page was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Embedded text layer
    Direct,
    /// OCR of the rendered page
    Recognized,
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionMethod::Direct => f.write_str("direct"),
            ExtractionMethod::Recognized => f.write_str("recognized"),
        }
    }
}

/// Text of one page plus the record of how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Page number (1-indexed)
    pub page: u32,
    /// Page text, unmodified
    pub text: String,
    /// Extraction method used
    pub method: ExtractionMethod,
    /// Characters in the whitespace-stripped text
    pub char_count: usize,
    /// Render resolution, when the page was recognized
    pub ocr_dpi: Option<u32>,
    /// Why recognition was skipped (lenient mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// Characters left after trimming surrounding whitespace.
pub fn stripped_char_count(text: &str) -> usize {
    text.trim().chars().count()
}

/// Extract one page, falling back to OCR when the text layer is too thin.
///
/// The fallback is one-way: recognized text is accepted whatever its
/// length.
pub fn extract_page<S, E>(
    source: &S,
    engine: &E,
    page: u32,
    options: &ExtractOptions,
) -> Result<ExtractionResult>
where
    S: DocumentSource + ?Sized,
    E: OcrEngine + ?Sized,
{
    let direct = match source.page_direct_text(page, options.keep_layout) {
        Ok(text) => text,
        Err(e) if options.error_mode == ErrorMode::Lenient => {
            log::warn!("page {}: text layer unreadable ({}), trying OCR", page, e);
            String::new()
        }
        Err(e) => return Err(e),
    };

    let char_count = stripped_char_count(&direct);
    if char_count >= options.min_chars {
        log::debug!("page {}: direct text ({} chars)", page, char_count);
        return Ok(ExtractionResult {
            page,
            text: direct,
            method: ExtractionMethod::Direct,
            char_count,
            ocr_dpi: None,
            failure: None,
        });
    }

    log::debug!(
        "page {}: {} chars below threshold {}, recognizing at {} dpi",
        page,
        char_count,
        options.min_chars,
        options.dpi
    );

    match recognize_page(source, engine, page, options) {
        Ok(text) => Ok(ExtractionResult {
            page,
            char_count: stripped_char_count(&text),
            text,
            method: ExtractionMethod::Recognized,
            ocr_dpi: Some(options.dpi),
            failure: None,
        }),
        Err(e) if options.error_mode == ErrorMode::Lenient => {
            log::warn!("page {}: {}; keeping embedded text", page, e);
            Ok(ExtractionResult {
                page,
                text: direct,
                method: ExtractionMethod::Direct,
                char_count,
                ocr_dpi: None,
                failure: Some(e.to_string()),
            })
        }
        Err(e) => Err(e),
    }
}

fn recognize_page<S, E>(source: &S, engine: &E, page: u32, options: &ExtractOptions) -> Result<String>
where
    S: DocumentSource + ?Sized,
    E: OcrEngine + ?Sized,
{
    let image = source
        .page_raster(page, options.dpi)
        .map_err(|e| Error::Rasterize {
            page,
            message: e.to_string(),
        })?;
    engine
        .recognize(&image, &options.ocr_lang)
        .map_err(|e| Error::Recognition {
            page,
            message: e.to_string(),
        })
}

/// Join text blocks top-to-bottom, then left-to-right.
///
/// Coordinates are compared at one decimal place. Trailing newlines of each
/// block are dropped and empty blocks skipped.
pub fn layout_text(mut blocks: Vec<TextBlock>) -> String {
    blocks.sort_by(|a, b| {
        round1(a.y0)
            .total_cmp(&round1(b.y0))
            .then(round1(a.x0).total_cmp(&round1(b.x0)))
    });

    blocks
        .iter()
        .map(|b| b.text.trim_end_matches('\n'))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn round1(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}
