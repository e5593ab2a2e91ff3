//! Whole-document extraction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::page::{extract_page, ExtractionResult};
use super::ExtractOptions;
use crate::error::{Error, Result};
use crate::ocr::OcrEngine;
use crate::source::DocumentSource;

/// Separator placed between consecutive pages of the assembled text.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Progress of a document after each finished page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Pages finished so far
    pub pages_done: u32,
    /// Pages in the document
    pub total_pages: u32,
}

impl Progress {
    /// Finished share in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total_pages == 0 {
            1.0
        } else {
            f64::from(self.pages_done) / f64::from(self.total_pages)
        }
    }
}

/// Cooperative cancellation flag shared with a running extraction.
///
/// Checked before each page; a page already being rendered or recognized
/// runs to completion (or to its engine deadline).
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// All page texts of a document joined in page order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Assembled {
    /// Page texts joined with [`PAGE_SEPARATOR`]
    pub text: String,
    /// One record per page, in page order
    pub pages: Vec<ExtractionResult>,
}

impl Assembled {
    /// Join per-page results into the assembled text.
    pub fn from_pages(pages: Vec<ExtractionResult>) -> Self {
        let text = pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR);
        Self { text, pages }
    }

    /// Number of pages that went through OCR.
    pub fn recognized_pages(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.method == super::ExtractionMethod::Recognized)
            .count()
    }

    /// Byte range of a page inside the assembled text.
    pub fn page_range(&self, page: u32) -> Option<std::ops::Range<usize>> {
        let mut start = 0;
        for result in &self.pages {
            let end = start + result.text.len();
            if result.page == page {
                return Some(start..end);
            }
            start = end + PAGE_SEPARATOR.len();
        }
        None
    }

    /// Page containing a byte offset of the assembled text.
    ///
    /// Offsets inside a separator belong to the page before it.
    pub fn page_at(&self, offset: usize) -> Option<u32> {
        let mut start = 0;
        for result in &self.pages {
            let end = start + result.text.len() + PAGE_SEPARATOR.len();
            if offset < end {
                return Some(result.page);
            }
            start = end;
        }
        None
    }
}

/// Extract every page in order and join them.
pub fn assemble<S, E>(source: &S, engine: &E, options: &ExtractOptions) -> Result<Assembled>
where
    S: DocumentSource + Sync + ?Sized,
    E: OcrEngine + Sync + ?Sized,
{
    assemble_with(source, engine, options, &CancelToken::new(), |_| {})
}

/// Extract every page in order, reporting progress and honouring `cancel`.
///
/// `progress` is called once per page with a strictly increasing
/// `pages_done`, also in parallel mode.
pub fn assemble_with<S, E, F>(
    source: &S,
    engine: &E,
    options: &ExtractOptions,
    cancel: &CancelToken,
    progress: F,
) -> Result<Assembled>
where
    S: DocumentSource + Sync + ?Sized,
    E: OcrEngine + Sync + ?Sized,
    F: Fn(Progress) + Sync,
{
    options.validate()?;

    let total_pages = source.page_count();
    log::debug!(
        "extracting {} pages ({})",
        total_pages,
        if options.parallel { "parallel" } else { "sequential" }
    );

    let done = Mutex::new(0u32);
    let run_page = |page: u32| -> Result<ExtractionResult> {
        if cancel.is_cancelled() {
            let finished = done.lock().map(|d| *d).unwrap_or_default();
            return Err(Error::Cancelled(finished));
        }
        let result = extract_page(source, engine, page, options)?;
        // Report under the lock so callers see a monotonic sequence.
        let mut finished = done
            .lock()
            .map_err(|_| Error::Other("progress lock poisoned".to_string()))?;
        *finished += 1;
        progress(Progress {
            pages_done: *finished,
            total_pages,
        });
        Ok(result)
    };

    let pages = if options.parallel {
        // Indexed collect keeps page order.
        (1..=total_pages)
            .into_par_iter()
            .map(run_page)
            .collect::<Result<Vec<_>>>()?
    } else {
        (1..=total_pages).map(run_page).collect::<Result<Vec<_>>>()?
    };

    Ok(Assembled::from_pages(pages))
}
