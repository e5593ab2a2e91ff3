//! Extraction, section location and reformatting in one run.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::extract::{assemble_with, CancelToken, ExtractOptions, ExtractionResult, Progress};
use crate::ocr::OcrEngine;
use crate::reformat::{reformat, ReformatConfig};
use crate::source::DocumentSource;
use crate::span::{MatchSpec, Span, SpanLocator};

/// Options for a full pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Page extraction settings
    pub extract: ExtractOptions,

    /// Start marker of the section; no section is located when absent
    pub start: Option<MatchSpec>,

    /// End marker of the section; the section runs to the end when absent
    pub end: Option<MatchSpec>,

    /// Reformatting applied to the section and the full text, if any
    pub reformat: Option<ReformatConfig>,
}

impl PipelineOptions {
    /// Create pipeline options with default extraction and no section.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extract(mut self, extract: ExtractOptions) -> Self {
        self.extract = extract;
        self
    }

    pub fn with_start(mut self, start: MatchSpec) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: MatchSpec) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_reformat(mut self, config: ReformatConfig) -> Self {
        self.reformat = Some(config);
        self
    }

    /// Skip reformatting entirely.
    pub fn without_reformat(mut self) -> Self {
        self.reformat = None;
        self
    }
}

/// Every artifact of a pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessOutput {
    /// Assembled text of all pages
    pub full_text: String,

    /// Per-page extraction records
    pub pages: Vec<ExtractionResult>,

    /// Located section, when a start marker was given
    pub span: Option<Span>,

    /// Section text exactly as it appears in `full_text`
    pub section_raw: Option<String>,

    /// Reformatted section
    pub section_reformatted: Option<String>,

    /// Reformatted full text
    pub full_reformatted: Option<String>,

    /// Warnings raised during the run
    pub warnings: Vec<String>,
}

impl ProcessOutput {
    /// Best available section text: reformatted if present, raw otherwise.
    pub fn section(&self) -> Option<&str> {
        self.section_reformatted
            .as_deref()
            .or(self.section_raw.as_deref())
    }

    /// Pretty-printed JSON of the per-page records, span and warnings.
    pub fn report_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Report<'a> {
            pages: &'a [ExtractionResult],
            span: &'a Option<Span>,
            warnings: &'a [String],
        }

        serde_json::to_string_pretty(&Report {
            pages: &self.pages,
            span: &self.span,
            warnings: &self.warnings,
        })
        .map_err(|e| Error::Other(format!("failed to serialize report: {}", e)))
    }
}

/// Run the pipeline over a document.
///
/// Markers are compiled before any page is extracted, so an invalid pattern
/// fails fast. A missing section never prevents the full-text artifacts.
pub fn process<S, E, F>(
    source: &S,
    engine: &E,
    options: &PipelineOptions,
    cancel: &CancelToken,
    progress: F,
) -> Result<ProcessOutput>
where
    S: DocumentSource + Sync + ?Sized,
    E: OcrEngine + Sync + ?Sized,
    F: Fn(Progress) + Sync,
{
    let locator = options
        .start
        .as_ref()
        .map(|start| SpanLocator::new(start, options.end.as_ref()))
        .transpose()?;

    let assembled = assemble_with(source, engine, &options.extract, cancel, progress)?;

    let mut warnings: Vec<String> = assembled
        .pages
        .iter()
        .filter_map(|p| {
            p.failure
                .as_ref()
                .map(|f| format!("page {}: {}", p.page, f))
        })
        .collect();

    let span = locator.map(|l| l.locate(&assembled.text));
    if let Some(warning) = span.as_ref().and_then(|s| s.warning.as_ref()) {
        log::warn!("{}", warning);
        warnings.push(warning.clone());
    }

    let section_raw = span
        .as_ref()
        .and_then(|s| s.slice(&assembled.text))
        .map(str::to_string);

    let (section_reformatted, full_reformatted) = match &options.reformat {
        Some(config) => (
            section_raw.as_deref().map(|s| reformat(s, config)),
            Some(reformat(&assembled.text, config)),
        ),
        None => (None, None),
    };

    log::info!(
        "processed {} pages ({} recognized), {} bytes of text",
        assembled.pages.len(),
        assembled.recognized_pages(),
        assembled.text.len()
    );

    Ok(ProcessOutput {
        full_text: assembled.text,
        pages: assembled.pages,
        span,
        section_raw,
        section_reformatted,
        full_reformatted,
        warnings,
    })
}
