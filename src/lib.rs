//! # pdfsection
//!
//! Extract the text of a PDF, locate a section of it between two markers,
//! and reformat the result for reading.
//!
//! Pages with a usable text layer are read directly; pages whose embedded
//! text is too thin (scans, image-only pages) are rendered and passed to
//! OCR instead.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfsection::{MatchSpec, PdfSection};
//!
//! fn main() -> pdfsection::Result<()> {
//!     let output = PdfSection::new()
//!         .with_ocr_lang("jpn+eng")
//!         .with_start(MatchSpec::regex(r"^\s*第\s*2\s*章.*$"))
//!         .with_end(MatchSpec::regex(r"^\s*第\s*3\s*章\b"))
//!         .process_file("paper.pdf")?;
//!
//!     if let Some(section) = output.section() {
//!         println!("{}", section);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **OCR fallback**: per page, via `pdftoppm` and `tesseract`
//! - **Layout mode**: text blocks ordered top-to-bottom, left-to-right
//! - **Section location**: literal or regex start/end markers
//! - **Reformatting**: line-wrap joins, hyphenation repair, whitespace cleanup
//! - **Parallel processing**: uses Rayon for multi-page documents

mod command;
pub mod detect;
pub mod error;
pub mod extract;
pub mod ocr;
pub mod pipeline;
pub mod reformat;
pub mod source;
pub mod span;

// Re-export commonly used types
pub use detect::{is_pdf_bytes, sniff_bytes, sniff_path, PdfHeader};
pub use error::{Error, Result};
pub use extract::{
    assemble, assemble_with, Assembled, CancelToken, ErrorMode, ExtractOptions, ExtractionMethod,
    ExtractionResult, Progress,
};
pub use ocr::{OcrEngine, TesseractEngine};
pub use pipeline::{process, PipelineOptions, ProcessOutput};
pub use reformat::{reformat, ReformatConfig};
pub use source::{DocumentSource, LopdfSource, PdftoppmRasterizer, Rasterizer, TextBlock};
pub use span::{MatchSpec, Span, SpanLocator};

use std::path::Path;

/// Extract the assembled text of a PDF held in memory.
///
/// # Example
///
/// ```no_run
/// use pdfsection::{extract_document, ExtractOptions};
///
/// let data = std::fs::read("document.pdf").unwrap();
/// let assembled = extract_document(&data, &ExtractOptions::default()).unwrap();
/// println!("{}", assembled.text);
/// ```
pub fn extract_document(data: &[u8], options: &ExtractOptions) -> Result<Assembled> {
    let source = load_bytes(data, options)?;
    assemble(&source, &tesseract(options), options)
}

/// Extract the assembled text of a PDF file.
///
/// # Example
///
/// ```no_run
/// use pdfsection::{extract_file, ExtractOptions};
///
/// let options = ExtractOptions::new().with_layout(true);
/// let assembled = extract_file("document.pdf", &options).unwrap();
/// println!("{} pages", assembled.pages.len());
/// ```
pub fn extract_file<P: AsRef<Path>>(path: P, options: &ExtractOptions) -> Result<Assembled> {
    let source = load_file(path, options)?;
    assemble(&source, &tesseract(options), options)
}

/// Locate the section of `text` between two markers.
///
/// `end` may be omitted or empty, in which case the section runs to the end
/// of the text. Both markers are literal or both are regular expressions.
///
/// # Example
///
/// ```
/// use pdfsection::locate_span;
///
/// let text = "intro\nChapter 2\nbody\nChapter 3\n";
/// let span = locate_span(text, "Chapter 2", Some("Chapter 3"), false).unwrap();
/// assert_eq!(span.slice(text), Some("Chapter 2\nbody\n"));
/// ```
pub fn locate_span(text: &str, start: &str, end: Option<&str>, is_regex: bool) -> Result<Span> {
    let start = MatchSpec::new(start, is_regex);
    let end = end.map(|e| MatchSpec::new(e, is_regex));
    span::locate(text, &start, end.as_ref())
}

/// Run the full pipeline over a PDF held in memory.
pub fn process_bytes(data: &[u8], options: &PipelineOptions) -> Result<ProcessOutput> {
    let source = load_bytes(data, &options.extract)?;
    process(
        &source,
        &tesseract(&options.extract),
        options,
        &CancelToken::new(),
        |_| {},
    )
}

/// Run the full pipeline over a PDF file.
pub fn process_file<P: AsRef<Path>>(path: P, options: &PipelineOptions) -> Result<ProcessOutput> {
    let source = load_file(path, &options.extract)?;
    process(
        &source,
        &tesseract(&options.extract),
        options,
        &CancelToken::new(),
        |_| {},
    )
}

fn load_bytes(data: &[u8], options: &ExtractOptions) -> Result<LopdfSource> {
    Ok(LopdfSource::from_bytes(data)?.with_rasterizer(pdftoppm(options)))
}

fn load_file<P: AsRef<Path>>(path: P, options: &ExtractOptions) -> Result<LopdfSource> {
    Ok(LopdfSource::open(path)?.with_rasterizer(pdftoppm(options)))
}

fn pdftoppm(options: &ExtractOptions) -> PdftoppmRasterizer {
    PdftoppmRasterizer::new().with_timeout(options.ocr_timeout)
}

fn tesseract(options: &ExtractOptions) -> TesseractEngine {
    TesseractEngine::new().with_timeout(options.ocr_timeout)
}

/// Builder for extracting and sectioning PDF documents.
///
/// # Example
///
/// ```no_run
/// use pdfsection::{MatchSpec, PdfSection};
///
/// let output = PdfSection::new()
///     .with_dpi(400)
///     .lenient()
///     .with_start(MatchSpec::literal("Methods"))
///     .with_end(MatchSpec::literal("Results"))
///     .process_file("paper.pdf")?;
/// println!("{}", output.full_text);
/// # Ok::<(), pdfsection::Error>(())
/// ```
pub struct PdfSection {
    options: PipelineOptions,
    cancel: CancelToken,
    progress: Option<Box<dyn Fn(Progress) + Send + Sync>>,
}

impl PdfSection {
    /// Create a builder with default extraction and reformatting.
    pub fn new() -> Self {
        Self {
            options: PipelineOptions::new().with_reformat(ReformatConfig::default()),
            cancel: CancelToken::new(),
            progress: None,
        }
    }

    /// Set the OCR language hint.
    pub fn with_ocr_lang(mut self, lang: impl Into<String>) -> Self {
        self.options.extract = self.options.extract.with_ocr_lang(lang);
        self
    }

    /// Set the OCR render resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.options.extract = self.options.extract.with_dpi(dpi);
        self
    }

    /// Set the OCR switch-over threshold.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.options.extract = self.options.extract.with_min_chars(min_chars);
        self
    }

    /// Order page text by layout blocks.
    pub fn with_layout(mut self) -> Self {
        self.options.extract = self.options.extract.with_layout(true);
        self
    }

    /// Extract pages concurrently.
    pub fn parallel(mut self) -> Self {
        self.options.extract = self.options.extract.with_parallel(true);
        self
    }

    /// Keep going when a page cannot be recognized.
    pub fn lenient(mut self) -> Self {
        self.options.extract = self.options.extract.lenient();
        self
    }

    /// Set the per-call deadline for the external OCR tools.
    pub fn with_ocr_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.options.extract = self.options.extract.with_ocr_timeout(timeout);
        self
    }

    /// Set the section start marker.
    pub fn with_start(mut self, start: MatchSpec) -> Self {
        self.options.start = Some(start);
        self
    }

    /// Set the section end marker.
    pub fn with_end(mut self, end: MatchSpec) -> Self {
        self.options.end = Some(end);
        self
    }

    /// Set the reformatting transforms.
    pub fn with_reformat(mut self, config: ReformatConfig) -> Self {
        self.options.reformat = Some(config);
        self
    }

    /// Skip reformatting.
    pub fn without_reformat(mut self) -> Self {
        self.options.reformat = None;
        self
    }

    /// Share a cancellation token with the run.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Receive progress after every finished page.
    pub fn on_progress(mut self, progress: impl Fn(Progress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// The options this builder will run with.
    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Process a PDF file.
    pub fn process_file<P: AsRef<Path>>(self, path: P) -> Result<ProcessOutput> {
        let source = load_file(path, &self.options.extract)?;
        let engine = tesseract(&self.options.extract);
        self.run(&source, &engine)
    }

    /// Process a PDF held in memory.
    pub fn process_bytes(self, data: &[u8]) -> Result<ProcessOutput> {
        let source = load_bytes(data, &self.options.extract)?;
        let engine = tesseract(&self.options.extract);
        self.run(&source, &engine)
    }

    /// Process any document source with any OCR engine.
    pub fn run<S, E>(self, source: &S, engine: &E) -> Result<ProcessOutput>
    where
        S: DocumentSource + Sync + ?Sized,
        E: OcrEngine + Sync + ?Sized,
    {
        let progress = self.progress;
        process(source, engine, &self.options, &self.cancel, |p| {
            if let Some(callback) = &progress {
                callback(p);
            }
        })
    }
}

impl Default for PdfSection {
    fn default() -> Self {
        Self::new()
    }
}
