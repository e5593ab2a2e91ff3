//! Page text extraction with OCR fallback, and document assembly.

mod assemble;
mod options;
mod page;

pub use assemble::{assemble, assemble_with, Assembled, CancelToken, Progress, PAGE_SEPARATOR};
pub use options::{ErrorMode, ExtractOptions, MAX_DPI, MIN_DPI};
pub use page::{
    extract_page, layout_text, stripped_char_count, ExtractionMethod, ExtractionResult,
};
