//! Document access abstraction.
//!
//! The extraction core only talks to [`DocumentSource`]; the concrete PDF
//! library (lopdf) and the rasterizer live behind it.

mod lopdf_source;
mod raster;

pub use lopdf_source::LopdfSource;
pub use raster::{PdftoppmRasterizer, Rasterizer};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A rectangular run of text on a page.
///
/// Coordinates are in PDF points with the origin at the top-left corner of
/// the page, so `y0` grows downwards like a reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub y0: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub y1: f32,
    /// Block text, lines separated by `\n`
    pub text: String,
}

impl TextBlock {
    /// Create a new block.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32, text: impl Into<String>) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            text: text.into(),
        }
    }
}

/// Read-only access to the pages of one loaded document.
///
/// Pages are addressed by 1-based index.
pub trait DocumentSource {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Linear ("flow") text of a page.
    fn page_text(&self, page: u32) -> Result<String>;

    /// Text blocks of a page, in no particular order.
    fn page_blocks(&self, page: u32) -> Result<Vec<TextBlock>>;

    /// Render a page to an RGB image at the given resolution.
    ///
    /// The scale factor applied to the page is `dpi / 72`.
    fn page_raster(&self, page: u32, dpi: u32) -> Result<RgbImage>;

    /// Embedded text of a page, either flowed or block-ordered.
    fn page_direct_text(&self, page: u32, keep_layout: bool) -> Result<String> {
        if keep_layout {
            Ok(crate::extract::layout_text(self.page_blocks(page)?))
        } else {
            self.page_text(page)
        }
    }
}
