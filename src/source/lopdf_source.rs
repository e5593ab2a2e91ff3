//! [`DocumentSource`] backed by lopdf.
//!
//! Flow text comes straight from lopdf's text extractor. Layout blocks are
//! rebuilt from the content stream: text-showing operators are positioned
//! with the text matrix, grouped into baselines, and baselines are grouped
//! into blocks by vertical gap.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use image::RgbImage;
use lopdf::{Document as LopdfDocument, Object, ObjectId};
use tempfile::NamedTempFile;

use super::{DocumentSource, PdftoppmRasterizer, Rasterizer, TextBlock};
use crate::detect;
use crate::error::{Error, Result};

/// Default US Letter media box, used when a page declares none.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

/// Where the rasterizer reads the PDF from.
enum Origin {
    File(PathBuf),
    Memory {
        data: Vec<u8>,
        spill: OnceLock<NamedTempFile>,
    },
}

/// A PDF loaded with lopdf.
pub struct LopdfSource {
    doc: LopdfDocument,
    pages: BTreeMap<u32, ObjectId>,
    origin: Origin,
    rasterizer: Box<dyn Rasterizer>,
}

impl LopdfSource {
    /// Load from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        detect::sniff_path(path)?;
        let doc = LopdfDocument::load(path)?;
        Ok(Self::with_origin(doc, Origin::File(path.to_path_buf())))
    }

    /// Load from an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        detect::sniff_bytes(data)?;
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self::with_origin(
            doc,
            Origin::Memory {
                data: data.to_vec(),
                spill: OnceLock::new(),
            },
        ))
    }

    fn with_origin(doc: LopdfDocument, origin: Origin) -> Self {
        if doc.is_encrypted() {
            log::warn!("document is encrypted; embedded text may be unreadable");
        }
        let pages = doc.get_pages();
        Self {
            doc,
            pages,
            origin,
            rasterizer: Box::new(PdftoppmRasterizer::new()),
        }
    }

    /// Replace the rasterizer used for the OCR fallback.
    pub fn with_rasterizer(mut self, rasterizer: impl Rasterizer + 'static) -> Self {
        self.rasterizer = Box::new(rasterizer);
        self
    }

    /// PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.pages
            .get(&page)
            .copied()
            .ok_or(Error::PageOutOfRange(page, self.pages.len() as u32))
    }

    /// Path of the PDF on disk, spilling in-memory bytes on first use.
    fn disk_path(&self) -> Result<PathBuf> {
        match &self.origin {
            Origin::File(path) => Ok(path.clone()),
            Origin::Memory { data, spill } => {
                if spill.get().is_none() {
                    let mut file = tempfile::Builder::new()
                        .prefix("pdfsection-")
                        .suffix(".pdf")
                        .tempfile()?;
                    file.write_all(data)?;
                    file.flush()?;
                    // Losing the race to another page thread is fine; the
                    // spare file is dropped and removed here.
                    let _ = spill.set(file);
                }
                spill
                    .get()
                    .map(|f| f.path().to_path_buf())
                    .ok_or_else(|| Error::Other("failed to spill PDF to disk".to_string()))
            }
        }
    }

    /// Page height from the (possibly inherited) media box.
    fn page_size(&self, page_id: ObjectId) -> (f32, f32) {
        let mut current = Some(page_id);
        while let Some(id) = current {
            let Ok(dict) = self.doc.get_dictionary(id) else {
                break;
            };
            if let Ok(array) = dict.get(b"MediaBox").and_then(Object::as_array) {
                let nums: Vec<f32> = array.iter().filter_map(number).collect();
                if nums.len() >= 4 {
                    return ((nums[2] - nums[0]).abs(), (nums[3] - nums[1]).abs());
                }
            }
            current = dict.get(b"Parent").and_then(Object::as_reference).ok();
        }
        DEFAULT_PAGE_SIZE
    }

    /// Positioned text runs of a page in PDF user space (bottom-left origin).
    fn page_spans(&self, page: u32, page_id: ObjectId) -> Result<Vec<Span>> {
        let fonts = self
            .doc
            .get_page_fonts(page_id)
            .map_err(|e| text_error(page, e))?;
        let content = self
            .doc
            .get_page_content(page_id)
            .map_err(|e| text_error(page, e))?;
        let content =
            lopdf::content::Content::decode(&content).map_err(|e| text_error(page, e))?;

        let mut spans = Vec::new();
        let mut font_name: Vec<u8> = Vec::new();
        let mut font_size: f32 = 12.0;
        let mut leading: f32 = 0.0;
        let mut matrix = TextMatrix::default();
        let mut in_text = false;

        for op in &content.operations {
            match op.operator.as_str() {
                "BT" => {
                    in_text = true;
                    matrix = TextMatrix::default();
                }
                "ET" => in_text = false,
                "Tf" if op.operands.len() >= 2 => {
                    if let Object::Name(name) = &op.operands[0] {
                        font_name = name.clone();
                    }
                    font_size = number(&op.operands[1]).unwrap_or(12.0);
                }
                "TL" => leading = op.operands.first().and_then(number).unwrap_or(0.0),
                "Td" | "TD" if op.operands.len() >= 2 => {
                    let tx = number(&op.operands[0]).unwrap_or(0.0);
                    let ty = number(&op.operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        leading = -ty;
                    }
                    matrix.translate(tx, ty);
                }
                "Tm" if op.operands.len() >= 6 => {
                    let v: Vec<f32> = op.operands.iter().map(|o| number(o).unwrap_or(0.0)).collect();
                    matrix.set(v[0], v[1], v[2], v[3], v[4], v[5]);
                }
                "T*" => matrix.translate(0.0, -leading_or_default(leading, font_size)),
                "Tj" | "TJ" | "'" | "\"" if in_text => {
                    if op.operator == "'" || op.operator == "\"" {
                        matrix.translate(0.0, -leading_or_default(leading, font_size));
                    }
                    let text = self.show_text(&fonts, &font_name, op);
                    if !text.trim().is_empty() {
                        let (x, y) = matrix.position();
                        let size = font_size * matrix.scale();
                        spans.push(Span { text, x, y, size });
                    }
                }
                _ => {}
            }
        }

        Ok(spans)
    }

    /// Decode the string operand(s) of a text-showing operator.
    fn show_text(
        &self,
        fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
        font_name: &[u8],
        op: &lopdf::content::Operation,
    ) -> String {
        let encoding = fonts
            .get(font_name)
            .and_then(|f| f.get_font_encoding(&self.doc).ok());
        let decode = |bytes: &[u8]| match &encoding {
            Some(enc) => LopdfDocument::decode_text(enc, bytes)
                .unwrap_or_else(|_| decode_text_simple(bytes)),
            None => decode_text_simple(bytes),
        };

        let operand = match op.operator.as_str() {
            "\"" => op.operands.get(2),
            _ => op.operands.first(),
        };

        match operand {
            Some(Object::String(bytes, _)) => decode(bytes),
            Some(Object::Array(items)) => {
                let mut combined = String::new();
                for item in items {
                    match item {
                        Object::String(bytes, _) => combined.push_str(&decode(bytes)),
                        other => {
                            // Large negative kerning is a word gap in Latin text.
                            if let Some(adjust) = number(other) {
                                if -adjust > 200.0 && needs_word_space(&combined) {
                                    combined.push(' ');
                                }
                            }
                        }
                    }
                }
                combined
            }
            _ => String::new(),
        }
    }
}

impl DocumentSource for LopdfSource {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page: u32) -> Result<String> {
        self.page_id(page)?;
        self.doc
            .extract_text(&[page])
            .map_err(|e| text_error(page, e))
    }

    fn page_blocks(&self, page: u32) -> Result<Vec<TextBlock>> {
        let page_id = self.page_id(page)?;
        let (_, height) = self.page_size(page_id);
        let spans = self.page_spans(page, page_id)?;
        Ok(group_blocks(group_lines(spans), height))
    }

    fn page_raster(&self, page: u32, dpi: u32) -> Result<RgbImage> {
        self.page_id(page)?;
        let path = self.disk_path()?;
        self.rasterizer.rasterize(&path, page, dpi)
    }
}

fn text_error(page: u32, err: impl std::fmt::Display) -> Error {
    Error::TextExtract {
        page,
        message: err.to_string(),
    }
}

/// One decoded text-showing operation.
#[derive(Debug, Clone)]
struct Span {
    text: String,
    x: f32,
    y: f32,
    size: f32,
}

impl Span {
    /// Rough advance width; glyph metrics are not consulted.
    fn width(&self) -> f32 {
        self.text
            .chars()
            .map(|c| if is_spaceless_script_char(c) { 1.0 } else { 0.5 })
            .sum::<f32>()
            * self.size
    }
}

/// Spans sharing a baseline.
#[derive(Debug, Clone)]
struct Line {
    text: String,
    x0: f32,
    x1: f32,
    y: f32,
    size: f32,
}

fn group_lines(mut spans: Vec<Span>) -> Vec<Line> {
    // Top of the page first (PDF y grows upwards), then left to right.
    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut lines: Vec<Vec<Span>> = Vec::new();
    for span in spans {
        match lines.last_mut() {
            Some(line) if (line[0].y - span.y).abs() <= span.size.max(1.0) * 0.3 => line.push(span),
            _ => lines.push(vec![span]),
        }
    }

    lines
        .into_iter()
        .map(|mut spans| {
            spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
            let mut text = String::new();
            let mut cursor: Option<f32> = None;
            for span in &spans {
                if let Some(end) = cursor {
                    if span.x - end > span.size * 0.25 && needs_word_space(&text) {
                        text.push(' ');
                    }
                }
                text.push_str(&span.text);
                cursor = Some(span.x + span.width());
            }
            let size = spans.iter().map(|s| s.size).fold(0.0, f32::max);
            Line {
                text,
                x0: spans[0].x,
                x1: cursor.unwrap_or(spans[0].x),
                y: spans[0].y,
                size,
            }
        })
        .collect()
}

/// Group consecutive lines into blocks and convert to top-left coordinates.
fn group_blocks(lines: Vec<Line>, page_height: f32) -> Vec<TextBlock> {
    let mut blocks: Vec<Vec<Line>> = Vec::new();
    for line in lines {
        match blocks.last_mut() {
            Some(block) if continues_block(block, &line) => block.push(line),
            _ => blocks.push(vec![line]),
        }
    }

    blocks
        .into_iter()
        .map(|lines| {
            let x0 = lines.iter().map(|l| l.x0).fold(f32::MAX, f32::min);
            let x1 = lines.iter().map(|l| l.x1).fold(f32::MIN, f32::max);
            let top = lines.iter().map(|l| l.y + l.size * 0.8).fold(f32::MIN, f32::max);
            let bottom = lines.iter().map(|l| l.y - l.size * 0.2).fold(f32::MAX, f32::min);
            let text = lines
                .iter()
                .map(|l| l.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            TextBlock::new(x0, page_height - top, x1, page_height - bottom, text + "\n")
        })
        .collect()
}

fn continues_block(block: &[Line], line: &Line) -> bool {
    let Some(prev) = block.last() else {
        return false;
    };
    let gap = prev.y - line.y;
    let overlaps = line.x0 <= prev.x1 && prev.x0 <= line.x1;
    gap > 0.0 && gap <= prev.size.max(line.size) * 1.6 && overlaps
}

fn leading_or_default(leading: f32, font_size: f32) -> f32 {
    if leading != 0.0 {
        leading
    } else {
        font_size * 1.2
    }
}

#[derive(Debug, Clone, Copy)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }
}

impl TextMatrix {
    fn set(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        *self = Self { a, b, c, d, e, f };
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.e += tx * self.a + ty * self.c;
        self.f += tx * self.b + ty * self.d;
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn scale(&self) -> f32 {
        (self.b * self.b + self.d * self.d).sqrt()
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn needs_word_space(text: &str) -> bool {
    match text.chars().last() {
        Some(c) => !c.is_whitespace() && !is_spaceless_script_char(c),
        None => false,
    }
}

/// Scripts written without spaces between words (Han, kana, CJK punctuation).
fn is_spaceless_script_char(c: char) -> bool {
    matches!(c as u32,
        0x3000..=0x303F
        | 0x3040..=0x309F
        | 0x30A0..=0x30FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xFF00..=0xFFEF
        | 0x20000..=0x2EBEF)
}

/// Decode a string operand when the font gives no usable encoding.
fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        // Latin-1
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, x: f32, y: f32) -> Span {
        Span {
            text: text.to_string(),
            x,
            y,
            size: 10.0,
        }
    }

    #[test]
    fn test_decode_text_simple() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
        assert_eq!(decode_text_simple(&[0x48, 0x65, 0x6C, 0x6C, 0xE9]), "Hellé");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
    }

    #[test]
    fn test_text_matrix_translate() {
        let mut m = TextMatrix::default();
        m.set(2.0, 0.0, 0.0, 2.0, 10.0, 700.0);
        m.translate(5.0, -6.0);
        assert_eq!(m.position(), (20.0, 688.0));
        assert_eq!(m.scale(), 2.0);
    }

    #[test]
    fn test_group_lines_merges_baseline() {
        let lines = group_lines(vec![
            span("world", 60.0, 700.0),
            span("Hello", 20.0, 700.5),
            span("Next", 20.0, 686.0),
        ]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Hello world");
        assert_eq!(lines[1].text, "Next");
    }

    #[test]
    fn test_group_lines_no_space_for_cjk() {
        let lines = group_lines(vec![span("日本", 20.0, 700.0), span("語", 45.0, 700.0)]);
        assert_eq!(lines[0].text, "日本語");
    }

    #[test]
    fn test_group_blocks_splits_on_gap_and_flips_y() {
        let lines = group_lines(vec![
            span("first", 20.0, 700.0),
            span("second", 20.0, 688.0),
            span("far below", 20.0, 400.0),
        ]);
        let blocks = group_blocks(lines, 792.0);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].text, "first\nsecond\n");
        assert_eq!(blocks[1].text, "far below\n");
        assert!(blocks[0].y0 < blocks[1].y0);
        assert!((blocks[0].y0 - 84.0).abs() < 0.01);
    }

    #[test]
    fn test_group_blocks_separates_columns() {
        let lines = group_lines(vec![
            span("left", 20.0, 700.0),
            span("right", 320.0, 700.0),
        ]);
        // Same baseline joins into one line; columns on separate baselines do not.
        assert_eq!(lines.len(), 1);

        let lines = vec![
            Line {
                text: "left".into(),
                x0: 20.0,
                x1: 40.0,
                y: 700.0,
                size: 10.0,
            },
            Line {
                text: "right".into(),
                x0: 320.0,
                x1: 345.0,
                y: 690.0,
                size: 10.0,
            },
        ];
        assert_eq!(group_blocks(lines, 792.0).len(), 2);
    }

    #[test]
    fn test_from_bytes_rejects_non_pdf() {
        assert!(matches!(
            LopdfSource::from_bytes(b"not a pdf at all"),
            Err(Error::UnknownFormat)
        ));
    }
}
