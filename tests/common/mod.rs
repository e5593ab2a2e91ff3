//! In-memory document source and OCR engine shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use image::RgbImage;
use pdfsection::error::{Error, Result};
use pdfsection::{DocumentSource, OcrEngine, TextBlock};

/// One page of a mock document.
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub text: String,
    pub blocks: Vec<TextBlock>,
    pub unreadable: bool,
    pub unrenderable: bool,
}

impl MockPage {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn blocks(blocks: Vec<TextBlock>) -> Self {
        Self {
            blocks,
            ..Default::default()
        }
    }

    pub fn unreadable() -> Self {
        Self {
            unreadable: true,
            ..Default::default()
        }
    }

    pub fn unrenderable(text: &str) -> Self {
        Self {
            text: text.to_string(),
            unrenderable: true,
            ..Default::default()
        }
    }
}

/// Document source backed by a list of pages.
///
/// Rendered images encode the page number as their width so the mock OCR
/// engine can tell pages apart.
#[derive(Debug, Default)]
pub struct MockSource {
    pub pages: Vec<MockPage>,
}

impl MockSource {
    pub fn new(pages: Vec<MockPage>) -> Self {
        Self { pages }
    }

    pub fn from_texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| MockPage::text(t)).collect())
    }

    fn page(&self, page: u32) -> Result<&MockPage> {
        let count = self.page_count();
        page.checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .ok_or(Error::PageOutOfRange(page, count))
    }
}

impl DocumentSource for MockSource {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page: u32) -> Result<String> {
        let p = self.page(page)?;
        if p.unreadable {
            return Err(Error::TextExtract {
                page,
                message: "broken content stream".to_string(),
            });
        }
        Ok(p.text.clone())
    }

    fn page_blocks(&self, page: u32) -> Result<Vec<TextBlock>> {
        Ok(self.page(page)?.blocks.clone())
    }

    fn page_raster(&self, page: u32, _dpi: u32) -> Result<RgbImage> {
        if self.page(page)?.unrenderable {
            return Err(Error::Other("renderer crashed".to_string()));
        }
        Ok(RgbImage::new(page, 1))
    }
}

/// OCR engine returning canned text per page.
#[derive(Debug, Default)]
pub struct MockOcr {
    pub texts: BTreeMap<u32, String>,
    pub fail: bool,
    pub calls: AtomicUsize,
    pub langs: Mutex<Vec<String>>,
}

impl MockOcr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32, text: &str) -> Self {
        self.texts.insert(page, text.to_string());
        self
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for MockOcr {
    fn recognize(&self, image: &RgbImage, lang: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut langs) = self.langs.lock() {
            langs.push(lang.to_string());
        }
        if self.fail {
            return Err(Error::Other("engine exited with status 1".to_string()));
        }
        Ok(self.texts.get(&image.width()).cloned().unwrap_or_default())
    }
}
