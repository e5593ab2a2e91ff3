//! Optical character recognition engines.

use std::io::Cursor;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use image::{ImageOutputFormat, RgbImage};

use crate::command;
use crate::error::Result;

/// Maps a page image plus a language hint to recognized text.
pub trait OcrEngine {
    /// Recognize the text in `image`.
    ///
    /// `lang` is passed through untouched (e.g. `"jpn+eng"` for tesseract).
    fn recognize(&self, image: &RgbImage, lang: &str) -> Result<String>;
}

/// [`OcrEngine`] backed by the `tesseract` command-line tool.
///
/// The image is piped as PNG to `tesseract stdin stdout`.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    program: PathBuf,
    timeout: Option<Duration>,
    psm: Option<u8>,
}

impl TesseractEngine {
    /// Use `tesseract` from `PATH` with a two minute deadline per page.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("tesseract"),
            timeout: Some(Duration::from_secs(120)),
            psm: None,
        }
    }

    /// Use a specific `tesseract` binary.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the per-page deadline (`None` waits forever).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set tesseract's page segmentation mode (`--psm`).
    pub fn with_page_segmentation(mut self, psm: u8) -> Self {
        self.psm = Some(psm);
        self
    }

    /// Whether the configured binary can be spawned.
    pub fn is_available(&self) -> bool {
        command::is_available(&self.program.to_string_lossy())
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &RgbImage, lang: &str) -> Result<String> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("stdin").arg("stdout");
        if !lang.is_empty() {
            cmd.arg("-l").arg(lang);
        }
        if let Some(psm) = self.psm {
            cmd.arg("--psm").arg(psm.to_string());
        }

        log::debug!(
            "running tesseract on {}x{} image (lang={})",
            image.width(),
            image.height(),
            lang
        );
        let out = command::run(cmd, Some(png), self.timeout)?.check("tesseract")?;
        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}
