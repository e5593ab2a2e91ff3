//! Page rasterization through poppler's `pdftoppm`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use image::RgbImage;

use crate::command;
use crate::error::{Error, Result};

/// Renders a single PDF page to pixels.
pub trait Rasterizer: Send + Sync {
    /// Render `page` (1-based) of the PDF at `pdf_path` at `dpi`.
    fn rasterize(&self, pdf_path: &Path, page: u32, dpi: u32) -> Result<RgbImage>;
}

/// [`Rasterizer`] backed by the `pdftoppm` command-line tool.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl PdftoppmRasterizer {
    /// Use `pdftoppm` from `PATH`.
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("pdftoppm"),
            timeout: Some(Duration::from_secs(120)),
        }
    }

    /// Use a specific `pdftoppm` binary.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Set the per-page render deadline (`None` waits forever).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether the configured binary can be spawned.
    pub fn is_available(&self) -> bool {
        command::is_available(&self.program.to_string_lossy())
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(&self, pdf_path: &Path, page: u32, dpi: u32) -> Result<RgbImage> {
        let scratch = tempfile::tempdir()?;
        let out_root = scratch.path().join("page");

        let mut cmd = Command::new(&self.program);
        cmd.arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-png")
            .arg("-singlefile")
            .arg(pdf_path)
            .arg(&out_root);

        log::debug!("rendering page {} at {} dpi", page, dpi);
        command::run(cmd, None, self.timeout)?.check("pdftoppm")?;

        let png = out_root.with_extension("png");
        if !png.exists() {
            return Err(Error::Other(format!(
                "pdftoppm produced no image for page {}",
                page
            )));
        }
        Ok(image::open(&png)?.to_rgb8())
    }
}
