//! Overlay surface that writes each drawn pass to disk

use std::path::{Path, PathBuf};

use overlay_engine::{Color, DrawSurface, Font, RasterSurface, Rect, Stroke};
use tracing::{debug, warn};

/// Raster surface that saves `overlay_NNNNN.png` plus a JSON sidecar of its
/// label text every time a non-empty pass is presented
pub struct FrameDumpSurface {
    raster: RasterSurface,
    dir: PathBuf,
    written: usize,
    drawn: bool,
}

impl FrameDumpSurface {
    pub fn new(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            raster: RasterSurface::default(),
            dir: dir.to_path_buf(),
            written: 0,
            drawn: false,
        })
    }

    /// Number of frames written so far
    pub fn written(&self) -> usize {
        self.written
    }

    fn write_pass(&self, index: usize) -> anyhow::Result<()> {
        let image_path = self.dir.join(format!("overlay_{:05}.png", index));
        self.raster.save(&image_path)?;

        let labels = serde_json::to_vec_pretty(self.raster.text_runs())?;
        std::fs::write(self.dir.join(format!("overlay_{:05}.json", index)), labels)?;
        debug!("Wrote {}", image_path.display());
        Ok(())
    }
}

impl DrawSurface for FrameDumpSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.raster.resize(width, height);
    }

    fn clear(&mut self) {
        self.raster.clear();
        self.drawn = false;
    }

    fn stroke_rect(&mut self, rect: Rect, stroke: Stroke) {
        self.drawn = true;
        self.raster.stroke_rect(rect, stroke);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.drawn = true;
        self.raster.fill_rect(rect, color);
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font: Font, color: Color) {
        self.drawn = true;
        self.raster.fill_text(text, x, y, font, color);
    }

    fn present(&mut self) {
        if !self.drawn {
            return;
        }
        match self.write_pass(self.written) {
            Ok(()) => self.written += 1,
            Err(e) => warn!("Failed to write overlay frame: {}", e),
        }
    }
}
