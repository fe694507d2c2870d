//! Page rasterization for QR decoding.
//!
//! Pages are rendered with `hayro` at `zoom` device pixels per PDF unit, so
//! the raster shows exactly what a viewer shows: the page's `/Rotate` is
//! applied, images sit where their `cm` places them, and codes drawn as
//! vector content are visible. The RGBA pixmap is composited onto white and
//! reduced to luma.

use std::sync::Arc;

use hayro::{InterpreterSettings, Pdf, RenderSettings};
use image::GrayImage;
use tracing::trace;

use crate::error::{ExamSplitError, Result};

/// Renders pages of one serialized PDF.
pub struct PageRenderer {
    pdf: Pdf,
}

impl PageRenderer {
    /// Parse `data` for rendering.
    ///
    /// # Errors
    ///
    /// [`ExamSplitError::Other`] if `hayro` cannot parse the document.
    pub fn new(data: Arc<Vec<u8>>) -> Result<Self> {
        let pdf = Pdf::new(data)
            .map_err(|e| ExamSplitError::other(format!("Failed to parse PDF for rendering: {e:?}")))?;
        Ok(Self { pdf })
    }

    /// Number of pages the renderer sees.
    pub fn page_count(&self) -> usize {
        self.pdf.pages().len()
    }

    /// Render the page at `index` as a grayscale raster.
    ///
    /// # Errors
    ///
    /// [`ExamSplitError::PageOutOfRange`] for a bad index and
    /// [`ExamSplitError::RenderFailed`] if the pixmap is empty.
    pub fn render(&self, index: usize, zoom: f32) -> Result<GrayImage> {
        let page = self
            .pdf
            .pages()
            .get(index)
            .ok_or(ExamSplitError::PageOutOfRange {
                index,
                total: self.page_count(),
            })?;

        let settings = RenderSettings {
            x_scale: zoom,
            y_scale: zoom,
            ..Default::default()
        };
        let pixmap = hayro::render(page, &InterpreterSettings::default(), &settings);

        let (width, height) = (u32::from(pixmap.width()), u32::from(pixmap.height()));
        if width == 0 || height == 0 {
            return Err(ExamSplitError::render_failed(index, "empty pixmap"));
        }
        trace!(page = index + 1, width, height, "page rendered");

        let luma = pixmap
            .data_as_u8_slice()
            .chunks_exact(4)
            .map(over_white)
            .collect();

        GrayImage::from_raw(width, height, luma)
            .ok_or_else(|| ExamSplitError::render_failed(index, "pixel buffer size mismatch"))
    }
}

/// Luma of an RGBA pixel drawn over a white page.
fn over_white(px: &[u8]) -> u8 {
    let luma = (299 * u32::from(px[0]) + 587 * u32::from(px[1]) + 114 * u32::from(px[2])) / 1000;
    let alpha = u32::from(px[3]);
    ((luma * alpha + 255 * (255 - alpha)) / 255) as u8
}
