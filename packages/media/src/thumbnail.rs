//! Best-effort thumbnail derivation.
//!
//! Given original file bytes and their declared media type, produce a small
//! PNG preview or decide that none is possible. Rendering must never fail the
//! enclosing write: every failure is logged and collapses to `None`, so a
//! corrupt or unsupported upload is still accepted and stored.

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat};
use tracing::{debug, warn};

use crate::pdf::PdfRasterizer;

/// All thumbnails are re-encoded to PNG regardless of source format.
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/png";

/// A derived preview image.
pub struct Thumbnail {
    pub data: Vec<u8>,
    pub content_type: &'static str,
}

/// Derives thumbnails from original content, dispatching on the declared
/// media type. The type is trusted as a dispatch key but not verified.
pub struct Thumbnailer {
    max_dim: u32,
    pdf: Arc<dyn PdfRasterizer>,
}

impl Thumbnailer {
    /// `max_dim` bounds the longer edge of every produced thumbnail.
    pub fn new(max_dim: u32, pdf: Arc<dyn PdfRasterizer>) -> Self {
        Self { max_dim, pdf }
    }

    /// Render a preview, or `None` when the type is not previewable or the
    /// content cannot be decoded. Never returns an error.
    pub fn render(&self, data: &[u8], declared_type: &str) -> Option<Thumbnail> {
        let declared = declared_type.trim().to_ascii_lowercase();

        if declared.starts_with("image/") {
            self.render_image(data)
        } else if declared == "application/pdf" {
            self.render_pdf(data)
        } else {
            // Deliberate gap: video/* and unknown types get no preview.
            None
        }
    }

    fn render_image(&self, data: &[u8]) -> Option<Thumbnail> {
        let img = match image::load_from_memory(data) {
            Ok(img) => img,
            Err(e) => {
                debug!(error = %e, "image decode failed, skipping thumbnail");
                return None;
            }
        };
        self.encode_png(img.thumbnail(self.max_dim, self.max_dim))
    }

    fn render_pdf(&self, data: &[u8]) -> Option<Thumbnail> {
        if !self.pdf.supported() {
            debug!("no PDF rasterizer available, skipping thumbnail");
            return None;
        }
        match self.pdf.rasterize_first_page(data, self.max_dim) {
            Ok(page) => self.encode_png(page.thumbnail(self.max_dim, self.max_dim)),
            Err(e) => {
                warn!(error = %e, "PDF rasterization failed, skipping thumbnail");
                None
            }
        }
    }

    fn encode_png(&self, img: DynamicImage) -> Option<Thumbnail> {
        let mut buf = Cursor::new(Vec::new());
        if let Err(e) = img.write_to(&mut buf, ImageFormat::Png) {
            warn!(error = %e, "thumbnail PNG encode failed");
            return None;
        }
        Some(Thumbnail {
            data: buf.into_inner(),
            content_type: THUMBNAIL_CONTENT_TYPE,
        })
    }
}
