//! Optional PDF rasterization capability.
//!
//! PDF thumbnail support depends on a native rendering library that may not be
//! present at runtime. The capability is injected behind a trait with an
//! explicit supported/unsupported query, so the renderer treats a missing
//! backend as a normal "no thumbnail" branch instead of a load-time failure.

use std::sync::Arc;

use image::DynamicImage;

use crate::error::PdfError;

/// Rasterizes the first page of a PDF document.
pub trait PdfRasterizer: Send + Sync {
    /// Whether a rendering backend is actually available.
    fn supported(&self) -> bool;

    /// Render the first page, scaled so the longer edge is at most `max_dim`.
    fn rasterize_first_page(&self, data: &[u8], max_dim: u32) -> Result<DynamicImage, PdfError>;
}

/// Stand-in used when no PDF backend is compiled in or loadable.
pub struct NoPdfSupport;

impl PdfRasterizer for NoPdfSupport {
    fn supported(&self) -> bool {
        false
    }

    fn rasterize_first_page(&self, _data: &[u8], _max_dim: u32) -> Result<DynamicImage, PdfError> {
        Err(PdfError::Unsupported)
    }
}

/// Return the best rasterizer available in this build.
pub fn default_rasterizer() -> Arc<dyn PdfRasterizer> {
    #[cfg(feature = "pdfium")]
    {
        Arc::new(pdfium::PdfiumRasterizer)
    }
    #[cfg(not(feature = "pdfium"))]
    {
        Arc::new(NoPdfSupport)
    }
}

#[cfg(feature = "pdfium")]
mod pdfium {
    use image::DynamicImage;
    use pdfium_render::prelude::*;

    use super::PdfRasterizer;
    use crate::error::PdfError;

    /// Rasterizer backed by the system pdfium library.
    ///
    /// Bindings are established per call; pdfium itself is not thread-safe, and
    /// rendering a single thumbnail page is short-lived.
    pub struct PdfiumRasterizer;

    impl PdfRasterizer for PdfiumRasterizer {
        fn supported(&self) -> bool {
            Pdfium::bind_to_system_library().is_ok()
        }

        fn rasterize_first_page(
            &self,
            data: &[u8],
            max_dim: u32,
        ) -> Result<DynamicImage, PdfError> {
            let bindings = Pdfium::bind_to_system_library().map_err(|_| PdfError::Unsupported)?;
            let pdfium = Pdfium::new(bindings);

            let document = pdfium
                .load_pdf_from_byte_vec(data.to_vec(), None)
                .map_err(|e| PdfError::Render(e.to_string()))?;
            let page = document
                .pages()
                .get(0)
                .map_err(|e| PdfError::Render(e.to_string()))?;

            let config = PdfRenderConfig::new()
                .set_target_width(max_dim as i32)
                .set_maximum_height(max_dim as i32);
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| PdfError::Render(e.to_string()))?;

            Ok(bitmap.as_image())
        }
    }
}
