/// Error decoding a transport-encoded file payload.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The payload contains characters outside the base64 alphabet or has
    /// incorrect padding.
    #[error("invalid base64 payload: {0}")]
    Malformed(#[from] base64::DecodeError),
}

/// Error rasterizing a PDF page.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// No PDF rendering capability is available in this runtime.
    #[error("PDF rendering is not available")]
    Unsupported,
    /// The rendering backend rejected the document.
    #[error("PDF rendering failed: {0}")]
    Render(String),
}
