//! Material content pipeline: the transport codec for file payloads and the
//! best-effort thumbnail renderer with its optional PDF capability.

pub mod codec;
pub mod error;
pub mod pdf;
pub mod thumbnail;

pub use error::{CodecError, PdfError};
pub use thumbnail::{Thumbnail, Thumbnailer};
