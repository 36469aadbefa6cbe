//! One reducer per content family.
mod archive;
mod code;
mod image;
mod media;
mod pdf;

pub use archive::ArchiveReducer;
pub use code::{minify, CodeReducer, Dialect};
pub use image::ImageReducer;
pub use media::MediaReducer;
pub use pdf::PdfReducer;
