//! Value objects representing immutable domain concepts.

pub mod seek_location;


// Re-export commonly used types
pub use seek_location::{SeekLocation, SeekSource, DEFAULT_HEADER_FIELD};
