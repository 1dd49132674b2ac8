//! Domain layer containing token entities and value objects.

pub mod entities;
pub mod value_objects;

// Re-export commonly used domain types
pub use entities::{
    Claims, Payload, Token, DEFAULT_SESSION_GRACE_SECONDS, DEFAULT_TOKEN_TTL_SECONDS,
    MAX_TOKEN_TTL_SECONDS,
};
pub use value_objects::{SeekLocation, SeekSource};
