//! Error types surfaced by the token engine.

mod types;


pub use types::{ErrorKind, TokenError, TokenResult};
