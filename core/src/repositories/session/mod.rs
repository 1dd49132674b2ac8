//! Session store contract backing single-active-session enforcement.

mod adapter;
mod memory;

pub use adapter::{AdapterError, SessionAdapter};
pub use memory::MemorySessionAdapter;
