pub mod session;

pub use session::{AdapterError, MemorySessionAdapter, SessionAdapter};
