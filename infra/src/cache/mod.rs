//! Cache module for Redis-backed identity sessions
//!
//! This module provides the Redis client and the session adapter the token
//! engine uses for single-active-session enforcement.

pub mod redis_client;
pub mod session_adapter;


pub use redis_client::RedisClient;
pub use session_adapter::RedisSessionAdapter;

// Re-export commonly used types
pub use tw_shared::config::CacheConfig;
