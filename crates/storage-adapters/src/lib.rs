//! # storage-adapters
//!
//! Concrete implementations of the `domains` storage ports.
//!
//! The in-memory store and cache are always compiled: they back the
//! test suites and local development without infrastructure. Postgres,
//! Redis and the local media store are feature-gated.

pub mod memory;

#[cfg(feature = "db-postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod cache_redis;

#[cfg(feature = "media-local")]
pub mod media_local;

pub use memory::{MemoryMediaStore, MemoryPageCache, MemoryRepo};

#[cfg(feature = "db-postgres")]
pub use postgres::PgRepo;

#[cfg(feature = "redis")]
pub use cache_redis::RedisPageCache;

#[cfg(feature = "media-local")]
pub use media_local::LocalMediaStore;
