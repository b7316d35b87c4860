//! Core types and shared functionality for docshelf.
//!
//! This crate provides:
//! - The document object cache with LRU eviction
//! - SQLite and in-memory storage backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheConfig, CacheDb, CacheStats, CacheStore};
pub use config::AppConfig;
pub use error::Error;
