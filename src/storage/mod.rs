//! Storage Engine Module
//!
//! This module provides the in-memory key-value store for emberkv: a
//! thread-safe, sharded map from keys to entries with optional expiry.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Expiry
//!
//! Expiry is lazy: entries carry an absolute deadline and the command layer
//! compares it with the clock on every read. Nothing sweeps expired entries
//! out of memory; they stay until overwritten.
//!
//! ## Example
//!
//! ```
//! use emberkv::storage::StorageEngine;
//! use bytes::Bytes;
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//!
//! let engine = Arc::new(StorageEngine::new());
//!
//! engine.set(Bytes::from("name"), Bytes::from("zelda"));
//! engine.set_with_expiry(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     Instant::now() + Duration::from_secs(3600),
//! );
//! assert_eq!(engine.len(), 2);
//! ```

pub mod engine;

pub use engine::{Entry, StorageEngine};
