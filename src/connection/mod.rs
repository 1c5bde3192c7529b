//! Connection Module
//!
//! Each accepted client gets its own task running a [`ConnectionHandler`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (main.rs)                                │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │ accept() + spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌──────────────┐   ┌─────────────┐    ┌─────────────┐     │
//! │  │ Decode frame │──>│ Execute cmd │───>│ Send reply  │     │
//! │  └──────────────┘   └─────────────┘    └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests are answered strictly in arrival order, so clients may pipeline.
//!
//! ## Example
//!
//! ```ignore
//! use emberkv::clock::SystemClock;
//! use emberkv::commands::CommandHandler;
//! use emberkv::config::ReplicationRole;
//! use emberkv::connection::{handle_connection, ConnectionStats};
//! use emberkv::storage::StorageEngine;
//! use std::sync::Arc;
//!
//! let handler = CommandHandler::new(
//!     Arc::new(StorageEngine::new()),
//!     Arc::new(SystemClock),
//!     Arc::new(ReplicationRole::master()),
//! );
//! let stats = Arc::new(ConnectionStats::new());
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler.clone(), stats));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
