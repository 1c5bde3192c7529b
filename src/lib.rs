//! # emberkv - A Small Redis-Compatible Key-Value Server
//!
//! emberkv speaks the RESP request/response protocol over TCP and keeps its
//! data in memory. Keys can carry a millisecond deadline; expiry is lazy and
//! only checked when a key is read.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              emberkv                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │──> Clock         │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │  ┌─────────────────┐  ┌──────────────────────────────────────────────┐  │
//! │  │ RequestDecoder  │  │              StorageEngine                   │  │
//! │  │ (streaming)     │  │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │  │
//! │  └─────────────────┘  │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │  │
//! │                       │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │  │
//! │                       │  └────────┘ └────────┘ └────────┘ └────────┘ │  │
//! │                       └──────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use emberkv::{handle_connection, CommandHandler, ConnectionStats, StorageEngine, SystemClock};
//! use emberkv::config::ReplicationRole;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let handler = CommandHandler::new(
//!         Arc::new(StorageEngine::new()),
//!         Arc::new(SystemClock),
//!         Arc::new(ReplicationRole::master()),
//!     );
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:6379").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         tokio::spawn(handle_connection(stream, addr, handler.clone(), Arc::clone(&stats)));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`
//! - `ECHO message`
//! - `GET key`
//! - `SET key value [PX milliseconds]`
//! - `INFO replication`
//!
//! ## Module Overview
//!
//! - [`protocol`]: streaming request decoder and reply encoding
//! - [`commands`]: the command set and its execution
//! - [`storage`]: sharded, thread-safe storage engine
//! - [`clock`]: time source used for expiry
//! - [`config`]: command-line configuration and replication role
//! - [`connection`]: client connection management
//!
//! ## Design Highlights
//!
//! ### Thread Safety
//!
//! The storage engine uses a sharded design with 64 independent RwLocks.
//! Writers to different keys rarely contend, and a reader always sees a whole
//! entry, never a value paired with another write's deadline.
//!
//! ### Lazy Expiry
//!
//! There is no background sweeper. `GET` compares the entry's deadline with
//! the clock and reports a miss once `now >= deadline`. The entry itself
//! stays until it is overwritten.
//!
//! ### Fail-Fast Decoding
//!
//! A malformed frame or unsupported command is an error for the whole
//! connection. The server replies `-ERR <reason>` and closes it.

pub mod clock;
pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use commands::{Command, CommandHandler};
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{DecodeError, RequestDecoder, RespValue};
pub use storage::StorageEngine;

/// The default port emberkv listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host emberkv binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of emberkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
