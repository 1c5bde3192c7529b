//! Command Module
//!
//! This module turns decoded requests into commands and executes them.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ RequestDecoder  │  (protocol module)
//! └────────┬────────┘
//!          │ tokens
//!          ▼
//! ┌─────────────────┐
//! │    Command      │  (command.rs: verb + arity validation)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (handler.rs: execute, build reply)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine   │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `PING`, `ECHO`, `INFO replication`
//! - `GET key`, `SET key value [PX milliseconds]`

pub mod command;
pub mod handler;

pub use command::Command;
pub use handler::CommandHandler;
