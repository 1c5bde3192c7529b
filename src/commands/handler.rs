//! Command Execution
//!
//! [`CommandHandler`] runs decoded [`Command`]s against the shared storage
//! engine and builds the reply for each one.
//!
//! ## Replies
//!
//! - `PING` → `+PONG`
//! - `ECHO message` → `message` as a bulk string
//! - `GET key` → the value as a bulk string, or `$-1` when the key is missing
//!   or its deadline has passed
//! - `SET key value [PX ms]` → `+OK`
//! - `INFO replication` → the replication section as a bulk string
//!
//! ## Expiry
//!
//! Deadlines are checked here, on read, against the handler's clock. An
//! expired entry is reported as missing but stays in the store until a later
//! `SET` replaces it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │   Command   │───>│  execute()  │───>│  RespValue  │     │
//! │  └─────────────┘    └──────┬──────┘    └─────────────┘     │
//! │                            │                                │
//! │                            ▼                                │
//! │                StorageEngine + Clock                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::clock::Clock;
use crate::commands::Command;
use crate::config::ReplicationRole;
use crate::protocol::RespValue;
use crate::storage::StorageEngine;
use bytes::Bytes;
use std::sync::Arc;
use tracing::trace;

/// Executes commands against the storage engine.
///
/// Cloning is cheap; every connection gets its own clone sharing the same
/// storage, clock and replication role.
#[derive(Clone)]
pub struct CommandHandler {
    storage: Arc<StorageEngine>,
    clock: Arc<dyn Clock>,
    replication: Arc<ReplicationRole>,
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("storage", &self.storage)
            .field("replication", &self.replication)
            .finish_non_exhaustive()
    }
}

impl CommandHandler {
    pub fn new(
        storage: Arc<StorageEngine>,
        clock: Arc<dyn Clock>,
        replication: Arc<ReplicationRole>,
    ) -> Self {
        Self {
            storage,
            clock,
            replication,
        }
    }

    /// The clock used for expiry checks. Decoders feeding this handler should
    /// share it so `PX` deadlines and reads agree on the time.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn storage(&self) -> &Arc<StorageEngine> {
        &self.storage
    }

    /// Executes a command and returns the reply.
    pub fn execute(&self, command: Command) -> RespValue {
        match command {
            Command::Ping => RespValue::pong(),
            Command::Echo(message) => RespValue::bulk_string(message),
            Command::Get(key) => self.get(&key),
            Command::Set {
                key,
                value,
                expires_at,
            } => {
                match expires_at {
                    Some(deadline) => self.storage.set_with_expiry(key, value, deadline),
                    None => self.storage.set(key, value),
                }
                RespValue::ok()
            }
            Command::Info(section) => self.info(&section),
        }
    }

    fn get(&self, key: &[u8]) -> RespValue {
        match self.storage.get(key) {
            Some(entry) if entry.is_expired_at(self.clock.now()) => {
                trace!(key = %String::from_utf8_lossy(key), "Key expired");
                RespValue::null()
            }
            Some(entry) => RespValue::bulk_string(entry.value),
            None => RespValue::null(),
        }
    }

    /// INFO section
    fn info(&self, section: &[u8]) -> RespValue {
        if section.eq_ignore_ascii_case(b"replication") {
            RespValue::bulk_string(Bytes::from(self.replication.info()))
        } else {
            RespValue::bulk_string(Bytes::new())
        }
    }
}
