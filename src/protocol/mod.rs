//! RESP Protocol Implementation
//!
//! This module speaks the subset of the Redis Serialization Protocol (RESP)
//! that emberkv needs.
//!
//! ## Overview
//!
//! Clients send each request as an array of bulk strings. The server answers
//! with a simple string, a bulk string or the null bulk string (and, right
//! before it drops a misbehaving client, an error).
//!
//! ## Modules
//!
//! - `decoder`: Streaming request decoder over an async buffered reader
//! - `types`: The `RespValue` reply type and its serialization
//!
//! ## Example
//!
//! ```
//! use emberkv::clock::SystemClock;
//! use emberkv::protocol::{RequestDecoder, RespValue};
//! use bytes::Bytes;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! // Decoding an incoming request
//! let data: &[u8] = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let mut decoder = RequestDecoder::new(data, Arc::new(SystemClock));
//! let command = decoder.decode().await.unwrap();
//!
//! // Encoding a reply
//! let reply = RespValue::bulk_string(Bytes::from("zelda"));
//! assert_eq!(reply.serialize(), b"$5\r\nzelda\r\n");
//! # let _ = command;
//! # });
//! ```

pub mod decoder;
pub mod types;

pub use decoder::{DecodeError, RequestDecoder, StreamError, MAX_BULK_SIZE};
pub use types::RespValue;
