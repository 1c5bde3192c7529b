//! Streaming RESP Request Decoder
//!
//! This module reads client requests straight off a buffered async stream.
//! A request is an array of bulk strings:
//!
//! ```text
//! *<n>\r\n
//! $<len>\r\n<len bytes>\r\n     (repeated n times)
//! ```
//!
//! ## How the Decoder Works
//!
//! Every fixed byte (`*`, `$`, `\r`, `\n`) is peeked before it is consumed, so a
//! mismatch can report exactly which byte was expected and which one arrived.
//! Lengths are runs of ASCII digits; the first non-digit ends the number and
//! is left in the stream for the CRLF check that follows.
//!
//! Each call to [`RequestDecoder::decode`] returns one complete [`Command`] or
//! an error. Errors are final: the decoder does not try to find the start of
//! the next frame, and the connection that owns it is expected to close.

use crate::clock::Clock;
use crate::commands::Command;
use crate::protocol::types::prefix;
use bytes::Bytes;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Upper bound on up-front allocation, whatever length the client declares.
const MAX_PREALLOCATED_TOKENS: usize = 16;
const MAX_PREALLOCATED_PAYLOAD: usize = 64 * 1024;

/// Failures of the underlying byte stream.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended cleanly between two requests
    #[error("stream closed")]
    Closed,

    /// The stream ended in the middle of a request
    #[error("unexpected end of stream")]
    UnexpectedEof,
}

/// Errors returned while decoding a request.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("expected '{}' but was '{}'", show(.expected), show(.found))]
    UnexpectedByte { expected: u8, found: u8 },

    #[error("expected digit but was '{}'", show(.found))]
    ExpectedDigit { found: u8 },

    #[error("length does not fit in an integer")]
    IntegerOverflow,

    #[error("bulk string too large: {size} bytes (max: {max})")]
    BulkTooLarge { size: usize, max: usize },

    #[error("empty command")]
    EmptyCommand,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("wrong number of arguments for '{command}' command")]
    WrongArity { command: &'static str, got: usize },

    #[error("syntax error")]
    SyntaxError,

    #[error("invalid expire time in '{command}' command")]
    InvalidExpiry { command: &'static str },

    #[error(transparent)]
    Stream(#[from] StreamError),
}

impl DecodeError {
    /// True when the stream itself failed or ended, as opposed to the client
    /// sending bytes we could not accept.
    pub fn is_stream_error(&self) -> bool {
        matches!(self, DecodeError::Stream(_))
    }

    /// True when the client hung up between requests.
    pub fn is_closed(&self) -> bool {
        matches!(self, DecodeError::Stream(StreamError::Closed))
    }
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        DecodeError::Stream(StreamError::Io(err))
    }
}

fn show(byte: &u8) -> String {
    std::ascii::escape_default(*byte).to_string()
}

/// Decodes requests from a buffered byte stream.
///
/// # Example
///
/// ```
/// use emberkv::clock::SystemClock;
/// use emberkv::commands::Command;
/// use emberkv::protocol::RequestDecoder;
/// use bytes::Bytes;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let input: &[u8] = b"*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n";
/// let mut decoder = RequestDecoder::new(input, Arc::new(SystemClock));
///
/// let command = decoder.decode().await.unwrap();
/// assert_eq!(command, Command::Echo(Bytes::from("hey")));
/// # });
/// ```
pub struct RequestDecoder<R> {
    reader: R,
    clock: Arc<dyn Clock>,
}

impl<R> std::fmt::Debug for RequestDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDecoder").finish_non_exhaustive()
    }
}

impl<R: AsyncBufRead + Unpin> RequestDecoder<R> {
    /// Creates a decoder reading from `reader`.
    ///
    /// `clock` turns relative expiries (`SET ... PX ms`) into absolute
    /// deadlines at decode time.
    pub fn new(reader: R, clock: Arc<dyn Clock>) -> Self {
        Self { reader, clock }
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Reads one request and turns it into a [`Command`].
    pub async fn decode(&mut self) -> Result<Command, DecodeError> {
        let tokens = self.read_frame().await?;
        Command::from_tokens(tokens, self.clock.as_ref())
    }

    /// Reads one request frame and returns its elements in order.
    pub async fn read_frame(&mut self) -> Result<Vec<Bytes>, DecodeError> {
        if self.peek().await?.is_none() {
            return Err(StreamError::Closed.into());
        }

        self.expect(prefix::ARRAY).await?;
        let count = self.read_length().await?;
        self.expect_crlf().await?;

        let mut tokens = Vec::with_capacity(count.min(MAX_PREALLOCATED_TOKENS));
        for _ in 0..count {
            tokens.push(self.read_bulk_string().await?);
        }

        Ok(tokens)
    }

    /// Reads `$<len>\r\n<data>\r\n`.
    async fn read_bulk_string(&mut self) -> Result<Bytes, DecodeError> {
        self.expect(prefix::BULK_STRING).await?;
        let len = self.read_length().await?;
        self.expect_crlf().await?;

        if len > MAX_BULK_SIZE {
            return Err(DecodeError::BulkTooLarge {
                size: len,
                max: MAX_BULK_SIZE,
            });
        }

        let mut data = Vec::with_capacity(len.min(MAX_PREALLOCATED_PAYLOAD));
        let read = (&mut self.reader)
            .take(len as u64)
            .read_to_end(&mut data)
            .await?;
        if read < len {
            return Err(StreamError::UnexpectedEof.into());
        }

        self.expect_crlf().await?;
        Ok(Bytes::from(data))
    }

    /// Reads a run of ASCII digits. At least one digit is required.
    async fn read_length(&mut self) -> Result<usize, DecodeError> {
        let first = self.peek_byte().await?;
        if !first.is_ascii_digit() {
            return Err(DecodeError::ExpectedDigit { found: first });
        }

        let mut value: usize = 0;
        while let Some(byte) = self.peek().await? {
            if !byte.is_ascii_digit() {
                break;
            }
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(usize::from(byte - b'0')))
                .ok_or(DecodeError::IntegerOverflow)?;
            self.reader.consume(1);
        }

        Ok(value)
    }

    async fn expect_crlf(&mut self) -> Result<(), DecodeError> {
        self.expect(b'\r').await?;
        self.expect(b'\n').await
    }

    /// Consumes `expected` if it is the next byte; leaves the stream untouched
    /// otherwise.
    async fn expect(&mut self, expected: u8) -> Result<(), DecodeError> {
        let found = self.peek_byte().await?;
        if found != expected {
            return Err(DecodeError::UnexpectedByte { expected, found });
        }
        self.reader.consume(1);
        Ok(())
    }

    /// Like [`peek`](Self::peek), but end of stream is an error.
    async fn peek_byte(&mut self) -> Result<u8, DecodeError> {
        self.peek()
            .await?
            .ok_or(DecodeError::Stream(StreamError::UnexpectedEof))
    }

    /// Returns the next byte without consuming it, or `None` at end of stream.
    async fn peek(&mut self) -> Result<Option<u8>, StreamError> {
        let buf = self.reader.fill_buf().await?;
        Ok(buf.first().copied())
    }
}
