//! Connection Handler Module
//!
//! This module handles individual client connections to emberkv.
//! Each client gets its own task that runs in a loop, decoding a request,
//! executing it and writing the reply.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Decode next request     │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Execute command         │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Send reply              │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects, or sends a request we reject
//!        │
//!        ▼
//! 5. Handler task ends, socket is closed
//! ```
//!
//! ## Rejected Requests
//!
//! A malformed frame or an unsupported command ends the connection. The
//! handler first tries to send `-ERR <reason>` so the client can tell why.

use crate::commands::CommandHandler;
use crate::protocol::{DecodeError, RequestDecoder, RespValue};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Requests rejected by the decoder
    pub requests_rejected: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
pub struct ConnectionHandler {
    /// Request decoder over the read half
    decoder: RequestDecoder<BufReader<OwnedReadHalf>>,

    /// Buffered write half
    writer: BufWriter<OwnedWriteHalf>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// The command handler (shared across connections)
    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        let (reader, writer) = stream.into_split();
        let decoder = RequestDecoder::new(BufReader::new(reader), command_handler.clock());

        Self {
            decoder,
            writer: BufWriter::new(writer),
            addr,
            command_handler,
            stats,
        }
    }

    /// Runs the main connection loop until the client disconnects or an
    /// error ends the connection.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::Decode(e)) if !e.is_stream_error() => {
                warn!(client = %self.addr, error = %e, "Rejected request, closing connection");
                self.stats.request_rejected();
                self.reject(e).await;
            }
            Err(e) if e.is_connection_reset() => {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        self.stats.connection_closed();
        result
    }

    /// The decode-execute-reply loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let command = match self.decoder.decode().await {
                Ok(command) => command,
                Err(e) if e.is_closed() => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            trace!(client = %self.addr, command = command.name(), "Decoded command");

            let response = self.command_handler.execute(command);
            self.stats.command_processed();

            self.send_response(&response).await?;
        }
    }

    /// Best-effort error reply before the connection is dropped.
    async fn reject(&mut self, error: &DecodeError) {
        // Error replies are line-framed; client bytes echoed back must not end the line
        let message = error.to_string().replace(['\r', '\n'], " ");
        let response = RespValue::error(format!("ERR {}", message));
        if let Err(e) = self.send_response(&response).await {
            debug!(client = %self.addr, error = %e, "Failed to send error reply");
        }
    }

    /// Sends a reply to the client.
    async fn send_response(&mut self, response: &RespValue) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            reply = %response,
            "Sent response"
        );
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error while writing a reply
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The request could not be read or was rejected
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl ConnectionError {
    fn is_connection_reset(&self) -> bool {
        use crate::protocol::StreamError;

        let io_err = match self {
            ConnectionError::IoError(e) => e,
            ConnectionError::Decode(DecodeError::Stream(StreamError::Io(e))) => e,
            _ => return false,
        };
        io_err.kind() == std::io::ErrorKind::ConnectionReset
    }
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion. Errors are already logged by the handler.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats);
    if let Err(e) = handler.run().await {
        trace!(client = %addr, error = %e, "Connection ended with error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock, SystemClock};
    use crate::config::ReplicationRole;
    use crate::storage::StorageEngine;
    use std::time::{Duration, Instant};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn create_test_server(
        clock: Arc<dyn Clock>,
    ) -> (SocketAddr, Arc<StorageEngine>, Arc<ConnectionStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let storage = Arc::new(StorageEngine::new());
        let stats = Arc::new(ConnectionStats::new());
        let handler = CommandHandler::new(
            Arc::clone(&storage),
            clock,
            Arc::new(ReplicationRole::master()),
        );

        let stats_clone = Arc::clone(&stats);

        tokio::spawn(async move {
            while let Ok((stream, client_addr)) = listener.accept().await {
                let handler = handler.clone();
                let stats = Arc::clone(&stats_clone);
                tokio::spawn(handle_connection(stream, client_addr, handler, stats));
            }
        });

        (addr, storage, stats)
    }

    async fn read_reply(client: &mut TcpStream, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        tokio::time::timeout(Duration::from_secs(2), client.read_exact(&mut buf))
            .await
            .expect("timed out waiting for reply")
            .unwrap();
        buf
    }

    async fn read_until_closed(client: &mut TcpStream) -> Vec<u8> {
        let mut buf = Vec::new();
        tokio::time::timeout(Duration::from_secs(2), client.read_to_end(&mut buf))
            .await
            .expect("timed out waiting for close")
            .unwrap();
        buf
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (addr, _, _) = create_test_server(Arc::new(SystemClock)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        assert_eq!(read_reply(&mut client, 7).await, b"+PONG\r\n");
    }

    #[tokio::test]
    async fn test_set_get() {
        let (addr, storage, _) = create_test_server(Arc::new(SystemClock)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*3\r\n$3\r\nSET\r\n$5\r\ngrape\r\n$6\r\nbanana\r\n")
            .await
            .unwrap();
        assert_eq!(read_reply(&mut client, 5).await, b"+OK\r\n");

        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$5\r\ngrape\r\n")
            .await
            .unwrap();
        assert_eq!(read_reply(&mut client, 12).await, b"$6\r\nbanana\r\n");
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_request_split_across_writes() {
        let (addr, _, _) = create_test_server(Arc::new(SystemClock)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*2\r\n$4\r\nEC").await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.write_all(b"HO\r\n$3\r\nhey\r\n").await.unwrap();

        assert_eq!(read_reply(&mut client, 9).await, b"$3\r\nhey\r\n");
    }

    #[tokio::test]
    async fn test_pipelined_commands_in_order() {
        let (addr, _, _) = create_test_server(Arc::new(SystemClock)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*3\r\n$3\r\nSET\r\n$2\r\nk1\r\n$2\r\nv1\r\n*3\r\n$3\r\nSET\r\n$2\r\nk2\r\n$2\r\nv2\r\n*2\r\n$3\r\nGET\r\n$2\r\nk1\r\n*2\r\n$3\r\nGET\r\n$2\r\nk2\r\n")
            .await
            .unwrap();

        let expected = b"+OK\r\n+OK\r\n$2\r\nv1\r\n$2\r\nv2\r\n";
        assert_eq!(read_reply(&mut client, expected.len()).await, expected);
    }

    #[tokio::test]
    async fn test_expiry_with_fixed_clock() {
        let clock = Arc::new(FixedClock::new(Instant::now()));
        let (addr, _, _) = create_test_server(clock.clone()).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*5\r\n$3\r\nSET\r\n$4\r\nlink\r\n$5\r\nzelda\r\n$2\r\nPX\r\n$3\r\n100\r\n")
            .await
            .unwrap();
        assert_eq!(read_reply(&mut client, 5).await, b"+OK\r\n");

        clock.advance(Duration::from_millis(50));
        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$4\r\nlink\r\n")
            .await
            .unwrap();
        assert_eq!(read_reply(&mut client, 11).await, b"$5\r\nzelda\r\n");

        clock.advance(Duration::from_millis(51));
        client
            .write_all(b"*2\r\n$3\r\nGET\r\n$4\r\nlink\r\n")
            .await
            .unwrap();
        assert_eq!(read_reply(&mut client, 5).await, b"$-1\r\n");
    }

    #[tokio::test]
    async fn test_malformed_frame_closes_connection() {
        let (addr, storage, stats) = create_test_server(Arc::new(SystemClock)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*3\r\n$3\r\nSET\r\n$1x\r\nk\r\n$1\r\nv\r\n")
            .await
            .unwrap();

        let reply = read_until_closed(&mut client).await;
        assert!(reply.starts_with(b"-ERR "), "got {:?}", reply);
        assert!(reply.ends_with(b"\r\n"));
        assert!(storage.is_empty());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(stats.requests_rejected.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_unknown_command_closes_connection() {
        let (addr, _, _) = create_test_server(Arc::new(SystemClock)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client
            .write_all(b"*1\r\n$4\r\nPING\r\n*1\r\n$8\r\nFLUSHALL\r\n")
            .await
            .unwrap();

        let reply = read_until_closed(&mut client).await;
        assert_eq!(reply, b"+PONG\r\n-ERR unknown command 'FLUSHALL'\r\n");
    }

    #[tokio::test]
    async fn test_error_reply_stays_on_one_line() {
        let (addr, _, _) = create_test_server(Arc::new(SystemClock)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();

        client.write_all(b"*1\r\n$4\r\nA\r\nB\r\n").await.unwrap();

        let reply = read_until_closed(&mut client).await;
        assert_eq!(reply, b"-ERR unknown command 'A  B'\r\n");
    }

    #[tokio::test]
    async fn test_connection_stats() {
        let (addr, _, stats) = create_test_server(Arc::new(SystemClock)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);

        let mut client = TcpStream::connect(addr).await.unwrap();

        // Give the server time to accept the connection
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 1);

        client.write_all(b"*1\r\n$4\r\nPING\r\n").await.unwrap();
        read_reply(&mut client, 7).await;

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.commands_processed.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_written.load(Ordering::Relaxed), 7);

        drop(client);

        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(stats.requests_rejected.load(Ordering::Relaxed), 0);
    }
}
