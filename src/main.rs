//! emberkv - A Small Redis-Compatible Key-Value Server
//!
//! This is the main entry point for the emberkv server.
//! It sets up logging, the TCP listener and the shared command handler.

use emberkv::clock::SystemClock;
use emberkv::commands::CommandHandler;
use emberkv::config::{Config, Invocation};
use emberkv::connection::{handle_connection, ConnectionStats};
use emberkv::storage::StorageEngine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_help() {
    println!(
        r#"
emberkv - A Small Redis-Compatible Key-Value Server

USAGE:
    emberkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>              Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>              Port to listen on (default: 6379)
        --replicaof "<HOST> <PORT>"  Report this server as a replica of HOST:PORT
    -v, --version                  Print version information
        --help                     Print this help message

EXAMPLES:
    emberkv                                # Start on 127.0.0.1:6379
    emberkv --port 6380                    # Start on port 6380
    emberkv --port 6380 --replicaof "localhost 6379"

CONNECTING:
    Use redis-cli or any Redis client to connect:
    $ redis-cli -p 6379
    127.0.0.1:6379> SET grape banana PX 5000
    OK
    127.0.0.1:6379> GET grape
    "banana"

LOGGING:
    Set RUST_LOG to change verbosity, e.g. RUST_LOG=emberkv=trace
"#
    );
}

fn print_banner(config: &Config, role: &str) {
    println!(
        r#"
emberkv v{} - Redis-Compatible In-Memory Key-Value Server
──────────────────────────────────────────────────────────────
Server started on {} (role: {})
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        emberkv::VERSION,
        config.bind_address(),
        role
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(Invocation::Run(config)) => config,
        Ok(Invocation::Help) => {
            print_help();
            return Ok(());
        }
        Ok(Invocation::Version) => {
            println!("emberkv version {}", emberkv::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let replication = Arc::new(config.replication_role());
    print_banner(&config, replication.name());

    // Shared state for every connection
    let storage = Arc::new(StorageEngine::new());
    info!("Storage engine initialized with 64 shards");

    let handler = CommandHandler::new(storage, Arc::new(SystemClock), replication);
    if let Some(master) = &config.replica_of {
        info!(master_host = %master.host, master_port = master.port, "Running as replica");
    }

    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    // Set up graceful shutdown
    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    // Main accept loop
    tokio::select! {
        _ = accept_loop(listener, handler, Arc::clone(&stats)) => {}
        _ = shutdown => {}
    }

    info!(
        connections = stats
            .connections_accepted
            .load(std::sync::atomic::Ordering::Relaxed),
        commands = stats
            .commands_processed
            .load(std::sync::atomic::Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(listener: TcpListener, handler: CommandHandler, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = handler.clone();
                let stats = Arc::clone(&stats);

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
