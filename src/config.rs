//! Server configuration.
//!
//! Configuration comes from command-line flags only:
//!
//! ```text
//! emberkv [--host <HOST>] [--port <PORT>] [--replicaof "<HOST> <PORT>"]
//! ```
//!
//! `--replicaof` switches the reported replication role to `slave`. No
//! handshake with the master is attempted; the role only shows up in
//! `INFO replication`.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;
use thiserror::Error;

use crate::{DEFAULT_HOST, DEFAULT_PORT};

/// Length of a replication id, as in Redis.
pub const REPLICATION_ID_LEN: usize = 40;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(&'static str),

    #[error("invalid port number: {0}")]
    InvalidPort(String),

    #[error("invalid --replicaof value: {0:?} (expected \"<host> <port>\")")]
    InvalidReplicaOf(String),

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

/// Address of the master this server claims to replicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaOf {
    pub host: String,
    pub port: u16,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Master address when running as a replica
    pub replica_of: Option<ReplicaOf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            replica_of: None,
        }
    }
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Run(Config),
    Help,
    Version,
}

impl Config {
    /// Parses command-line arguments, excluding the program name.
    pub fn from_args<I, S>(args: I) -> Result<Invocation, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter().map(Into::into).peekable();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => {
                    config.host = args.next().ok_or(ConfigError::MissingValue("--host"))?;
                }
                "--port" | "-p" => {
                    let value = args.next().ok_or(ConfigError::MissingValue("--port"))?;
                    config.port = parse_port(&value)?;
                }
                "--replicaof" => {
                    let value = args
                        .next()
                        .ok_or(ConfigError::MissingValue("--replicaof"))?;
                    // Accept both `--replicaof "host port"` and `--replicaof host port`
                    let split = matches!(
                        args.peek(),
                        Some(port) if !value.contains(' ') && !port.starts_with('-')
                    );
                    let value = if split {
                        format!("{} {}", value, args.next().unwrap_or_default())
                    } else {
                        value
                    };
                    config.replica_of = Some(parse_replica_of(&value)?);
                }
                "--help" => return Ok(Invocation::Help),
                "--version" | "-v" => return Ok(Invocation::Version),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        Ok(Invocation::Run(config))
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The replication role this configuration runs under. Masters get a
    /// freshly generated replication id.
    pub fn replication_role(&self) -> ReplicationRole {
        match &self.replica_of {
            Some(master) => ReplicationRole::Slave {
                master_host: master.host.clone(),
                master_port: master.port,
            },
            None => ReplicationRole::master(),
        }
    }
}

fn parse_port(value: &str) -> Result<u16, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidPort(value.to_string()))
}

fn parse_replica_of(value: &str) -> Result<ReplicaOf, ConfigError> {
    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(host), Some(port), None) => Ok(ReplicaOf {
            host: host.to_string(),
            port: parse_port(port)?,
        }),
        _ => Err(ConfigError::InvalidReplicaOf(value.to_string())),
    }
}

/// Replication role reported by `INFO replication`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationRole {
    Master { replid: String, repl_offset: u64 },
    Slave { master_host: String, master_port: u16 },
}

impl ReplicationRole {
    /// A master with a random replication id and offset 0.
    pub fn master() -> Self {
        ReplicationRole::Master {
            replid: generate_replication_id(),
            repl_offset: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReplicationRole::Master { .. } => "master",
            ReplicationRole::Slave { .. } => "slave",
        }
    }

    /// Body of the `replication` INFO section: `key:value` lines joined by `\n`.
    pub fn info(&self) -> String {
        match self {
            ReplicationRole::Master {
                replid,
                repl_offset,
            } => format!(
                "role:master\nmaster_replid:{}\nmaster_repl_offset:{}",
                replid, repl_offset
            ),
            ReplicationRole::Slave { .. } => "role:slave".to_string(),
        }
    }
}

impl fmt::Display for ReplicationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn generate_replication_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REPLICATION_ID_LEN)
        .map(char::from)
        .collect()
}
