//! Decoded client commands.
//!
//! A request frame is a list of tokens; the first names the command and is
//! matched case-insensitively. Each supported verb has a fixed arity:
//!
//! | Verb | Tokens | Command |
//! |------|--------|---------|
//! | `PING` | 1 | [`Command::Ping`] |
//! | `ECHO message` | 2 | [`Command::Echo`] |
//! | `GET key` | 2 | [`Command::Get`] |
//! | `SET key value [PX milliseconds]` | 3 or 5 | [`Command::Set`] |
//! | `INFO section` | 2 | [`Command::Info`] |

use crate::clock::Clock;
use crate::protocol::DecodeError;
use bytes::Bytes;
use std::time::{Duration, Instant};

/// A request that passed validation and is ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Echo(Bytes),
    Get(Bytes),
    /// Replaces the entry for `key`. Without `expires_at` any previous expiry
    /// is dropped as well.
    Set {
        key: Bytes,
        value: Bytes,
        expires_at: Option<Instant>,
    },
    Info(Bytes),
}

const VERBS: [&str; 5] = ["PING", "ECHO", "GET", "SET", "INFO"];

impl Command {
    /// Builds a command from the tokens of one request.
    ///
    /// `clock` is only read for `SET ... PX`, whose deadline is fixed here,
    /// at decode time.
    pub fn from_tokens(tokens: Vec<Bytes>, clock: &dyn Clock) -> Result<Self, DecodeError> {
        let verb = tokens.first().ok_or(DecodeError::EmptyCommand)?;

        let name = VERBS
            .iter()
            .copied()
            .find(|name| verb.eq_ignore_ascii_case(name.as_bytes()))
            .ok_or_else(|| DecodeError::UnknownCommand(String::from_utf8_lossy(verb).into_owned()))?;

        let mut args = tokens.into_iter().skip(1);
        let argc = args.len();

        match (name, argc) {
            ("PING", 0) => Ok(Command::Ping),
            ("ECHO", 1) => Ok(Command::Echo(next(&mut args))),
            ("GET", 1) => Ok(Command::Get(next(&mut args))),
            ("SET", 2) => Ok(Command::Set {
                key: next(&mut args),
                value: next(&mut args),
                expires_at: None,
            }),
            ("SET", 4) => {
                let key = next(&mut args);
                let value = next(&mut args);
                let option = next(&mut args);
                if !option.eq_ignore_ascii_case(b"PX") {
                    return Err(DecodeError::SyntaxError);
                }
                let millis = parse_millis(&next(&mut args))
                    .ok_or(DecodeError::InvalidExpiry { command: "SET" })?;
                let expires_at = clock
                    .now()
                    .checked_add(Duration::from_millis(millis))
                    .ok_or(DecodeError::InvalidExpiry { command: "SET" })?;
                Ok(Command::Set {
                    key,
                    value,
                    expires_at: Some(expires_at),
                })
            }
            ("INFO", 1) => Ok(Command::Info(next(&mut args))),
            (command, got) => Err(DecodeError::WrongArity {
                command,
                got: got + 1,
            }),
        }
    }

    /// Upper-case verb, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "PING",
            Command::Echo(_) => "ECHO",
            Command::Get(_) => "GET",
            Command::Set { .. } => "SET",
            Command::Info(_) => "INFO",
        }
    }
}

// Only called after the arity match, so a token is always there.
fn next(args: &mut impl Iterator<Item = Bytes>) -> Bytes {
    args.next().unwrap_or_default()
}

/// Parses a non-negative decimal number of milliseconds. Signs and
/// whitespace are rejected.
fn parse_millis(token: &[u8]) -> Option<u64> {
    if token.is_empty() || !token.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(token).ok()?.parse().ok()
}
