//! Tor control-port client
//!
//! Speaks just enough of the control protocol to authenticate and send
//! `SIGNAL NEWNYM`. Replies are `250` on success; multi-line replies use
//! `250-` continuation lines and end with a `250 ` line.

use crate::identity::{RotationError, RotationService};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Tor ignores NEWNYM signals closer together than this
///
/// A signal that was just accepted settles after the full interval.
pub const NEWNYM_INTERVAL: Duration = Duration::from_secs(10);

struct ControlConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl ControlConnection {
    /// Sends one command and returns the final reply line
    async fn command(&mut self, line: &str) -> Result<String, RotationError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;

        loop {
            let mut reply = String::new();
            if self.reader.read_line(&mut reply).await? == 0 {
                return Err(RotationError::Protocol(
                    "control channel closed".to_string(),
                ));
            }

            let reply = reply.trim_end().to_string();
            // "250-" and "250+" introduce more lines, "250 " ends the reply
            if reply.len() >= 4 && reply.as_bytes()[3] != b' ' {
                continue;
            }
            return Ok(reply);
        }
    }
}

/// Rotation service backed by a Tor control port
pub struct TorController {
    address: String,
    password: Option<String>,
    connection: Option<ControlConnection>,
}

impl TorController {
    pub fn new(address: impl Into<String>, password: Option<String>) -> Self {
        Self {
            address: address.into(),
            password,
            connection: None,
        }
    }

    fn authenticate_command(&self) -> String {
        match &self.password {
            Some(password) => {
                let escaped = password.replace('\\', "\\\\").replace('"', "\\\"");
                format!("AUTHENTICATE \"{}\"", escaped)
            }
            None => "AUTHENTICATE".to_string(),
        }
    }

    async fn open(&self) -> Result<ControlConnection, RotationError> {
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|source| RotationError::Connect {
                address: self.address.clone(),
                source,
            })?;
        let (read, write) = stream.into_split();
        let mut connection = ControlConnection {
            reader: BufReader::new(read),
            writer: write,
        };

        let reply = connection.command(&self.authenticate_command()).await?;
        if !reply.starts_with("250") {
            return Err(RotationError::Authentication(reply));
        }

        Ok(connection)
    }
}

#[async_trait]
impl RotationService for TorController {
    async fn connect(&mut self) -> Result<(), RotationError> {
        let connection = self.open().await?;
        tracing::debug!("Authenticated with rotation service at {}", self.address);
        self.connection = Some(connection);
        Ok(())
    }

    async fn new_circuit(&mut self) -> Result<Duration, RotationError> {
        if self.connection.is_none() {
            self.connect().await?;
        }

        let connection = match self.connection.as_mut() {
            Some(connection) => connection,
            None => return Err(RotationError::Protocol("not connected".to_string())),
        };

        let reply = match connection.command("SIGNAL NEWNYM").await {
            Ok(reply) => reply,
            Err(e) => {
                self.connection = None;
                return Err(e);
            }
        };
        if !reply.starts_with("250") {
            return Err(RotationError::Protocol(reply));
        }

        Ok(NEWNYM_INTERVAL)
    }
}
