//! Outbound network identity and its rotation
//!
//! An [`Identity`] is the circuit plus user agent every request goes out with.
//! Exactly one is active at a time; the [`IdentityRotator`] is the only thing that
//! replaces it, either by forcing a new circuit through a [`RotationService`]
//! after a failed fetch, or by re-rolling just the user agent on a timer.

mod agents;
mod rotator;
mod tor;

pub use agents::UserAgentPool;
pub use rotator::IdentityRotator;
pub use tor::{TorController, NEWNYM_INTERVAL};

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the rotation control channel
///
/// None of these are retried: a crawl that cannot rotate its identity stops.
#[derive(Debug, Error)]
pub enum RotationError {
    #[error("Cannot reach rotation control channel at {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    #[error("Rotation service rejected authentication: {0}")]
    Authentication(String),

    #[error("Unexpected rotation service reply: {0}")]
    Protocol(String),

    #[error("IO error on rotation control channel: {0}")]
    Io(#[from] std::io::Error),
}

/// The network identity requests are sent with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Value of the `User-Agent` header
    pub user_agent: String,

    /// Number of forced circuit changes preceding this identity
    pub circuit: u64,
}

impl Identity {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            circuit: 0,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circuit #{} [{}]", self.circuit, self.user_agent)
    }
}

/// External service able to move the crawl onto a new outbound circuit
#[async_trait]
pub trait RotationService: Send {
    /// Establishes (or re-establishes) the control channel
    async fn connect(&mut self) -> Result<(), RotationError>;

    /// Requests a new circuit
    ///
    /// Returns how long to wait before the new circuit should be used.
    async fn new_circuit(&mut self) -> Result<Duration, RotationError>;
}
