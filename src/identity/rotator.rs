//! Rotation of the active identity

use crate::config::RotationConfig;
use crate::identity::{Identity, RotationError, RotationService, UserAgentPool};
use std::time::{Duration, Instant};

/// Owns the active [`Identity`] and replaces it on demand or on schedule
pub struct IdentityRotator<S> {
    service: S,
    agents: UserAgentPool,
    current: Identity,
    interval: Duration,
    last_rotation: Instant,
}

impl<S: RotationService> IdentityRotator<S> {
    /// Creates a rotator starting from a random user agent on the current circuit
    pub fn new(service: S, agents: UserAgentPool, interval: Duration) -> Self {
        let current = Identity::new(agents.pick());
        tracing::debug!("Rotating across {} user agents", agents.len());
        Self {
            service,
            agents,
            current,
            interval,
            last_rotation: Instant::now(),
        }
    }

    /// Creates a rotator from the `[rotation]` configuration table
    pub fn from_config(service: S, config: &RotationConfig) -> Self {
        Self::new(
            service,
            UserAgentPool::new(config.user_agents.iter().cloned()),
            config.interval(),
        )
    }

    /// The identity subsequent requests must use
    pub fn current(&self) -> &Identity {
        &self.current
    }

    /// Establishes the rotation control channel
    pub async fn connect(&mut self) -> Result<(), RotationError> {
        self.service.connect().await
    }

    /// Forces a new circuit and user agent
    ///
    /// Blocks for the settle time the service reports before returning.
    pub async fn rotate(&mut self) -> Result<&Identity, RotationError> {
        let wait = self.service.new_circuit().await?;
        if !wait.is_zero() {
            tracing::debug!("Waiting {:?} for the new circuit to settle", wait);
            tokio::time::sleep(wait).await;
        }

        self.current = Identity {
            user_agent: self.agents.pick_other(&self.current.user_agent),
            circuit: self.current.circuit + 1,
        };
        self.last_rotation = Instant::now();
        tracing::info!("Changed identity to {}", self.current);

        Ok(&self.current)
    }

    /// Re-rolls only the user agent once the rotation interval has elapsed
    ///
    /// Does not touch the circuit and never blocks. Returns true if the
    /// identity changed.
    pub fn maybe_rotate_on_schedule(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_rotation) <= self.interval {
            return false;
        }

        self.current.user_agent = self.agents.pick_other(&self.current.user_agent);
        self.last_rotation = now;
        tracing::debug!("Scheduled user agent refresh: {}", self.current);
        true
    }
}
