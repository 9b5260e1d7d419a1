//! Bounded retry with identity rotation between attempts

use crate::config::RetryConfig;
use crate::identity::{Identity, IdentityRotator, RotationService};
use crate::HarvestError;
use std::future::Future;

/// How a retried operation ended
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// An attempt produced a result
    Success(T),

    /// Every attempt in the budget failed
    Exhausted { attempts: u32 },

    /// Rotating the identity failed; the crawl cannot continue
    Fatal(HarvestError),
}

/// Runs an operation up to `budget` times, rotating the identity in between
#[derive(Debug, Clone, Copy)]
pub struct RetryExecutor {
    budget: u32,
}

impl RetryExecutor {
    pub fn new(budget: u32) -> Self {
        Self {
            budget: budget.max(1),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.budget)
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Calls `op` with the current identity until it yields `Some`
    ///
    /// A failed attempt is followed by exactly one forced rotation, except
    /// after the last attempt: an exhausted run performs `budget - 1`
    /// rotations.
    pub async fn run<S, T, F, Fut>(&self, rotator: &mut IdentityRotator<S>, mut op: F) -> RetryOutcome<T>
    where
        S: RotationService,
        F: FnMut(Identity) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        for attempt in 1..=self.budget {
            if let Some(value) = op(rotator.current().clone()).await {
                return RetryOutcome::Success(value);
            }

            tracing::debug!("Attempt {}/{} failed", attempt, self.budget);
            if attempt == self.budget {
                break;
            }

            if let Err(e) = rotator.rotate().await {
                return RetryOutcome::Fatal(e.into());
            }
        }

        RetryOutcome::Exhausted {
            attempts: self.budget,
        }
    }
}
