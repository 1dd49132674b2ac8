//! Per-call context carrying cancellation and an optional deadline.
//!
//! A context is passed explicitly to every engine operation that may reach the
//! session store. It is never stored inside the engine.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::{TokenError, TokenResult};

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            deadline: None,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Sets the deadline, keeping the earlier one if already set
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fails fast when the context is already done
    pub fn check(&self) -> TokenResult<()> {
        if self.is_cancelled() {
            return Err(TokenError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(TokenError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Drives `future` to completion unless the context is cancelled or its
    /// deadline passes first, in which case the future is dropped.
    pub async fn run<F, T>(&self, future: F) -> TokenResult<T>
    where
        F: Future<Output = T>,
    {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.cancellation.cancelled() => Err(TokenError::Cancelled),
                    result = tokio::time::timeout_at(deadline, future) => {
                        result.map_err(|_| TokenError::DeadlineExceeded)
                    }
                }
            }
            None => {
                tokio::select! {
                    biased;
                    _ = self.cancellation.cancelled() => Err(TokenError::Cancelled),
                    value = future => Ok(value),
                }
            }
        }
    }
}
