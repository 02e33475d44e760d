//! Per-operation deadlines
//!
//! Every repository call starts an `OperationDeadline`. Each store call the
//! operation makes runs under it; when the deadline passes the in-flight
//! future is dropped, which cancels the store call and releases anything it
//! held (cursors included).

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use super::error::RepoError;

/// Deadline shared by all steps of one repository operation
#[derive(Debug, Clone, Copy)]
pub struct OperationDeadline {
    operation: &'static str,
    budget: Duration,
    expires_at: Instant,
}

impl OperationDeadline {
    /// Start the clock for `operation`
    pub fn start(operation: &'static str, budget: Duration) -> Self {
        Self {
            operation,
            budget,
            expires_at: Instant::now() + budget,
        }
    }

    /// Name of the guarded operation
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Time left before expiry
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Run one step of the operation, aborting it at the deadline
    pub async fn run<F, T, E>(&self, step: F) -> Result<T, RepoError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<RepoError>,
    {
        match tokio::time::timeout_at(self.expires_at, step).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => {
                warn!(
                    operation = self.operation,
                    budget = ?self.budget,
                    "Operation deadline exceeded"
                );
                Err(self.expired())
            }
        }
    }

    /// The error reported when the deadline passes
    pub fn expired(&self) -> RepoError {
        RepoError::Timeout {
            operation: self.operation,
            after: self.budget,
        }
    }
}
