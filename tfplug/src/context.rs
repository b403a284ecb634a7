//! Request context carrying the operation deadline
//!
//! Cancellation is deadline based only. Every CRUD call receives a [`Context`];
//! resources narrow it with their own per-operation timeout and long-running
//! waits stop once the deadline passes.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Returned when work did not finish before the context deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("context deadline exceeded")]
pub struct DeadlineExceeded;

/// Context carries the deadline for one provider operation
/// Pass this as first parameter to all async trait methods
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Self { deadline: None }
    }

    /// Derive a context that expires after `timeout`, never later than the parent
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        };
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Drive `future` to completion unless the deadline passes first
    pub async fn run<F>(&self, future: F) -> Result<F::Output, DeadlineExceeded>
    where
        F: Future,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, future)
                .await
                .map_err(|_| DeadlineExceeded),
            None => Ok(future.await),
        }
    }

    /// Sleep for `duration`, or until the deadline if that comes first
    pub async fn sleep(&self, duration: Duration) -> Result<(), DeadlineExceeded> {
        if self.is_expired() {
            return Err(DeadlineExceeded);
        }
        match self.remaining() {
            Some(left) if left < duration => {
                tokio::time::sleep(left).await;
                Err(DeadlineExceeded)
            }
            _ => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn context_without_timeout_never_expires() {
        let ctx = Context::new();
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());
        assert!(!ctx.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn context_timeout_expires() {
        let ctx = Context::new().with_timeout(Duration::from_millis(100));
        assert!(!ctx.is_expired());

        tokio::time::advance(Duration::from_millis(150)).await;

        assert!(ctx.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn child_timeout_never_outlives_parent() {
        let parent = Context::new().with_timeout(Duration::from_secs(5));
        let child = parent.with_timeout(Duration::from_secs(60));

        assert_eq!(child.deadline(), parent.deadline());

        let shorter = parent.with_timeout(Duration::from_secs(1));
        assert!(shorter.deadline() < parent.deadline());
    }

    #[tokio::test(start_paused = true)]
    async fn run_stops_at_deadline() {
        let ctx = Context::new().with_timeout(Duration::from_secs(1));
        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(10)))
            .await;
        assert_eq!(result, Err(DeadlineExceeded));

        let ok = Context::new().run(async { 7 }).await;
        assert_eq!(ok, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_reports_deadline() {
        let ctx = Context::new().with_timeout(Duration::from_secs(2));
        assert!(ctx.sleep(Duration::from_secs(1)).await.is_ok());
        assert_eq!(ctx.sleep(Duration::from_secs(5)).await, Err(DeadlineExceeded));
    }
}
