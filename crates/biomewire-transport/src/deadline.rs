//! Deadlines threaded through every blocking transport call.
//!
//! The retry loops inside the transports (claiming a send buffer, polling
//! for a response) have no natural end. A [`Deadline`] gives them one.
//! [`Deadline::never`] keeps the old unbounded behaviour.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::TransportError;

/// A point in time after which a transport operation gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// A deadline that never expires.
    pub fn never() -> Self {
        Self(None)
    }

    /// A deadline `timeout` from now.
    pub fn after(timeout: Duration) -> Self {
        Self(Some(Instant::now() + timeout))
    }

    /// A deadline at a fixed instant.
    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// `Deadline::after(t)` for `Some(t)`, `Deadline::never()` for `None`.
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::never, Self::after)
    }

    /// Returns `true` once the deadline has passed.
    pub fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Returns the instant, or `None` for an unbounded deadline.
    pub fn instant(&self) -> Option<Instant> {
        self.0
    }

    /// Fails with [`TransportError::Timeout`] if the deadline has passed.
    pub fn check(&self, operation: &'static str) -> Result<(), TransportError> {
        if self.expired() {
            return Err(TransportError::Timeout { operation });
        }
        Ok(())
    }

    /// Drives `fut` to completion or until the deadline passes.
    pub async fn run<F, T>(
        &self,
        operation: &'static str,
        fut: F,
    ) -> Result<T, TransportError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        match self.0 {
            None => fut.await,
            Some(at) => tokio::time::timeout_at(at, fut)
                .await
                .map_err(|_| TransportError::Timeout { operation })?,
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_does_not_expire() {
        let d = Deadline::never();
        assert!(!d.expired());
        assert!(d.instant().is_none());
        assert!(d.check("send").is_ok());
    }

    #[test]
    fn test_from_timeout_none_is_never() {
        assert_eq!(Deadline::from_timeout(None), Deadline::never());
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_expires_once_time_advances() {
        let d = Deadline::after(Duration::from_millis(50));
        assert!(!d.expired());

        tokio::time::advance(Duration::from_millis(51)).await;

        assert!(d.expired());
        assert!(matches!(
            d.check("receive"),
            Err(TransportError::Timeout { operation: "receive" })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_times_out_pending_future() {
        let d = Deadline::after(Duration::from_millis(10));
        let result: Result<(), _> = d
            .run("receive", async {
                std::future::pending::<()>().await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(TransportError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_run_passes_through_result() {
        let d = Deadline::never();
        let value = d.run("send", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
