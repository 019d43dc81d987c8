//! Request-scoped deadline and cancellation
//!
//! The host creates one [`Context`] per lifecycle call and passes it as the
//! first argument of every resource method.

use crate::error::{Result, TfplugError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Context carries the cancellation signal and optional deadline of a call
/// Clones share the same signal
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        Self::with_deadline(None)
    }

    /// A fresh context that is cancelled once `timeout` has elapsed
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Some(Instant::now() + timeout))
    }

    fn with_deadline(deadline: Option<Instant>) -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline,
                done: done_rx,
                done_tx,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow() || self.deadline_exceeded()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    fn deadline_exceeded(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Receiver flipped to true on manual cancellation
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }

    /// Fails with [`TfplugError::Cancelled`] once the context is done
    pub fn check(&self, operation: &str) -> Result<()> {
        if self.is_cancelled() {
            let reason = if self.deadline_exceeded() {
                "deadline exceeded"
            } else {
                "cancelled"
            };
            return Err(TfplugError::Cancelled(format!("{}: {}", operation, reason)));
        }
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_timeout_cancels() {
        let ctx = Context::with_timeout(Duration::from_millis(50));

        assert!(!ctx.is_cancelled());
        sleep(Duration::from_millis(80)).await;
        assert!(ctx.is_cancelled());

        let err = ctx.check("create").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Operation cancelled: create: deadline exceeded"
        );
    }

    #[test]
    fn context_manual_cancel_is_shared_by_clones() {
        let ctx = Context::new();
        let clone = ctx.clone();

        assert!(ctx.check("read").is_ok());
        clone.cancel();

        assert!(ctx.is_cancelled());
        assert!(*ctx.done().borrow());
        assert!(matches!(ctx.check("read"), Err(TfplugError::Cancelled(_))));
    }

    #[test]
    fn context_deadline() {
        assert!(Context::new().deadline().is_none());
        assert!(Context::with_timeout(Duration::from_secs(1))
            .deadline()
            .is_some());
    }
}
