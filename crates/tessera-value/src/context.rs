//! Explicit cancellation and deadline context for suspending operations.
//!
//! Every operation that may resolve a chunk takes a `&Context`. A context
//! carries an optional cancellation token and an optional deadline; contexts
//! derived with [`Context::with_deadline`] or [`Context::with_timeout`]
//! share the token of the context they came from, so cancelling the handle
//! stops every derived operation.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::{ValueError, ValueResult};

#[derive(Debug, Default)]
struct CancelToken {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Cancellation and deadline scope for a traversal.
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: Option<Arc<CancelToken>>,
    deadline: Option<Instant>,
}

/// Handle that cancels the context it was created with.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    token: Arc<CancelToken>,
}

impl CancelHandle {
    /// Cancel every operation running under the associated context.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A cancellable context and the handle that cancels it.
    pub fn with_cancel() -> (Self, CancelHandle) {
        let token = Arc::new(CancelToken::default());
        let ctx = Self {
            token: Some(Arc::clone(&token)),
            deadline: None,
        };
        (ctx, CancelHandle { token })
    }

    /// Derive a context that also expires at `deadline`. An earlier existing
    /// deadline is kept.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        };
        Self {
            token: self.token.clone(),
            deadline: Some(deadline),
        }
    }

    /// Derive a context that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Fails if the context is already cancelled or past its deadline.
    pub fn check(&self) -> ValueResult<()> {
        if self.is_cancelled() {
            return Err(ValueError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ValueError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the context is cancelled or its
    /// deadline passes first. On cancellation `fut` is dropped.
    pub async fn run<T, F>(&self, fut: F) -> ValueResult<T>
    where
        F: Future<Output = ValueResult<T>>,
    {
        self.check()?;

        let cancelled = async {
            match &self.token {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(ValueError::Cancelled),
            _ = expired => Err(ValueError::DeadlineExceeded),
            res = fut => res,
        }
    }
}
