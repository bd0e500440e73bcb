//! Cancellation and deadline propagation for exporter operations.
//!
//! A [`Context`] is handed to every [`LogsClient`] call. It ends either when it
//! is canceled explicitly (or through one of its parents) or when its deadline
//! passes, and [`Context::err`] reports which of the two happened.
//!
//! [`LogsClient`]: crate::LogsClient
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// The reason a [`Context`] ended.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// The context, or one of its parents, was canceled.
    #[error("context canceled")]
    Canceled,
    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// A cancellable, deadline-bearing value passed through exporter operations.
///
/// Cloning a context yields a handle to the same context. Use
/// [`with_cancel`](Context::with_cancel), [`with_timeout`](Context::with_timeout)
/// or [`with_deadline`](Context::with_deadline) to derive a child that ends no
/// later than its parent.
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context with no deadline that is never canceled unless
    /// [`cancel`](Context::cancel) is called on it.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a child context that can be canceled independently of its parent.
    pub fn with_cancel(&self) -> Self {
        Context {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derive a child context that ends at `deadline` or at the parent's
    /// deadline, whichever comes first.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Context {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Derive a child context that ends after `timeout`.
    ///
    /// A timeout too large to be represented as an instant sets no deadline of
    /// its own.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.with_cancel(),
        }
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The deadline of this context, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context ended, or `None` while it is still live.
    ///
    /// Cancellation is reported ahead of an expired deadline.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            Some(ContextError::Canceled)
        } else if self
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            Some(ContextError::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Resolves once the context ends.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => ContextError::Canceled,
                _ = tokio::time::sleep_until(deadline) => {
                    self.err().unwrap_or(ContextError::DeadlineExceeded)
                }
            },
            None => {
                self.token.cancelled().await;
                ContextError::Canceled
            }
        }
    }

    /// Drive `fut` until it completes or the context ends.
    ///
    /// Returns the context error without polling `fut` when the context has
    /// already ended.
    pub(crate) async fn run<T, F>(&self, fut: F) -> Result<T, crate::Error>
    where
        F: Future<Output = Result<T, crate::Error>>,
    {
        if let Some(err) = self.err() {
            return Err(err.into());
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err.into()),
            res = fut => res,
        }
    }
}
