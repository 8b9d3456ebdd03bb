//! Per-request context: cancellation, deadline and trace context.
//!
//! Every outbound call runs under a [`RequestContext`]. Cancelling the context
//! (or letting its deadline pass) drops the in-flight future, which aborts the
//! underlying socket operation.

use std::{future::Future, time::Duration};

use opentelemetry::Context;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::Error;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    trace: Context,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context bound to an existing token, e.g. a server-wide shutdown token.
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self { cancel, ..Self::default() }
    }

    /// Keeps the earlier of the current deadline and `now + timeout`.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    pub fn with_trace(mut self, trace: Context) -> Self {
        self.trace = trace;
        self
    }

    /// Derived context that is cancelled whenever `self` is, but can also be
    /// cancelled on its own without affecting the parent.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            trace: self.trace.clone(),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn trace(&self) -> &Context {
        &self.trace
    }

    /// Drives `fut` unless the context ends first.
    ///
    /// On cancellation or deadline the future is dropped and a transport
    /// error is returned; no partial output escapes.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Error>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(Error::cancelled());
        }

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::cancelled()),
            _ = deadline => Err(Error::deadline_exceeded()),
            out = fut => Ok(out),
        }
    }
}
