//! Context port - 実行コンテキスト
//!
//! Business logic only ever sees `&dyn Context`. In production that is a
//! [`RealContext`](crate::impls::RealContext) bound to an interpreter; in tests
//! it is a [`TestContext`](crate::impls::TestContext) replaying a script.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::domain::{Arg, EffectError};

/// Which entry point a dispatch came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Single,
    Series,
    Concurrent,
}

/// Context routes commands to whatever executes them.
///
/// The trait is object-safe; callers normally go through [`ContextExt`], which
/// accepts anything convertible into an [`Arg`].
///
/// # Cancellation
/// Each context carries a cancellation token and an optional deadline. The
/// core never checks them before dispatching; an interpreter that wants to
/// honor cancellation selects on [`Context::done`].
#[async_trait]
pub trait Context: Send + Sync {
    async fn dispatch(&self, mode: Dispatch, arg: Arg<'_>) -> Result<(), EffectError>;

    /// Derive a context for a nested call. Cancelling the parent cancels the child.
    fn child(&self) -> Box<dyn Context>;

    fn cancellation(&self) -> &CancellationToken;

    fn deadline(&self) -> Option<Instant>;

    /// Scoped value, looked up through parent contexts.
    fn value(&self, key: &str) -> Option<&Value>;

    /// Why the context is done, if it is.
    fn err(&self) -> Option<EffectError> {
        if self.cancellation().is_cancelled() {
            return Some(EffectError::Canceled);
        }
        match self.deadline() {
            Some(deadline) if Instant::now() >= deadline => Some(EffectError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    async fn done(&self) {
        match self.deadline() {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancellation().cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.cancellation().cancelled().await,
        }
    }
}

/// Ergonomic entry points over [`Context::dispatch`].
///
/// ```ignore
/// let mut now = Now::default();
/// ctx.run(&mut now).await?;
///
/// let (mut a, mut b) = (Now::default(), Now::default());
/// ctx.run_concurrent(vec![&mut a, &mut b]).await?;
/// ```
pub trait ContextExt: Context {
    /// Execute one command (`Do`).
    fn run<'a>(&'a self, cmd: impl Into<Arg<'a>>) -> BoxFuture<'a, Result<(), EffectError>> {
        self.dispatch(Dispatch::Single, cmd.into())
    }

    /// Execute commands one after another, stopping at the first error (`DoSeries`).
    fn run_series<'a>(&'a self, cmds: impl Into<Arg<'a>>) -> BoxFuture<'a, Result<(), EffectError>> {
        self.dispatch(Dispatch::Series, cmds.into())
    }

    /// Execute all commands concurrently (`DoConcurrent`).
    ///
    /// Elements are futures polled together on the calling task, not one
    /// spawned task each, so they overlap only at their await points. An
    /// interpreter that blocks or burns CPU serializes the batch; it should
    /// move that work onto `tokio::task::spawn_blocking` itself.
    fn run_concurrent<'a>(
        &'a self,
        cmds: impl Into<Arg<'a>>,
    ) -> BoxFuture<'a, Result<(), EffectError>> {
        self.dispatch(Dispatch::Concurrent, cmds.into())
    }
}

impl<C: Context + ?Sized> ContextExt for C {}
