//! RealContext - 本番用の実行コンテキスト
//!
//! Routes every command to one interpreter.
//!
//! # ディスパッチ
//! - `run`: shape check, then one contained interpreter call
//! - `run_series`: shape check of the whole batch, then in order, stop at first error
//! - `run_concurrent`: shape check, then every element concurrently; the
//!   lowest-index error wins

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::containment::interpret_safely;
use super::fanout::fan_out;
use crate::app::ContextOptions;
use crate::domain::{Arg, BatchOp, Command, EffectError, ErrorKind};
use crate::observability::{Counters, DispatchCounts};
use crate::ports::{Context, Dispatch, Interpreter};

/// Production context bound to an interpreter.
///
/// # 使用例
/// ```ignore
/// let registry = InterpreterBuilder::new()
///     .register::<Now, _>(NowHandler::new(SystemClock))?
///     .build()?;
/// let ctx = RealContext::with_options(registry, &options);
///
/// let mut now = Now::default();
/// ctx.run(&mut now).await?;
/// ```
#[derive(Clone)]
pub struct RealContext {
    interpreter: Arc<dyn Interpreter>,
    cancel: CancellationToken,
    deadline: Option<Instant>,
    values: HashMap<String, Value>,
    parent: Option<Arc<RealContext>>,
    counters: Arc<Counters>,
}

impl RealContext {
    pub fn new(interpreter: impl Interpreter + 'static) -> Self {
        Self::from_shared(Arc::new(interpreter))
    }

    /// Shares one interpreter between several top-level contexts.
    pub fn from_shared(interpreter: Arc<dyn Interpreter>) -> Self {
        Self {
            interpreter,
            cancel: CancellationToken::new(),
            deadline: None,
            values: HashMap::new(),
            parent: None,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn with_options(interpreter: impl Interpreter + 'static, options: &ContextOptions) -> Self {
        let mut ctx = Self::new(interpreter);
        if let Some(timeout) = options.timeout() {
            ctx = ctx.with_timeout(timeout);
        }
        ctx.values = options.values.clone();
        ctx
    }

    /// Sets a deadline `timeout` from now. An earlier inherited deadline stays.
    ///
    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self;
        };
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Cancels this context and every child derived from it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Dispatch counters, shared with every child.
    pub fn counts(&self) -> DispatchCounts {
        self.counters.snapshot()
    }

    pub fn parent(&self) -> Option<&RealContext> {
        self.parent.as_deref()
    }

    /// Concrete form of [`Context::child`].
    pub fn child_context(&self) -> RealContext {
        RealContext {
            interpreter: Arc::clone(&self.interpreter),
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            values: HashMap::new(),
            parent: Some(Arc::new(self.clone())),
            counters: Arc::clone(&self.counters),
        }
    }

    async fn interpret(&self, cmd: &mut dyn Command) -> Result<(), EffectError> {
        let command = cmd.short_name();
        tracing::debug!(%command, "dispatching command");

        let result = interpret_safely(self.interpreter.as_ref(), cmd, self).await;
        self.counters.record(&result);

        if let Err(err) = &result {
            if err.kind() == ErrorKind::Fault {
                tracing::warn!(%command, error = %err, "interpreter panicked");
            } else {
                tracing::debug!(%command, error = %err, "command failed");
            }
        }
        result
    }

    async fn run_single(&self, arg: Arg<'_>) -> Result<(), EffectError> {
        match arg {
            Arg::Ptr(Some(cmd)) => self.interpret(cmd).await,
            Arg::Ptr(None) => Err(EffectError::NilPointer),
            Arg::Slice(_) | Arg::Value(_) => Err(EffectError::NotAPointer),
        }
    }

    async fn run_in_series(&self, arg: Arg<'_>) -> Result<(), EffectError> {
        let items = batch_items(BatchOp::Series, arg)?;
        for (index, cmd) in items.into_iter().enumerate() {
            let Some(cmd) = cmd else {
                return Err(EffectError::NilPointer);
            };
            if let Err(err) = self.interpret(cmd).await {
                tracing::debug!(index, "series stopped at first error");
                return Err(err);
            }
        }
        Ok(())
    }

    async fn run_all_concurrently(&self, arg: Arg<'_>) -> Result<(), EffectError> {
        let items = batch_items(BatchOp::Concurrent, arg)?;
        tracing::debug!(count = items.len(), "fanning out");
        fan_out(items, |cmd| async move {
            match cmd {
                Some(cmd) => self.interpret(cmd).await,
                None => Err(EffectError::NilPointer),
            }
        })
        .await
    }
}

/// Checks the shape of a whole batch before anything runs.
///
/// Nil elements pass the check and fail individually when their turn comes.
fn batch_items(op: BatchOp, arg: Arg<'_>) -> Result<Vec<Option<&mut dyn Command>>, EffectError> {
    let items = match arg {
        Arg::Slice(items) => items,
        other => return Err(EffectError::NotASlice { op, kind: other.kind() }),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Arg::Ptr(cmd) => Ok(cmd),
            other => Err(EffectError::NotAPointerAt {
                op,
                kind: other.kind(),
                index,
            }),
        })
        .collect()
}

#[async_trait]
impl Context for RealContext {
    async fn dispatch(&self, mode: Dispatch, arg: Arg<'_>) -> Result<(), EffectError> {
        tracing::debug!(?mode, arg = %arg.type_label(), "dispatch");
        match mode {
            Dispatch::Single => self.run_single(arg).await,
            Dispatch::Series => self.run_in_series(arg).await,
            Dispatch::Concurrent => self.run_all_concurrently(arg).await,
        }
    }

    fn child(&self) -> Box<dyn Context> {
        Box::new(self.child_context())
    }

    fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn value(&self, key: &str) -> Option<&Value> {
        self.values
            .get(key)
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.value(key)))
    }
}
