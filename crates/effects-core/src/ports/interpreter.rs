//! Interpreter port - コマンドを実際の副作用に変換する
//!
//! The only externally supplied piece the core depends on.

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::context::Context;
use crate::domain::{Command, EffectError};

/// Interpreter performs the effect a command describes and writes the
/// outcome back into the record.
///
/// # Contract
/// - Returns `Err` for domain failures.
/// - Must handle every command type the calling code can construct. An
///   unrecognized type is a programming error: panic. The context turns that
///   panic into [`EffectError::Fault`].
#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn interpret(&self, cmd: &mut dyn Command, ctx: &dyn Context) -> Result<(), EffectError>;
}

/// Interpreter backed by a plain function.
pub struct FnInterpreter<F> {
    f: F,
}

/// Wraps a function as an [`Interpreter`].
///
/// ```ignore
/// let interpreter = interpreter_fn(|cmd, _ctx| {
///     Box::pin(async move {
///         match cmd.downcast_mut::<Now>() {
///             Some(now) => now.time = Some(Utc::now()),
///             None => panic!("unknown command type: {}", cmd.short_name()),
///         }
///         Ok(())
///     })
/// });
/// ```
pub fn interpreter_fn<F>(f: F) -> FnInterpreter<F>
where
    F: for<'a> Fn(&'a mut dyn Command, &'a dyn Context) -> BoxFuture<'a, Result<(), EffectError>>
        + Send
        + Sync,
{
    FnInterpreter { f }
}

#[async_trait]
impl<F> Interpreter for FnInterpreter<F>
where
    F: for<'a> Fn(&'a mut dyn Command, &'a dyn Context) -> BoxFuture<'a, Result<(), EffectError>>
        + Send
        + Sync,
{
    async fn interpret(&self, cmd: &mut dyn Command, ctx: &dyn Context) -> Result<(), EffectError> {
        (self.f)(cmd, ctx).await
    }
}
