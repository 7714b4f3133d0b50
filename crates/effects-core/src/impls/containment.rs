//! Fault containment - インタープリタの panic をエラーに変換する
//!
//! Dispatch never unwinds into the caller because of interpreter misbehavior:
//! a panic becomes [`EffectError::Fault`] carrying the panic message.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::domain::{Command, EffectError};
use crate::ports::{Context, Interpreter};

const NON_STRING_PAYLOAD: &str = "interpreter panicked with a non-string payload";

/// Runs the interpreter on one command, converting panics into errors.
///
/// The interpreter is called inside the guarded future, so a panic while the
/// future is being built is caught as well as one raised while it runs.
pub(crate) async fn interpret_safely(
    interpreter: &dyn Interpreter,
    cmd: &mut dyn Command,
    ctx: &dyn Context,
) -> Result<(), EffectError> {
    let guarded = async move { interpreter.interpret(cmd, ctx).await };
    match AssertUnwindSafe(guarded).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(EffectError::Fault(panic_message(payload.as_ref()))),
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(err) = payload.downcast_ref::<EffectError>() {
        err.to_string()
    } else {
        NON_STRING_PAYLOAD.to_string()
    }
}
