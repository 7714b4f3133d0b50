//! Expectation - テスト用の 1 ステップ
//!
//! A step is registered as a closure over one record (`&mut C`), a batch of
//! one command type (`&mut [&mut C]`), or a batch of any command types
//! (`&mut [&mut dyn Command]`). The shape and the command type `C` are
//! recovered from the closure's signature through [`IntoExpectation`].
//!
//! Registration shapes are checked by the compiler. A closure with two
//! parameters is rejected:
//!
//! ```compile_fail
//! use effects_core::impls::TestContext;
//!
//! #[derive(Debug)]
//! struct Now;
//! impl effects_core::domain::Command for Now {}
//!
//! let ctx = TestContext::new();
//! ctx.cmd(|_a: &mut Now, _b: &mut Now| {});
//! ```
//!
//! So is something that is not callable at all:
//!
//! ```compile_fail
//! use effects_core::impls::TestContext;
//!
//! let ctx = TestContext::new();
//! ctx.cmd(42);
//! ```
//!
//! A parameter taken by value could never carry a result back:
//!
//! ```compile_fail
//! use effects_core::impls::TestContext;
//!
//! #[derive(Debug)]
//! struct Now;
//! impl effects_core::domain::Command for Now {}
//!
//! let ctx = TestContext::new();
//! ctx.cmd(|_now: Now| {});
//! ```
//!
//! The closure returns nothing or `Result<(), EffectError>`:
//!
//! ```compile_fail
//! use effects_core::impls::TestContext;
//!
//! #[derive(Debug)]
//! struct Now;
//! impl effects_core::domain::Command for Now {}
//!
//! let ctx = TestContext::new();
//! ctx.cmd(|_now: &mut Now| 7_u32);
//! ```

use std::marker::PhantomData;

use crate::domain::{Command, EffectError, command_name};

/// What a dispatch hands to the current step.
#[derive(Debug)]
pub enum Call<'c> {
    One(&'c mut dyn Command),
    Batch(Vec<&'c mut dyn Command>),
}

/// One scripted step, type-erased.
pub trait Expectation: Send {
    /// Label of the accepted argument: `*Now` or `[]*Now`.
    fn expected_type(&self) -> String;

    /// Runs the step. `None` when the call does not have the accepted type;
    /// the call is left untouched in that case.
    fn invoke(&mut self, call: Call<'_>) -> Option<Result<(), EffectError>>;
}

/// Return value of a step closure.
#[diagnostic::on_unimplemented(
    message = "functions passed to ctx.cmd(...) must return an error or return nothing",
    label = "this returns `{Self}`",
    note = "return `()` or `Result<(), EffectError>`"
)]
pub trait ExpectationOutput {
    fn into_result(self) -> Result<(), EffectError>;
}

impl ExpectationOutput for () {
    fn into_result(self) -> Result<(), EffectError> {
        Ok(())
    }
}

impl ExpectationOutput for Result<(), EffectError> {
    fn into_result(self) -> Result<(), EffectError> {
        self
    }
}

/// Marker for closures over one record.
pub struct One<C, R>(PhantomData<fn(&mut C) -> R>);

/// Marker for closures over a batch.
pub struct Batch<C, R>(PhantomData<fn(&mut [&mut C]) -> R>);

/// Marker for closures over a batch of mixed command types.
pub struct DynBatch<R>(PhantomData<fn() -> R>);

/// Conversion from a step closure into a queued [`Expectation`].
///
/// `Marker` only disambiguates the closure shapes and is always inferred.
#[diagnostic::on_unimplemented(
    message = "ctx.cmd(...) must receive a function that takes a single argument of kind ptr (pointer) or a slice of pointers",
    label = "expected `|cmd: &mut C|`, `|cmds: &mut [&mut C]|` or `|cmds: &mut [&mut dyn Command]|`",
    note = "the parameter type must be annotated, and the function may return nothing or `Result<(), EffectError>`"
)]
pub trait IntoExpectation<Marker> {
    fn into_expectation(self) -> Box<dyn Expectation>;
}

impl<C, R, F> IntoExpectation<One<C, R>> for F
where
    C: Command,
    R: ExpectationOutput + 'static,
    F: FnMut(&mut C) -> R + Send + 'static,
{
    fn into_expectation(self) -> Box<dyn Expectation> {
        Box::new(SingleStep {
            f: self,
            _marker: PhantomData::<fn(&mut C) -> R>,
        })
    }
}

impl<C, R, F> IntoExpectation<Batch<C, R>> for F
where
    C: Command,
    R: ExpectationOutput + 'static,
    F: FnMut(&mut [&mut C]) -> R + Send + 'static,
{
    fn into_expectation(self) -> Box<dyn Expectation> {
        Box::new(BatchStep {
            f: self,
            _marker: PhantomData::<fn(&mut [&mut C]) -> R>,
        })
    }
}

impl<R, F> IntoExpectation<DynBatch<R>> for F
where
    R: ExpectationOutput + 'static,
    F: FnMut(&mut [&mut dyn Command]) -> R + Send + 'static,
{
    fn into_expectation(self) -> Box<dyn Expectation> {
        Box::new(DynBatchStep {
            f: self,
            _marker: PhantomData::<fn() -> R>,
        })
    }
}

struct SingleStep<C, R, F> {
    f: F,
    _marker: PhantomData<fn(&mut C) -> R>,
}

impl<C, R, F> Expectation for SingleStep<C, R, F>
where
    C: Command,
    R: ExpectationOutput,
    F: FnMut(&mut C) -> R + Send,
{
    fn expected_type(&self) -> String {
        format!("*{}", command_name::<C>())
    }

    fn invoke(&mut self, call: Call<'_>) -> Option<Result<(), EffectError>> {
        let Call::One(cmd) = call else {
            return None;
        };
        let cmd = cmd.downcast_mut::<C>()?;
        Some((self.f)(cmd).into_result())
    }
}

struct BatchStep<C, R, F> {
    f: F,
    _marker: PhantomData<fn(&mut [&mut C]) -> R>,
}

impl<C, R, F> Expectation for BatchStep<C, R, F>
where
    C: Command,
    R: ExpectationOutput,
    F: FnMut(&mut [&mut C]) -> R + Send,
{
    fn expected_type(&self) -> String {
        format!("[]*{}", command_name::<C>())
    }

    fn invoke(&mut self, call: Call<'_>) -> Option<Result<(), EffectError>> {
        let Call::Batch(items) = call else {
            return None;
        };
        if !items.iter().all(|item| item.is::<C>()) {
            return None;
        }
        let mut typed: Vec<&mut C> = items
            .into_iter()
            .filter_map(|item| item.downcast_mut::<C>())
            .collect();
        Some((self.f)(typed.as_mut_slice()).into_result())
    }
}

/// Accepts every batch; the closure downcasts the records it cares about.
struct DynBatchStep<R, F> {
    f: F,
    _marker: PhantomData<fn() -> R>,
}

impl<R, F> Expectation for DynBatchStep<R, F>
where
    R: ExpectationOutput,
    F: FnMut(&mut [&mut dyn Command]) -> R + Send,
{
    fn expected_type(&self) -> String {
        "[]*dyn Command".to_string()
    }

    fn invoke(&mut self, call: Call<'_>) -> Option<Result<(), EffectError>> {
        let Call::Batch(mut items) = call else {
            return None;
        };
        Some((self.f)(items.as_mut_slice()).into_result())
    }
}
