//! effects-core
//!
//! Side effects as data. Business code builds a command record, hands an
//! exclusive reference to a [`Context`](ports::Context), and reads the result
//! back out of the record. In production the context calls an interpreter;
//! in tests a [`TestContext`](impls::TestContext) replays a script instead.
//!
//! # モジュール構成
//! - **domain**: Command, Arg/Kind, EffectError
//! - **ports**: Context (dispatch entry points), Interpreter
//! - **typed**: Handler trait, TypedRegistry (type-keyed interpreter)
//! - **app**: InterpreterBuilder, ContextOptions
//! - **impls**: RealContext, TestContext
//! - **observability**: dispatch counters

pub mod app;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod typed;

pub use app::{BuildError, ContextOptions, InterpreterBuilder};
pub use domain::{Arg, Command, EffectError, ErrorKind, Kind};
pub use impls::{RealContext, TestContext};
pub use observability::DispatchCounts;
pub use ports::{Context, ContextExt, Dispatch, Interpreter, interpreter_fn};
pub use typed::{Handler, TypedRegistry};
