//! Ports - 抽象化レイヤー
//!
//! Business logic depends on these traits only. Implementations live in
//! [`crate::impls`] (contexts) and [`crate::typed`] (handler registry).

pub mod context;
pub mod interpreter;

pub use self::context::{Context, ContextExt, Dispatch};
pub use self::interpreter::{FnInterpreter, Interpreter, interpreter_fn};
