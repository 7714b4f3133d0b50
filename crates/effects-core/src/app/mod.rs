//! App - アプリケーション層
//!
//! Wiring helpers: building an interpreter out of typed handlers and the
//! options a top-level context is created with.

pub mod builder;
pub mod options;

pub use self::builder::{BuildError, InterpreterBuilder};
pub use self::options::ContextOptions;
