//! Impls - Context の実装
//!
//! # 含まれる実装
//! - **RealContext**: 本番用。インタープリタに委譲する
//! - **TestContext**: テスト用。登録済みの期待値を順に再生する
//!
//! `containment` and `fanout` are the dispatch internals `RealContext` is
//! built from.

mod containment;
mod fanout;

pub mod expectation;
pub mod real_context;
pub mod test_context;

pub use self::expectation::{
    Batch, Call, DynBatch, Expectation, ExpectationOutput, IntoExpectation, One,
};
pub use self::real_context::RealContext;
pub use self::test_context::TestContext;
