//! TestContext - スクリプト化されたテスト用コンテキスト
//!
//! Replays an ordered queue of expectations instead of calling an
//! interpreter. Registration order is the order in which the code under test
//! must issue its commands. A batch call (`run_series` / `run_concurrent`)
//! consumes exactly one step, which receives the whole batch.
//!
//! A wrong script is a broken test, not a failure of the code under test, so
//! script violations panic:
//! - more commands issued than steps registered
//! - a command whose type differs from the step's declared parameter
//!
//! Registering fewer commands than the code issues is reported by
//! [`TestContext::finished`].

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::expectation::{Call, Expectation, IntoExpectation};
use crate::domain::{Arg, EffectError};
use crate::ports::{Context, Dispatch};

#[derive(Default)]
struct Script {
    steps: VecDeque<Box<dyn Expectation>>,
    registered: usize,
    processed: usize,
}

/// Scripted stand-in for a real context.
///
/// # 使用例
/// ```
/// use effects_core::domain::{Command, EffectError};
/// use effects_core::impls::TestContext;
/// use effects_core::ports::{Context, ContextExt};
///
/// #[derive(Debug, Default)]
/// struct Now {
///     time: Option<u64>,
/// }
/// impl Command for Now {}
///
/// async fn stamp(ctx: &dyn Context) -> Result<Option<u64>, EffectError> {
///     let mut now = Now::default();
///     ctx.run(&mut now).await?;
///     Ok(now.time)
/// }
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let ctx = TestContext::new();
/// ctx.cmd(|now: &mut Now| now.time = Some(42));
///
/// assert_eq!(stamp(&ctx).await.unwrap(), Some(42));
/// ctx.assert_finished();
/// # });
/// ```
pub struct TestContext {
    script: Arc<Mutex<Script>>,
    cancel: CancellationToken,
    values: HashMap<String, Value>,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            cancel: CancellationToken::new(),
            values: HashMap::new(),
        }
    }

    /// Appends a step. The closure takes `&mut C` for a single command or
    /// `&mut [&mut C]` for a batch, and returns `()` or
    /// `Result<(), EffectError>`.
    pub fn cmd<M>(&self, step: impl IntoExpectation<M>) -> &Self {
        let mut script = self.script.lock();
        script.steps.push_back(step.into_expectation());
        script.registered += 1;
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

    pub fn registered(&self) -> usize {
        self.script.lock().registered
    }

    pub fn processed(&self) -> usize {
        self.script.lock().processed
    }

    /// Errors when registered steps were left unconsumed.
    pub fn finished(&self) -> Result<(), EffectError> {
        let script = self.script.lock();
        if script.processed != script.registered {
            return Err(EffectError::Unfinished {
                expected: script.registered,
                processed: script.processed,
            });
        }
        Ok(())
    }

    /// Like [`finished`](Self::finished), but fails the test on the spot.
    #[track_caller]
    pub fn assert_finished(&self) {
        if let Err(err) = self.finished() {
            panic!("{err}");
        }
    }

    fn next_step(&self, arg: &Arg<'_>) -> Box<dyn Expectation> {
        let mut script = self.script.lock();
        script.processed += 1;
        let step_number = script.processed;
        let Some(step) = script.steps.pop_front() else {
            drop(script);
            panic!(
                "attempting to process a command ({step_number}) not specified in test; \
                 add another ctx.cmd(...) to account for this command:\n{arg:#?}"
            );
        };
        step
    }

    fn replay(&self, mode: Dispatch, arg: Arg<'_>) -> Result<(), EffectError> {
        let mut step = self.next_step(&arg);
        let expected = step.expected_type();
        let actual = arg.type_label();
        tracing::trace!(?mode, %expected, %actual, "replaying scripted step");

        match into_call(arg).and_then(|call| step.invoke(call)) {
            Some(result) => result,
            None => panic!(
                "Your test expected a command of type {expected}, but the actual command was of type {actual}"
            ),
        }
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Single records and batches of records; anything else matches no step.
fn into_call(arg: Arg<'_>) -> Option<Call<'_>> {
    match arg {
        Arg::Ptr(Some(cmd)) => Some(Call::One(cmd)),
        Arg::Slice(items) => items
            .into_iter()
            .map(|item| match item {
                Arg::Ptr(Some(cmd)) => Some(cmd),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(Call::Batch),
        Arg::Ptr(None) | Arg::Value(_) => None,
    }
}

#[async_trait]
impl Context for TestContext {
    async fn dispatch(&self, mode: Dispatch, arg: Arg<'_>) -> Result<(), EffectError> {
        self.replay(mode, arg)
    }

    /// Children replay from the same script, so nested calls consume steps
    /// in the order they happen.
    fn child(&self) -> Box<dyn Context> {
        Box::new(TestContext {
            script: Arc::clone(&self.script),
            cancel: self.cancel.child_token(),
            values: self.values.clone(),
        })
    }

    fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    fn deadline(&self) -> Option<Instant> {
        None
    }

    fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Command, Kind};
    use crate::ports::ContextExt;

    const URL: &str = "https://swapi.dev/api/people/1";

    #[derive(Debug, Default, PartialEq)]
    struct Now {
        time: Option<u64>,
    }

    impl Command for Now {}

    #[derive(Debug, Default, PartialEq)]
    struct Get {
        url: String,
        body: String,
    }

    impl Command for Get {}

    async fn workflow(ctx: &dyn Context) -> Result<String, EffectError> {
        let mut now = Now::default();
        ctx.run(&mut now).await?;

        let mut get = Get {
            url: URL.to_string(),
            ..Default::default()
        };
        ctx.run(&mut get).await?;

        let mut times: [Now; 3] = Default::default();
        ctx.run_series(Arg::batch(times.iter_mut())).await?;

        let mut times_concurrent: [Now; 3] = Default::default();
        ctx.run_concurrent(Arg::batch(times_concurrent.iter_mut())).await?;

        Ok(get.body)
    }

    fn expect_now(ctx: &TestContext) {
        ctx.cmd(|now: &mut Now| {
            assert_eq!(*now, Now::default());
            now.time = Some(1);
        });
    }

    fn expect_get(ctx: &TestContext) {
        ctx.cmd(|get: &mut Get| {
            assert_eq!(get.url, URL);
            get.body = "{...}".to_string();
        });
    }

    fn expect_batch(ctx: &TestContext) {
        ctx.cmd(|times: &mut [&mut Now]| {
            assert_eq!(times.len(), 3);
            for now in times.iter_mut() {
                now.time = Some(2);
            }
        });
    }

    fn expect_failing_batch(ctx: &TestContext) {
        ctx.cmd(|_times: &mut [&mut Now]| -> Result<(), EffectError> {
            Err(EffectError::msg("oops"))
        });
    }

    #[tokio::test]
    async fn replays_full_workflow() {
        let ctx = TestContext::new();
        expect_now(&ctx);
        expect_get(&ctx);
        expect_batch(&ctx);
        expect_batch(&ctx);

        let body = workflow(&ctx).await.unwrap();

        assert_eq!(body, "{...}");
        assert!(ctx.finished().is_ok());
        assert_eq!((ctx.registered(), ctx.processed()), (4, 4));
    }

    #[tokio::test]
    async fn error_from_first_step() {
        let ctx = TestContext::new();
        ctx.cmd(|now: &mut Now| -> Result<(), EffectError> {
            assert_eq!(*now, Now::default());
            Err(EffectError::msg("oops"))
        });

        let err = workflow(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "oops");
        assert!(ctx.finished().is_ok());
    }

    #[tokio::test]
    async fn error_two_steps_deep() {
        let ctx = TestContext::new();
        expect_now(&ctx);
        ctx.cmd(|get: &mut Get| -> Result<(), EffectError> {
            get.body.clear();
            Err(EffectError::msg("oops"))
        });

        let err = workflow(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "oops");
        assert!(ctx.finished().is_ok());
    }

    #[tokio::test]
    async fn error_in_series() {
        let ctx = TestContext::new();
        expect_now(&ctx);
        expect_get(&ctx);
        expect_failing_batch(&ctx);

        let err = workflow(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "oops");
        assert!(ctx.finished().is_ok());
    }

    #[tokio::test]
    async fn error_in_concurrent() {
        let ctx = TestContext::new();
        expect_now(&ctx);
        expect_get(&ctx);
        expect_batch(&ctx);
        expect_failing_batch(&ctx);

        let err = workflow(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "oops");
        assert!(ctx.finished().is_ok());
    }

    #[tokio::test]
    async fn unconsumed_steps_are_reported() {
        let ctx = TestContext::new();
        ctx.cmd(|_now: &mut Now| -> Result<(), EffectError> { Err(EffectError::msg("oops")) });
        expect_get(&ctx);

        let err = workflow(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "oops");

        let finished = ctx.finished().unwrap_err();
        assert_eq!(
            finished.to_string(),
            "expected 2 cmds to be processed but processed 1"
        );
    }

    #[tokio::test]
    #[should_panic(expected = "expected 2 cmds to be processed but processed 1")]
    async fn assert_finished_fails_the_test() {
        let ctx = TestContext::new();
        ctx.cmd(|_now: &mut Now| -> Result<(), EffectError> { Err(EffectError::msg("oops")) });
        expect_get(&ctx);

        let _ = workflow(&ctx).await;
        ctx.assert_finished();
    }

    #[tokio::test]
    #[should_panic(expected = "attempting to process a command (1) not specified in test")]
    async fn no_steps() {
        let ctx = TestContext::new();
        let _ = workflow(&ctx).await;
    }

    #[tokio::test]
    #[should_panic(expected = "attempting to process a command (2) not specified in test")]
    async fn too_few_steps_single() {
        let ctx = TestContext::new();
        expect_now(&ctx);
        let _ = workflow(&ctx).await;
    }

    #[tokio::test]
    #[should_panic(expected = "attempting to process a command (3) not specified in test")]
    async fn too_few_steps_series() {
        let ctx = TestContext::new();
        expect_now(&ctx);
        expect_get(&ctx);
        let _ = workflow(&ctx).await;
    }

    #[tokio::test]
    #[should_panic(expected = "attempting to process a command (4) not specified in test")]
    async fn too_few_steps_concurrent() {
        let ctx = TestContext::new();
        expect_now(&ctx);
        expect_get(&ctx);
        expect_batch(&ctx);
        let _ = workflow(&ctx).await;
    }

    #[tokio::test]
    #[should_panic(
        expected = "Your test expected a command of type *Get, but the actual command was of type *Now"
    )]
    async fn wrong_command_type() {
        let ctx = TestContext::new();
        expect_get(&ctx);
        let _ = workflow(&ctx).await;
    }

    #[tokio::test]
    #[should_panic(
        expected = "Your test expected a command of type *Now, but the actual command was of type []*Now"
    )]
    async fn single_step_does_not_accept_a_batch() {
        let ctx = TestContext::new();
        expect_now(&ctx);
        expect_get(&ctx);
        expect_now(&ctx);
        let _ = workflow(&ctx).await;
    }

    #[tokio::test]
    #[should_panic(
        expected = "Your test expected a command of type *Now, but the actual command was of type nil"
    )]
    async fn nil_never_matches() {
        let ctx = TestContext::new();
        expect_now(&ctx);
        let _ = ctx.run(Arg::nil()).await;
    }

    #[tokio::test]
    #[should_panic(
        expected = "Your test expected a command of type []*Now, but the actual command was of type bool"
    )]
    async fn value_never_matches() {
        let ctx = TestContext::new();
        expect_batch(&ctx);
        let _ = ctx.run_series(Kind::Bool).await;
    }

    #[tokio::test]
    #[should_panic(
        expected = "Your test expected a command of type []*Now, but the actual command was of type []*Now (nil at index 1)"
    )]
    async fn batch_with_nil_names_the_nil() {
        let ctx = TestContext::new();
        expect_batch(&ctx);
        let (mut a, mut b) = (Now::default(), Now::default());
        let _ = ctx
            .run_series(vec![Arg::from(&mut a), Arg::nil(), Arg::from(&mut b)])
            .await;
    }

    fn expect_mixed(ctx: &TestContext) {
        ctx.cmd(|cmds: &mut [&mut dyn Command]| {
            assert_eq!(cmds.len(), 2);
            let now = cmds[0].downcast_mut::<Now>().unwrap();
            now.time = Some(3);
            let get = cmds[1].downcast_mut::<Get>().unwrap();
            assert_eq!(get.url, URL);
            get.body = "{...}".to_string();
        });
    }

    #[tokio::test]
    async fn mixed_batches_replay_through_dyn_steps() {
        let ctx = TestContext::new();
        expect_mixed(&ctx);
        expect_mixed(&ctx);

        let mut now = Now::default();
        let mut get = Get {
            url: URL.to_string(),
            ..Default::default()
        };
        ctx.run_series(vec![Arg::from(&mut now), Arg::from(&mut get)])
            .await
            .unwrap();
        assert_eq!((now.time, get.body.as_str()), (Some(3), "{...}"));

        let mut now = Now::default();
        let mut get = Get {
            url: URL.to_string(),
            ..Default::default()
        };
        ctx.run_concurrent(vec![Arg::from(&mut now), Arg::from(&mut get)])
            .await
            .unwrap();
        assert_eq!((now.time, get.body.as_str()), (Some(3), "{...}"));

        assert!(ctx.finished().is_ok());
    }

    #[tokio::test]
    async fn dyn_step_returns_error_for_mixed_batch() {
        let ctx = TestContext::new();
        ctx.cmd(|_cmds: &mut [&mut dyn Command]| -> Result<(), EffectError> {
            Err(EffectError::msg("oops"))
        });

        let mut now = Now::default();
        let mut get = Get::default();
        let err = ctx
            .run_concurrent(vec![Arg::from(&mut now), Arg::from(&mut get)])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "oops");
    }

    #[tokio::test]
    #[should_panic(
        expected = "Your test expected a command of type []*Now, but the actual command was of type []*dyn Command"
    )]
    async fn typed_batch_step_rejects_mixed_batch() {
        let ctx = TestContext::new();
        expect_batch(&ctx);
        let mut now = Now::default();
        let mut get = Get::default();
        let _ = ctx
            .run_series(vec![Arg::from(&mut now), Arg::from(&mut get)])
            .await;
    }

    #[tokio::test]
    async fn child_consumes_the_same_script() {
        let ctx = TestContext::new();
        expect_now(&ctx);
        expect_get(&ctx);

        let mut now = Now::default();
        ctx.run(&mut now).await.unwrap();

        let child = ctx.child();
        let mut get = Get {
            url: URL.to_string(),
            ..Default::default()
        };
        child.run(&mut get).await.unwrap();

        assert_eq!(get.body, "{...}");
        assert!(ctx.finished().is_ok());
    }

    #[tokio::test]
    async fn cancel_reaches_children() {
        let ctx = TestContext::new().with_value("request_id", "r-1");
        let child = ctx.child();
        assert!(child.err().is_none());
        assert_eq!(child.value("request_id"), Some(&Value::from("r-1")));

        ctx.cancel();
        child.done().await;
        assert!(matches!(child.err(), Some(EffectError::Canceled)));
    }
}
