//! Handler trait - 1 種類のコマンドを実行する Handler の定義
//!
//! # 二層構造
//! - `Handler<C>`: typed, one command type per handler
//! - `DynHandler`: object-safe, works on `&mut dyn Command`
//! - `TypedHandler<C, H>` bridges the two (type erasure)

use std::marker::PhantomData;

use async_trait::async_trait;

use crate::domain::{Command, EffectError, command_name};
use crate::ports::Context;

/// Handler performs the effect for one command type.
///
/// # 使用例
/// ```ignore
/// struct NowHandler;
///
/// #[async_trait]
/// impl Handler<Now> for NowHandler {
///     async fn handle(&self, cmd: &mut Now, _ctx: &dyn Context) -> Result<(), EffectError> {
///         cmd.time = Some(Utc::now());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<C: Command>: Send + Sync {
    async fn handle(&self, cmd: &mut C, ctx: &dyn Context) -> Result<(), EffectError>;
}

/// DynHandler は object-safe な Handler の抽象化
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(&self, cmd: &mut dyn Command, ctx: &dyn Context) -> Result<(), EffectError>;

    fn command_name(&self) -> String;
}

pub struct TypedHandler<C: Command, H: Handler<C>> {
    handler: H,
    _marker: PhantomData<fn() -> C>,
}

impl<C: Command, H: Handler<C>> TypedHandler<C, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<C: Command, H: Handler<C>> DynHandler for TypedHandler<C, H> {
    async fn handle_dyn(&self, cmd: &mut dyn Command, ctx: &dyn Context) -> Result<(), EffectError> {
        // The registry routes by TypeId, so a miss here is a routing bug.
        let Some(cmd) = cmd.downcast_mut::<C>() else {
            panic!(
                "handler for {} received a {}",
                command_name::<C>(),
                cmd.short_name()
            );
        };
        self.handler.handle(cmd, ctx).await
    }

    fn command_name(&self) -> String {
        command_name::<C>()
    }
}
