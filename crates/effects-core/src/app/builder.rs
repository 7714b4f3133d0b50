//! InterpreterBuilder - インタープリタの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - `expect::<C>()` declares which command types the program will issue
//! - `build()` checks "expected ⊆ registered" and names what is missing
//!
//! An unregistered command otherwise only shows up as a fault at dispatch
//! time, deep inside whatever request first issues it.

use std::any::TypeId;

use crate::domain::{Command, command_name};
use crate::typed::{Handler, RegistryError, TypedRegistry};

/// InterpreterBuilder は TypedRegistry を構築
///
/// # 使用例
/// ```ignore
/// let registry = InterpreterBuilder::new()
///     .register::<Now, _>(NowHandler::new(SystemClock))?
///     .register::<Get, _>(GetHandler::new(client))?
///     .expect::<Now>()
///     .expect::<Get>()
///     .build()?;
/// ```
pub struct InterpreterBuilder {
    registry: TypedRegistry,
    expected: Vec<(TypeId, String)>,
}

/// BuildError はインタープリタ構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing command handlers: {0:?}. These commands were expected but not registered.")]
    MissingCommandTypes(Vec<String>),
}

impl InterpreterBuilder {
    pub fn new() -> Self {
        Self {
            registry: TypedRegistry::new(),
            expected: Vec::new(),
        }
    }

    /// Handler を登録
    pub fn register<C: Command, H: Handler<C> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<C, H>(handler)?;
        Ok(self)
    }

    /// 期待されるコマンド型を追加
    pub fn expect<C: Command>(mut self) -> Self {
        self.expected.push((TypeId::of::<C>(), command_name::<C>()));
        self
    }

    pub fn build(self) -> Result<TypedRegistry, BuildError> {
        let missing: Vec<String> = self
            .expected
            .iter()
            .filter(|(type_id, _)| !self.registry.contains(*type_id))
            .map(|(_, name)| name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingCommandTypes(missing));
        }
        Ok(self.registry)
    }
}

impl Default for InterpreterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
