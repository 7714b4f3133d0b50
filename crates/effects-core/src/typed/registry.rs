//! TypedRegistry - Handler の登録と管理
//!
//! A type-keyed handler registry. It is the usual production [`Interpreter`]:
//! each command is routed to the handler registered for its concrete type.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use super::handler::{DynHandler, Handler, TypedHandler};
use crate::domain::{Command, EffectError, command_name};
use crate::ports::{Context, Interpreter};

/// TypedRegistry は型付き Handler を登録・管理
///
/// # 使用例
/// ```ignore
/// let mut registry = TypedRegistry::new();
/// registry.register::<Now, _>(NowHandler::new(SystemClock))?;
/// registry.register::<Get, _>(GetHandler::new(client))?;
///
/// let ctx = RealContext::new(registry);
/// ```
///
/// Built during initialization (mutable), used during dispatch (immutable),
/// so no locks are needed.
#[derive(Default)]
pub struct TypedRegistry {
    handlers: HashMap<TypeId, Arc<dyn DynHandler>>,
}

/// RegistryError は TypedRegistry の操作エラー
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler for command type '{0}' is already registered")]
    AlreadyRegistered(String),
}

impl TypedRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<C: Command, H: Handler<C> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        let type_id = TypeId::of::<C>();
        if self.handlers.contains_key(&type_id) {
            return Err(RegistryError::AlreadyRegistered(command_name::<C>()));
        }
        self.handlers
            .insert(type_id, Arc::new(TypedHandler::new(handler)));
        Ok(())
    }

    pub fn get<C: Command>(&self) -> Option<Arc<dyn DynHandler>> {
        self.handlers.get(&TypeId::of::<C>()).cloned()
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.handlers.contains_key(&type_id)
    }

    pub fn registered_types(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.values().map(|h| h.command_name()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[async_trait]
impl Interpreter for TypedRegistry {
    async fn interpret(&self, cmd: &mut dyn Command, ctx: &dyn Context) -> Result<(), EffectError> {
        let Some(handler) = self.handlers.get(&cmd.record_type_id()) else {
            panic!("Unknown command type: {}", cmd.short_name());
        };
        handler.handle_dyn(cmd, ctx).await
    }
}
