//! Typed - 型付き Handler API
//!
//! Routes a `&mut dyn Command` to the handler registered for its concrete
//! type, so interpreters are written as one typed handler per command.
//!
//! # 二層構造
//! - **表層（Typed）**: `Handler<C>` trait - 型安全
//! - **内部（Dyn）**: `DynHandler` trait - object-safe, type erasure

pub mod handler;
pub mod registry;

pub use self::handler::{DynHandler, Handler, TypedHandler};
pub use self::registry::{RegistryError, TypedRegistry};
