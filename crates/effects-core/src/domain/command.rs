//! Command - 副作用を表すデータ
//!
//! A command is a plain record describing one intended effect. After dispatch
//! the interpreter has written the outcome back into the same record.

use std::any::{Any, TypeId};
use std::fmt;

/// Runtime identity of a command record.
///
/// Implemented for every `'static` type, so `Command` implementors get it for
/// free and `dyn Command` can still be downcast.
pub trait AsAnyMut {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// `TypeId` of the concrete record behind a `dyn Command`.
    fn command_type_id(&self) -> TypeId;

    /// Full path of the concrete type, e.g. `my_app::commands::Now`.
    fn type_name(&self) -> &'static str;
}

impl<T: Any> AsAnyMut for T {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn command_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Command はインタープリタに渡されるレコード
///
/// # 使用例
/// ```ignore
/// #[derive(Debug, Default)]
/// struct Now {
///     time: Option<DateTime<Utc>>,
/// }
///
/// impl Command for Now {}
/// ```
///
/// Commands are always handed to a context by exclusive reference (`&mut`),
/// never by value, so the interpreter's writes are visible to the caller.
pub trait Command: AsAnyMut + Send + fmt::Debug + 'static {}

impl dyn Command {
    /// `TypeId` of the concrete record, safe to call through `&mut dyn Command`.
    pub fn record_type_id(&self) -> TypeId {
        self.command_type_id()
    }

    pub fn is<C: Command>(&self) -> bool {
        self.command_type_id() == TypeId::of::<C>()
    }

    pub fn downcast_mut<C: Command>(&mut self) -> Option<&mut C> {
        self.as_any_mut().downcast_mut::<C>()
    }

    /// Short display name without module paths (`Now`, `Vec<Get>`).
    pub fn short_name(&self) -> String {
        short_type_name(self.type_name())
    }
}

/// Short name of a command type, used in test diagnostics.
pub fn command_name<C: Command>() -> String {
    short_type_name(std::any::type_name::<C>())
}

/// Strips module paths from a `std::any::type_name` string.
///
/// `alloc::vec::Vec<my_app::Now>` becomes `Vec<Now>`.
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment_start = 0;
    let mut chars = full.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment_start);
            continue;
        }
        out.push(c);
        if !(c.is_alphanumeric() || c == '_') {
            segment_start = out.len();
        }
    }
    out
}
