//! Domain model (commands, argument shapes, errors).

pub mod arg;
pub mod command;
pub mod errors;

pub use self::arg::{Arg, Kind};
pub use self::command::{AsAnyMut, Command, command_name, short_type_name};
pub use self::errors::{BatchOp, EffectError, ErrorKind};
