//! Arg - ディスパッチ引数の形
//!
//! Contexts are object-safe, so every dispatch entry point receives an [`Arg`]:
//! the runtime shape of whatever the caller handed over. Most callers never
//! build one by hand; `&mut cmd`, `vec![&mut a, &mut b]` and friends convert
//! through `From`.

use std::fmt;

use super::command::Command;

/// Shape of an argument, named the way error messages print it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Ptr,
    Slice,
    Struct,
    Bool,
    Int,
    Float,
    String,
    Map,
    Func,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Ptr => "ptr",
            Kind::Slice => "slice",
            Kind::Struct => "struct",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float64",
            Kind::String => "string",
            Kind::Map => "map",
            Kind::Func => "func",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The argument of `run`, `run_series` and `run_concurrent`.
///
/// - `Ptr(Some(..))`: an exclusive reference to one command record
/// - `Ptr(None)`: a nil reference
/// - `Slice(..)`: a batch; well-formed batches hold only `Ptr` elements
/// - `Value(kind)`: something passed by value, which can never carry a result back
#[derive(Debug)]
pub enum Arg<'a> {
    Ptr(Option<&'a mut dyn Command>),
    Slice(Vec<Arg<'a>>),
    Value(Kind),
}

impl<'a> Arg<'a> {
    pub fn nil() -> Self {
        Arg::Ptr(None)
    }

    /// A batch of per-item references.
    ///
    /// ```ignore
    /// let mut times = [Now::default(), Now::default()];
    /// ctx.run_series(Arg::batch(times.iter_mut())).await?;
    /// ```
    pub fn batch<I, C>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a mut C>,
        C: Command,
    {
        Arg::Slice(
            items
                .into_iter()
                .map(|cmd| Arg::Ptr(Some(cmd as &mut dyn Command)))
                .collect(),
        )
    }

    /// A command moved in by value. Always rejected by a real context.
    pub fn by_value<C: Command>(_cmd: C) -> Self {
        Arg::Value(Kind::Struct)
    }

    pub fn kind(&self) -> Kind {
        match self {
            Arg::Ptr(_) => Kind::Ptr,
            Arg::Slice(_) => Kind::Slice,
            Arg::Value(kind) => *kind,
        }
    }

    /// Label used in test diagnostics: `*Now`, `[]*Now`, `nil`, `struct`.
    ///
    /// A batch holding something other than record references names the
    /// first such element: `[]*Now (nil at index 1)`.
    pub fn type_label(&self) -> String {
        match self {
            Arg::Ptr(Some(cmd)) => format!("*{}", cmd.short_name()),
            Arg::Ptr(None) => "nil".to_string(),
            Arg::Value(kind) => kind.to_string(),
            Arg::Slice(items) => {
                let mut names = items.iter().filter_map(|item| match item {
                    Arg::Ptr(Some(cmd)) => Some(cmd.short_name()),
                    _ => None,
                });
                let label = match names.next() {
                    None => "[]".to_string(),
                    Some(first) if names.all(|name| name == first) => format!("[]*{first}"),
                    Some(_) => "[]*dyn Command".to_string(),
                };
                // name the first element that is not a record reference
                let offending = items
                    .iter()
                    .enumerate()
                    .find(|(_, item)| !matches!(item, Arg::Ptr(Some(_))));
                match offending {
                    Some((index, item)) => format!("{label} ({} at index {index})", item.type_label()),
                    None => label,
                }
            }
        }
    }
}

impl<'a, C: Command> From<&'a mut C> for Arg<'a> {
    fn from(cmd: &'a mut C) -> Self {
        Arg::Ptr(Some(cmd))
    }
}

impl<'a> From<&'a mut dyn Command> for Arg<'a> {
    fn from(cmd: &'a mut dyn Command) -> Self {
        Arg::Ptr(Some(cmd))
    }
}

impl<'a, C: Command> From<Option<&'a mut C>> for Arg<'a> {
    fn from(cmd: Option<&'a mut C>) -> Self {
        Arg::Ptr(cmd.map(|c| c as &mut dyn Command))
    }
}

impl<'a, C: Command> From<Vec<&'a mut C>> for Arg<'a> {
    fn from(cmds: Vec<&'a mut C>) -> Self {
        Arg::batch(cmds)
    }
}

impl<'a, C: Command, const N: usize> From<[&'a mut C; N]> for Arg<'a> {
    fn from(cmds: [&'a mut C; N]) -> Self {
        Arg::batch(cmds)
    }
}

impl<'a> From<Vec<Arg<'a>>> for Arg<'a> {
    fn from(items: Vec<Arg<'a>>) -> Self {
        Arg::Slice(items)
    }
}

impl From<Kind> for Arg<'_> {
    fn from(kind: Kind) -> Self {
        Arg::Value(kind)
    }
}
