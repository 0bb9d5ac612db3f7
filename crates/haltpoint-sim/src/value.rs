use std::collections::BTreeMap;
use std::fmt;

/// Object of the simulated runtime.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SimValue {
    /// Absence of value.
    #[default]
    Nil,

    /// Boolean.
    Bool(bool),

    /// Integer.
    Int(i64),

    /// String.
    Str(String),

    /// Class.
    Class(String),

    /// Instance of a class.
    Object {
        /// Class of the instance.
        class: String,
    },

    /// Lexical scope of a frame (local variables).
    Binding(BTreeMap<String, SimValue>),
}

impl SimValue {
    /// Whether the value is considered true by conditions.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Nil | Self::Bool(false))
    }

    /// Looks up a local variable, if this value is a binding.
    pub fn local(&self, name: &str) -> Option<&SimValue> {
        match self {
            Self::Binding(locals) => locals.get(name),
            _ => None,
        }
    }
}

impl fmt::Display for SimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("nil"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Class(name) => f.write_str(name),
            Self::Object { class } => write!(f, "#<{class}>"),
            Self::Binding(locals) => {
                f.write_str("#<Binding")?;
                for (name, value) in locals {
                    write!(f, " {name}={value}")?;
                }
                f.write_str(">")
            }
        }
    }
}

impl From<bool> for SimValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for SimValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for SimValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for SimValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}
