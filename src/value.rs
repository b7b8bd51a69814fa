//! The typed value model for settings.
//!
//! Every setting's default, runtime override, and resolved result is a
//! [`Value`]. Resolver selection is a total match over the variants, so a
//! default of `Value::Bool(false)` selects the boolean resolver without any
//! runtime reflection.

use std::fmt;

/// A typed setting value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Homogeneous list; element type is fixed by the option's resolver.
    List(Vec<Value>),
    /// Fixed-arity heterogeneous tuple with a per-position type signature.
    Tuple(Vec<Value>),
}

impl Value {
    /// The resolver tag this value's type maps to.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Str(_) => "str",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Plain display form, used when this value is substituted into an
    /// interpolated string. Strings are unquoted.
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) | Value::Tuple(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_cover_all_variants() {
        assert_eq!(Value::from("x").type_tag(), "str");
        assert_eq!(Value::from(1i64).type_tag(), "int");
        assert_eq!(Value::from(1.5).type_tag(), "float");
        assert_eq!(Value::from(true).type_tag(), "bool");
        assert_eq!(Value::from(vec![1i64, 2]).type_tag(), "list");
        assert_eq!(Value::Tuple(vec![]).type_tag(), "tuple");
    }

    #[test]
    fn text_form_leaves_strings_unquoted() {
        assert_eq!(Value::from("hello").to_text(), "hello");
        assert_eq!(Value::from(8080i64).to_text(), "8080");
        assert_eq!(Value::from(false).to_text(), "false");
    }

    #[test]
    fn text_form_joins_sequences() {
        let v = Value::Tuple(vec![Value::from("a"), Value::from(1i64)]);
        assert_eq!(v.to_text(), "a, 1");
    }

    #[test]
    fn accessors_reject_other_variants() {
        assert_eq!(Value::from(1i64).as_str(), None);
        assert_eq!(Value::from("x").as_int(), None);
        assert_eq!(Value::from(true).as_bool(), Some(true));
    }
}
