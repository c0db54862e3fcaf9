use serde::{Deserialize, Serialize};

use std::fmt;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
/// A primitive value crossing the call boundary or compared against.
pub enum Value {
    Bool(bool),
    Int(i32),
    Text(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
/// The type of a call parameter or return value.
pub enum ValueKind {
    Bool,
    Int,
    Text,
    /// No return value; the call is invoked purely for its side effects.
    Unit,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(..) => ValueKind::Bool,
            Value::Int(..) => ValueKind::Int,
            Value::Text(..) => ValueKind::Text,
        }
    }

    /// Best-effort integer view, matching the memory store's coercion.
    pub fn as_int(&self) -> i32 {
        match self {
            Value::Bool(value) => *value as i32,
            Value::Int(value) => *value,
            Value::Text(value) => value.parse().unwrap_or(0),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Bool(value) => write!(f, "{}", value),
            Value::Int(value) => write!(f, "{}", value),
            Value::Text(value) => write!(f, "{}", value),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

/// Coerce a token to a bool, then an int, then a lowercased string.
///
/// The first coercion that succeeds wins; this matches how call arguments
/// and right-hand comparison values are read out of script text. `"null"`
/// reads as the empty string.
pub fn parse_bool_int_string(token: &str) -> Value {
    let token = token.trim().to_lowercase();

    if token == "null" {
        return Value::Text(String::new());
    }

    if let Ok(value) = token.parse::<bool>() {
        return Value::Bool(value);
    }

    if let Ok(value) = token.parse::<i32>() {
        return Value::Int(value);
    }

    Value::Text(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_coercion_wins_over_int_and_string() {
        assert_eq!(parse_bool_int_string("true"), Value::Bool(true));
        assert_eq!(parse_bool_int_string(" False "), Value::Bool(false));
    }

    #[test]
    fn int_coercion_wins_over_string() {
        assert_eq!(parse_bool_int_string("15"), Value::Int(15));
        assert_eq!(parse_bool_int_string("-3"), Value::Int(-3));
    }

    #[test]
    fn remaining_tokens_become_lowercased_strings() {
        assert_eq!(
            parse_bool_int_string("Toughness"),
            Value::Text("toughness".to_string())
        );
    }

    #[test]
    fn null_reads_as_the_empty_string() {
        assert_eq!(parse_bool_int_string("null"), Value::Text(String::new()));
    }
}
