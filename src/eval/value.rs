// Runtime value type for expression evaluation

use std::fmt;

use crate::error::EvalError;

/// Runtime value produced by expression evaluation.
///
/// `Null` is the void result: attribute arguments and conditions that
/// evaluate to it are rejected at the point of use.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unsigned(u128),
    Signed(i128),
    Bool(bool),
    String(String),
    Null,
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert to unsigned integer
    #[inline]
    pub fn to_unsigned(&self) -> Result<u128, EvalError> {
        match self {
            Value::Unsigned(v) => Ok(*v),
            Value::Signed(v) => Ok(*v as u128),
            Value::Bool(v) => Ok(if *v { 1 } else { 0 }),
            Value::Null => Ok(0),
            _ => Err(EvalError::new(format!(
                "cannot convert {} to unsigned",
                self.type_name()
            ))),
        }
    }

    /// Convert to signed integer
    #[inline]
    pub fn to_signed(&self) -> Result<i128, EvalError> {
        match self {
            Value::Unsigned(v) => Ok(*v as i128),
            Value::Signed(v) => Ok(*v),
            Value::Bool(v) => Ok(if *v { 1 } else { 0 }),
            Value::Null => Ok(0),
            _ => Err(EvalError::new(format!(
                "cannot convert {} to signed",
                self.type_name()
            ))),
        }
    }

    /// Convert to bool. Integers follow C semantics: nonzero is true.
    #[inline]
    pub fn to_bool(&self) -> Result<bool, EvalError> {
        match self {
            Value::Bool(v) => Ok(*v),
            Value::Unsigned(v) => Ok(*v != 0),
            Value::Signed(v) => Ok(*v != 0),
            _ => Err(EvalError::new(format!(
                "cannot convert {} to bool",
                self.type_name()
            ))),
        }
    }

    /// Convert to an owned string for display-oriented attributes
    pub fn to_display_string(&self) -> Result<String, EvalError> {
        match self {
            Value::String(s) => Ok(s.clone()),
            Value::Unsigned(v) => Ok(v.to_string()),
            Value::Signed(v) => Ok(v.to_string()),
            Value::Bool(v) => Ok(v.to_string()),
            Value::Null => Err(EvalError::new("cannot convert void to string")),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unsigned(_) => "unsigned",
            Value::Signed(_) => "signed",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Null => "void",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unsigned(v) => write!(f, "{}", v),
            Value::Signed(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Null => write!(f, "void"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_unsigned() {
        assert_eq!(Value::Unsigned(42).to_unsigned().unwrap(), 42);
        assert_eq!(Value::Signed(-1).to_unsigned().unwrap(), u128::MAX);
        assert_eq!(Value::Bool(true).to_unsigned().unwrap(), 1);
        assert!(Value::String("x".into()).to_unsigned().is_err());
    }

    #[test]
    fn test_to_bool_nonzero() {
        assert!(Value::Unsigned(7).to_bool().unwrap());
        assert!(!Value::Signed(0).to_bool().unwrap());
        assert!(Value::Null.to_bool().is_err());
    }

    #[test]
    fn test_null_is_void() {
        assert!(Value::Null.is_null());
        assert!(!Value::Unsigned(0).is_null());
        assert_eq!(Value::Null.type_name(), "void");
    }
}
