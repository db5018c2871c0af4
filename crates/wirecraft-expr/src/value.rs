//! The typed value universe expressions operate over.
//!
//! Literals start out as *untyped* constants (`ConstInt`, `ConstFloat`,
//! `ConstBool`) and coerce to the kind of an adjacent typed operand. Two
//! typed operands of different kinds never coerce; mixing them is an error.

use std::fmt;

use indexmap::IndexMap;

use crate::error::ExprError;

/// A named native function exposed to expressions through the environment.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub call: fn(&[Value]) -> Result<Value, ExprError>,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<func {}>", self.name)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A value in the expression universe.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
    Map(IndexMap<String, Value>),
    Struct(IndexMap<String, Value>),
    Func(Builtin),

    /// Untyped integer literal.
    ConstInt(i64),
    /// Untyped float literal.
    ConstFloat(f64),
    /// Untyped boolean literal.
    ConstBool(bool),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
            Value::Func(_) => "func",
            Value::ConstInt(_) => "untyped int constant",
            Value::ConstFloat(_) => "untyped float constant",
            Value::ConstBool(_) => "untyped bool constant",
        }
    }

    pub fn is_untyped(&self) -> bool {
        matches!(
            self,
            Value::ConstInt(_) | Value::ConstFloat(_) | Value::ConstBool(_)
        )
    }

    /// Description used by operator errors, e.g. `42 (int)`.
    pub(crate) fn describe(&self) -> String {
        format!("{} ({})", self, self.kind_name())
    }

    /// Reads the value as a boolean, accepting both typed and untyped bools.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) | Value::ConstBool(b) => Some(*b),
            _ => None,
        }
    }

    /// Reads the value as a signed integer if it is integral.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) | Value::ConstInt(v) => Some(*v),
            Value::Uint(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Reads the value as an unsigned integer if it is integral.
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Uint(v) => Some(*v),
            Value::Int(v) | Value::ConstInt(v) => Some(*v as u64),
            _ => None,
        }
    }

    /// Coerces an untyped constant to the kind of `target`.
    fn coerce_to(&self, target: &Value) -> Result<Value, ExprError> {
        let fail = || ExprError::Conversion {
            from: self.kind_name().to_string(),
            to: target.kind_name().to_string(),
        };
        match (self, target) {
            (Value::ConstInt(v), Value::Int(_)) => Ok(Value::Int(*v)),
            (Value::ConstInt(v), Value::Uint(_)) => Ok(Value::Uint(*v as u64)),
            (Value::ConstInt(v), Value::Float(_)) => Ok(Value::Float(*v as f64)),
            (Value::ConstInt(v), Value::ConstFloat(_)) => Ok(Value::ConstFloat(*v as f64)),
            (Value::ConstFloat(v), Value::Float(_)) => Ok(Value::Float(*v)),
            (Value::ConstBool(v), Value::Bool(_)) => Ok(Value::Bool(*v)),
            _ => Err(fail()),
        }
    }
}

/// Brings two operands to a common kind, converting untyped constants to the
/// kind of the typed side. Typed operands of different kinds do not mix.
pub(crate) fn promote(l: Value, r: Value) -> Result<(Value, Value), ExprError> {
    if std::mem::discriminant(&l) == std::mem::discriminant(&r) {
        return Ok((l, r));
    }
    match (l.is_untyped(), r.is_untyped()) {
        (true, false) => {
            let l2 = l.coerce_to(&r)?;
            Ok((l2, r))
        }
        (false, true) => {
            let r2 = r.coerce_to(&l)?;
            Ok((l, r2))
        }
        (true, true) => {
            // Distinct untyped kinds: int and float merge into float;
            // bool never merges with a number.
            match (&l, &r) {
                (Value::ConstInt(_), Value::ConstFloat(_)) => {
                    let l2 = l.coerce_to(&r)?;
                    Ok((l2, r))
                }
                (Value::ConstFloat(_), Value::ConstInt(_)) => {
                    let r2 = r.coerce_to(&l)?;
                    Ok((l, r2))
                }
                _ => Err(ExprError::Conversion {
                    from: l.kind_name().to_string(),
                    to: r.kind_name().to_string(),
                }),
            }
        }
        (false, false) => Err(ExprError::Conversion {
            from: l.kind_name().to_string(),
            to: r.kind_name().to_string(),
        }),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) | Value::ConstBool(v) => write!(f, "{}", v),
            Value::Int(v) | Value::ConstInt(v) => write!(f, "{}", v),
            Value::Uint(v) => write!(f, "{}", v),
            Value::Float(v) | Value::ConstFloat(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{:?}", v),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(_) => write!(f, "<map>"),
            Value::Struct(_) => write!(f, "<struct>"),
            Value::Func(b) => write!(f, "<func {}>", b.name),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote_untyped_int_to_int() {
        let (l, r) = promote(Value::ConstInt(2), Value::Int(3)).unwrap();
        assert_eq!(l, Value::Int(2));
        assert_eq!(r, Value::Int(3));
    }

    #[test]
    fn promote_untyped_int_to_float() {
        let (l, r) = promote(Value::Float(1.5), Value::ConstInt(2)).unwrap();
        assert_eq!(l, Value::Float(1.5));
        assert_eq!(r, Value::Float(2.0));
    }

    #[test]
    fn promote_untyped_pair_merges_to_float() {
        let (l, r) = promote(Value::ConstInt(1), Value::ConstFloat(0.5)).unwrap();
        assert_eq!(l, Value::ConstFloat(1.0));
        assert_eq!(r, Value::ConstFloat(0.5));
    }

    #[test]
    fn promote_rejects_typed_mismatch() {
        let err = promote(Value::Int(1), Value::Float(1.0)).unwrap_err();
        assert_eq!(
            err,
            ExprError::Conversion {
                from: "int".to_string(),
                to: "float".to_string(),
            }
        );
    }

    #[test]
    fn promote_rejects_bool_constant_with_number() {
        let err = promote(Value::Int(1), Value::ConstBool(true)).unwrap_err();
        assert_eq!(
            err,
            ExprError::Conversion {
                from: "int".to_string(),
                to: "untyped bool constant".to_string(),
            }
        );
    }
}
