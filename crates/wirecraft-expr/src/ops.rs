//! Operator semantics over the value universe.
//!
//! Every function promotes its operands first, then dispatches on the common
//! kind. Arithmetic wraps rather than panicking; integer division and modulo
//! by zero are reported as errors.

use crate::ast::{BinaryOp, UnaryOp};
use crate::error::ExprError;
use crate::value::{promote, Value};

pub(crate) fn apply_unary(op: UnaryOp, v: Value) -> Result<Value, ExprError> {
    match op {
        UnaryOp::Neg => negate(v),
        UnaryOp::Not => logical_not(v),
        UnaryOp::BitNot => bitwise_not(v),
    }
}

pub(crate) fn apply_binary(op: BinaryOp, l: Value, r: Value) -> Result<Value, ExprError> {
    match op {
        BinaryOp::Mul => arith(l, r, "*", i64::wrapping_mul, u64::wrapping_mul, |a, b| a * b),
        BinaryOp::Div => divide(l, r),
        BinaryOp::Rem => modulo(l, r),
        BinaryOp::Add => arith(l, r, "+", i64::wrapping_add, u64::wrapping_add, |a, b| a + b),
        BinaryOp::Sub => arith(l, r, "-", i64::wrapping_sub, u64::wrapping_sub, |a, b| a - b),
        BinaryOp::Shl => shift(l, r, false),
        BinaryOp::Shr => shift(l, r, true),
        BinaryOp::Lt => order(l, r, "<", |o| o == std::cmp::Ordering::Less),
        BinaryOp::Le => order(l, r, "<=", |o| o != std::cmp::Ordering::Greater),
        BinaryOp::Gt => order(l, r, ">", |o| o == std::cmp::Ordering::Greater),
        BinaryOp::Ge => order(l, r, ">=", |o| o != std::cmp::Ordering::Less),
        BinaryOp::Eq => equality(l, r, "==", true),
        BinaryOp::Ne => equality(l, r, "!=", false),
        BinaryOp::BitAnd => bitwise(l, r, "&", |a, b| a & b),
        BinaryOp::BitClear => bitwise(l, r, "&^", |a, b| a & !b),
        BinaryOp::BitXor => bitwise(l, r, "^", |a, b| a ^ b),
        BinaryOp::BitOr => bitwise(l, r, "|", |a, b| a | b),
        BinaryOp::LogAnd => logical(l, r, "&&", |a, b| a && b),
        BinaryOp::LogOr => logical(l, r, "||", |a, b| a || b),
    }
}

fn undefined(op: &'static str, v: &Value) -> ExprError {
    ExprError::UndefinedOperator {
        op,
        operand: v.describe(),
    }
}

fn negate(v: Value) -> Result<Value, ExprError> {
    match v {
        Value::Int(a) => Ok(Value::Int(a.wrapping_neg())),
        Value::Uint(a) => Ok(Value::Uint(a.wrapping_neg())),
        Value::Float(a) => Ok(Value::Float(-a)),
        Value::ConstInt(a) => Ok(Value::ConstInt(a.wrapping_neg())),
        Value::ConstFloat(a) => Ok(Value::ConstFloat(-a)),
        other => Err(undefined("-", &other)),
    }
}

fn logical_not(v: Value) -> Result<Value, ExprError> {
    match v {
        Value::Bool(a) => Ok(Value::Bool(!a)),
        Value::ConstBool(a) => Ok(Value::ConstBool(!a)),
        other => Err(undefined("!", &other)),
    }
}

fn bitwise_not(v: Value) -> Result<Value, ExprError> {
    match v {
        Value::Int(a) => Ok(Value::Int(!a)),
        Value::Uint(a) => Ok(Value::Uint(!a)),
        Value::ConstInt(a) => Ok(Value::ConstInt(!a)),
        other => Err(undefined("~", &other)),
    }
}

fn arith(
    l: Value,
    r: Value,
    op: &'static str,
    fi: fn(i64, i64) -> i64,
    fu: fn(u64, u64) -> u64,
    ff: fn(f64, f64) -> f64,
) -> Result<Value, ExprError> {
    match promote(l, r)? {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(fi(a, b))),
        (Value::Uint(a), Value::Uint(b)) => Ok(Value::Uint(fu(a, b))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(ff(a, b))),
        (Value::ConstInt(a), Value::ConstInt(b)) => Ok(Value::ConstInt(fi(a, b))),
        (Value::ConstFloat(a), Value::ConstFloat(b)) => Ok(Value::ConstFloat(ff(a, b))),
        (other, _) => Err(undefined(op, &other)),
    }
}

fn divide(l: Value, r: Value) -> Result<Value, ExprError> {
    match promote(l, r)? {
        (Value::Int(a), Value::Int(b)) => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            Ok(Value::Int(a.wrapping_div(b)))
        }
        (Value::Uint(a), Value::Uint(b)) => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            Ok(Value::Uint(a / b))
        }
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a / b)),
        (Value::ConstInt(a), Value::ConstInt(b)) => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            Ok(Value::ConstInt(a.wrapping_div(b)))
        }
        (Value::ConstFloat(a), Value::ConstFloat(b)) => Ok(Value::ConstFloat(a / b)),
        (other, _) => Err(undefined("/", &other)),
    }
}

fn modulo(l: Value, r: Value) -> Result<Value, ExprError> {
    match promote(l, r)? {
        (Value::Int(a), Value::Int(b)) => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            Ok(Value::Int(a.wrapping_rem(b)))
        }
        (Value::Uint(a), Value::Uint(b)) => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            Ok(Value::Uint(a % b))
        }
        (Value::ConstInt(a), Value::ConstInt(b)) => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            Ok(Value::ConstInt(a.wrapping_rem(b)))
        }
        (other, _) => Err(undefined("%", &other)),
    }
}

fn shift_amount(v: &Value) -> Result<u32, ExprError> {
    match v {
        Value::Uint(n) => Ok((*n).min(u32::MAX as u64) as u32),
        Value::Int(n) | Value::ConstInt(n) if *n >= 0 => Ok((*n).min(u32::MAX as i64) as u32),
        other => Err(undefined("shift", other)),
    }
}

fn shift(l: Value, r: Value, right: bool) -> Result<Value, ExprError> {
    let amt = shift_amount(&r)?;
    match l {
        Value::Int(a) => Ok(Value::Int(if right {
            a >> amt.min(63)
        } else if amt >= 64 {
            0
        } else {
            a.wrapping_shl(amt)
        })),
        Value::Uint(a) => Ok(Value::Uint(if amt >= 64 {
            0
        } else if right {
            a >> amt
        } else {
            a << amt
        })),
        Value::ConstInt(a) => Ok(Value::ConstInt(if right {
            a >> amt.min(63)
        } else if amt >= 64 {
            0
        } else {
            a.wrapping_shl(amt)
        })),
        other => Err(undefined(if right { ">>" } else { "<<" }, &other)),
    }
}

fn bitwise(l: Value, r: Value, op: &'static str, f: fn(u64, u64) -> u64) -> Result<Value, ExprError> {
    match promote(l, r)? {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(f(a as u64, b as u64) as i64)),
        (Value::Uint(a), Value::Uint(b)) => Ok(Value::Uint(f(a, b))),
        (Value::ConstInt(a), Value::ConstInt(b)) => {
            Ok(Value::ConstInt(f(a as u64, b as u64) as i64))
        }
        (other, _) => Err(undefined(op, &other)),
    }
}

fn logical(l: Value, r: Value, op: &'static str, f: fn(bool, bool) -> bool) -> Result<Value, ExprError> {
    match promote(l, r)? {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(f(a, b))),
        (Value::ConstBool(a), Value::ConstBool(b)) => Ok(Value::ConstBool(f(a, b))),
        (other, _) => Err(undefined(op, &other)),
    }
}

fn equality(l: Value, r: Value, op: &'static str, want_eq: bool) -> Result<Value, ExprError> {
    let eq = match promote(l, r)? {
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::ConstBool(a), Value::ConstBool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Uint(a), Value::Uint(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::ConstInt(a), Value::ConstInt(b)) => a == b,
        (Value::ConstFloat(a), Value::ConstFloat(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (other, _) => return Err(undefined(op, &other)),
    };
    Ok(Value::Bool(eq == want_eq))
}

fn order(
    l: Value,
    r: Value,
    op: &'static str,
    f: fn(std::cmp::Ordering) -> bool,
) -> Result<Value, ExprError> {
    use std::cmp::Ordering;
    let ord = match promote(l, r)? {
        (Value::Int(a), Value::Int(b)) => a.cmp(&b),
        (Value::Uint(a), Value::Uint(b)) => a.cmp(&b),
        (Value::ConstInt(a), Value::ConstInt(b)) => a.cmp(&b),
        (Value::Float(a), Value::Float(b)) => {
            a.partial_cmp(&b).unwrap_or(Ordering::Greater)
        }
        (Value::ConstFloat(a), Value::ConstFloat(b)) => {
            a.partial_cmp(&b).unwrap_or(Ordering::Greater)
        }
        (Value::Str(a), Value::Str(b)) => a.cmp(&b),
        (other, _) => return Err(undefined(op, &other)),
    };
    Ok(Value::Bool(f(ord)))
}

pub(crate) fn index(operand: Value, idx: Value) -> Result<Value, ExprError> {
    match operand {
        Value::Str(s) => {
            let i = idx
                .as_uint()
                .ok_or_else(|| ExprError::InvalidIndex(idx.describe()))? as usize;
            s.as_bytes()
                .get(i)
                .map(|b| Value::Uint(*b as u64))
                .ok_or_else(|| ExprError::InvalidIndex(format!("{} out of range", i)))
        }
        Value::Array(items) => {
            let i = idx
                .as_uint()
                .ok_or_else(|| ExprError::InvalidIndex(idx.describe()))? as usize;
            items
                .get(i)
                .cloned()
                .ok_or_else(|| ExprError::InvalidIndex(format!("{} out of range", i)))
        }
        Value::Map(m) | Value::Struct(m) => match idx {
            Value::Str(key) => m
                .get(&key)
                .cloned()
                .ok_or(ExprError::InvalidField(key)),
            other => Err(ExprError::InvalidIndex(other.describe())),
        },
        other => Err(undefined("[]", &other)),
    }
}

pub(crate) fn descend(operand: Value, member: &str) -> Result<Value, ExprError> {
    match operand {
        Value::Struct(m) | Value::Map(m) => m
            .get(member)
            .cloned()
            .ok_or_else(|| ExprError::InvalidField(member.to_string())),
        other => Err(undefined(".", &other)),
    }
}

pub(crate) fn call(f: Value, args: &[Value]) -> Result<Value, ExprError> {
    match f {
        Value::Func(b) => (b.call)(args),
        other => Err(ExprError::NotCallable(other.describe())),
    }
}
