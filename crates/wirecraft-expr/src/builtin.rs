//! The standard global environment: `len`, numeric casts, and the
//! summation helpers. Hosts layer this under their own scope.

use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::error::ExprError;
use crate::value::{Builtin, Value};

/// The builtin name → value map, built once.
pub fn stdlib() -> &'static IndexMap<String, Value> {
    static STDLIB: OnceLock<IndexMap<String, Value>> = OnceLock::new();
    STDLIB.get_or_init(|| {
        let entries: &[(&'static str, fn(&[Value]) -> Result<Value, ExprError>)] = &[
            ("len", builtin_len),
            ("int", builtin_int),
            ("uint", builtin_uint),
            ("float", builtin_float),
            ("first", builtin_first),
            ("last", builtin_last),
            ("sum", builtin_sum),
            ("usum", builtin_usum),
            ("fsum", builtin_fsum),
        ];
        entries
            .iter()
            .map(|&(name, call)| (name.to_string(), Value::Func(Builtin { name, call })))
            .collect()
    })
}

fn single<'a>(name: &str, args: &'a [Value]) -> Result<&'a Value, ExprError> {
    if args.len() != 1 {
        return Err(ExprError::Arity {
            name: name.to_string(),
            expected: 1,
            got: args.len(),
        });
    }
    Ok(&args[0])
}

fn builtin_len(args: &[Value]) -> Result<Value, ExprError> {
    let n = match single("len", args)? {
        Value::Str(s) => s.len(),
        Value::Array(items) => items.len(),
        Value::Map(m) | Value::Struct(m) => m.len(),
        other => {
            return Err(ExprError::UndefinedOperator {
                op: "len",
                operand: other.describe(),
            })
        }
    };
    Ok(Value::Uint(n as u64))
}

fn numeric(name: &str, v: &Value) -> Result<f64, ExprError> {
    match v {
        Value::Int(x) | Value::ConstInt(x) => Ok(*x as f64),
        Value::Uint(x) => Ok(*x as f64),
        Value::Float(x) | Value::ConstFloat(x) => Ok(*x),
        other => Err(ExprError::Conversion {
            from: other.kind_name().to_string(),
            to: name.to_string(),
        }),
    }
}

fn builtin_int(args: &[Value]) -> Result<Value, ExprError> {
    let v = single("int", args)?;
    let out = match v {
        Value::Int(x) | Value::ConstInt(x) => *x,
        Value::Uint(x) => *x as i64,
        Value::Float(x) | Value::ConstFloat(x) => *x as i64,
        other => {
            return Err(ExprError::Conversion {
                from: other.kind_name().to_string(),
                to: "int".to_string(),
            })
        }
    };
    Ok(Value::Int(out))
}

fn builtin_uint(args: &[Value]) -> Result<Value, ExprError> {
    let v = single("uint", args)?;
    let out = match v {
        Value::Int(x) | Value::ConstInt(x) => *x as u64,
        Value::Uint(x) => *x,
        Value::Float(x) | Value::ConstFloat(x) => *x as u64,
        other => {
            return Err(ExprError::Conversion {
                from: other.kind_name().to_string(),
                to: "uint".to_string(),
            })
        }
    };
    Ok(Value::Uint(out))
}

fn builtin_float(args: &[Value]) -> Result<Value, ExprError> {
    let v = single("float", args)?;
    Ok(Value::Float(numeric("float", v)?))
}

fn builtin_first(args: &[Value]) -> Result<Value, ExprError> {
    match single("first", args)? {
        Value::Array(items) => items
            .first()
            .cloned()
            .ok_or_else(|| ExprError::InvalidIndex("first of empty array".to_string())),
        other => Err(ExprError::UndefinedOperator {
            op: "first",
            operand: other.describe(),
        }),
    }
}

fn builtin_last(args: &[Value]) -> Result<Value, ExprError> {
    match single("last", args)? {
        Value::Array(items) => items
            .last()
            .cloned()
            .ok_or_else(|| ExprError::InvalidIndex("last of empty array".to_string())),
        other => Err(ExprError::UndefinedOperator {
            op: "last",
            operand: other.describe(),
        }),
    }
}

fn accumulate<T, F>(args: &[Value], acc: &mut T, f: &F) -> Result<(), ExprError>
where
    F: Fn(&mut T, f64),
{
    for arg in args {
        match arg {
            Value::Int(x) | Value::ConstInt(x) => f(acc, *x as f64),
            Value::Uint(x) => f(acc, *x as f64),
            Value::Float(x) | Value::ConstFloat(x) => f(acc, *x),
            Value::Array(items) => accumulate(items, acc, f)?,
            Value::Map(m) | Value::Struct(m) => {
                for v in m.values() {
                    accumulate(std::slice::from_ref(v), acc, f)?;
                }
            }
            other => {
                return Err(ExprError::UndefinedOperator {
                    op: "sum",
                    operand: other.describe(),
                })
            }
        }
    }
    Ok(())
}

fn builtin_sum(args: &[Value]) -> Result<Value, ExprError> {
    let mut total: i64 = 0;
    accumulate(args, &mut total, &|acc, v| *acc = acc.wrapping_add(v as i64))?;
    Ok(Value::Int(total))
}

fn builtin_usum(args: &[Value]) -> Result<Value, ExprError> {
    let mut total: u64 = 0;
    accumulate(args, &mut total, &|acc, v| {
        *acc = acc.wrapping_add(v as u64)
    })?;
    Ok(Value::Uint(total))
}

fn builtin_fsum(args: &[Value]) -> Result<Value, ExprError> {
    let mut total: f64 = 0.0;
    accumulate(args, &mut total, &|acc, v| *acc += v)?;
    Ok(Value::Float(total))
}
