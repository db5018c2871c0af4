//! Expression scope over the live record tree.
//!
//! While a record is being walked, the current record's visible fields (the
//! decoded prefix during decode, everything during encode and sizing) form
//! the innermost scope, chained to its ancestors. Identifier resolution goes
//! global builtins first, then the record's fields; `_parent` and `_root`
//! name the enclosing and outermost record.

use indexmap::IndexMap;

use wirecraft_expr as expr;
use wirecraft_expr::Resolver;

use crate::errors::{Error, Result};
use crate::schema::StructType;
use crate::value::{StructValue, Value};

/// A lexical frame over one record. `before` holds the fields declared ahead
/// of the current one, `after` the rest; the current field itself does not
/// resolve.
pub(crate) struct Scope<'a> {
    pub ty: &'a StructType,
    pub before: &'a [Value],
    pub after: &'a [Value],
    pub parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// A frame exposing every field of a record, used by sizing and encode.
    pub fn full(ty: &'a StructType, fields: &'a [Value], parent: Option<&'a Scope<'a>>) -> Self {
        Scope {
            ty,
            before: fields,
            after: &[],
            parent,
        }
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        let idx = self.ty.field_index(name)?;
        if idx < self.before.len() {
            Some(&self.before[idx])
        } else if idx > self.before.len() {
            self.after.get(idx - self.before.len() - 1)
        } else {
            None
        }
    }

    fn as_struct_value(&self) -> expr::Value {
        let mut map = IndexMap::new();
        for def in &self.ty.fields {
            if let Some(v) = self.lookup(&def.name) {
                map.insert(def.name.clone(), to_expr_value(v));
            }
        }
        expr::Value::Struct(map)
    }
}

/// Converts an engine value into the expression universe.
pub(crate) fn to_expr_value(v: &Value) -> expr::Value {
    match v {
        Value::Bool(b) => expr::Value::Bool(*b),
        Value::I8(x) => expr::Value::Int(*x as i64),
        Value::I16(x) => expr::Value::Int(*x as i64),
        Value::I32(x) => expr::Value::Int(*x as i64),
        Value::I64(x) => expr::Value::Int(*x),
        Value::U8(x) => expr::Value::Uint(*x as u64),
        Value::U16(x) => expr::Value::Uint(*x as u64),
        Value::U32(x) => expr::Value::Uint(*x as u64),
        Value::U64(x) => expr::Value::Uint(*x),
        Value::F32(x) => expr::Value::Float(*x as f64),
        Value::F64(x) => expr::Value::Float(*x),
        Value::C64(c) => complex_value(c.re as f64, c.im as f64),
        Value::C128(c) => complex_value(c.re, c.im),
        Value::Str(s) => expr::Value::Str(s.clone()),
        Value::Bytes(b) => {
            expr::Value::Array(b.iter().map(|x| expr::Value::Uint(*x as u64)).collect())
        }
        Value::Array(items) | Value::Slice(items) => {
            expr::Value::Array(items.iter().map(to_expr_value).collect())
        }
        Value::Struct(sv) => struct_to_expr_value(sv),
        // Opaque to expressions.
        Value::Custom(_) => expr::Value::Struct(IndexMap::new()),
    }
}

fn complex_value(re: f64, im: f64) -> expr::Value {
    let mut map = IndexMap::new();
    map.insert("re".to_string(), expr::Value::Float(re));
    map.insert("im".to_string(), expr::Value::Float(im));
    expr::Value::Struct(map)
}

fn struct_to_expr_value(sv: &StructValue) -> expr::Value {
    let mut map = IndexMap::new();
    for (def, field) in sv.ty().fields.iter().zip(&sv.fields) {
        map.insert(def.name.clone(), to_expr_value(field));
    }
    expr::Value::Struct(map)
}

/// Stores an expression result back into a native slot.
pub(crate) fn store_expr_value(slot: &mut Value, ev: expr::Value) -> Result<()> {
    match (&mut *slot, ev) {
        (Value::Bool(b), v) => match v.as_bool() {
            Some(x) => {
                *b = x;
                Ok(())
            }
            None => Err(conversion_error(&v, "bool")),
        },
        (Value::F32(f), v) => match &v {
            expr::Value::Float(x) | expr::Value::ConstFloat(x) => {
                *f = *x as f32;
                Ok(())
            }
            _ => match v.as_int() {
                Some(x) => {
                    *f = x as f32;
                    Ok(())
                }
                None => Err(conversion_error(&v, "float")),
            },
        },
        (Value::F64(f), v) => match &v {
            expr::Value::Float(x) | expr::Value::ConstFloat(x) => {
                *f = *x;
                Ok(())
            }
            _ => match v.as_int() {
                Some(x) => {
                    *f = x as f64;
                    Ok(())
                }
                None => Err(conversion_error(&v, "float")),
            },
        },
        (Value::Str(s), expr::Value::Str(x)) => {
            *s = x;
            Ok(())
        }
        (slot, v) => match v.as_int() {
            Some(x) => slot.store_int(x),
            None => Err(conversion_error(&v, "integer")),
        },
    }
}

fn conversion_error(v: &expr::Value, to: &str) -> Error {
    Error::Type(format!(
        "cannot store expression result {} into a {} field",
        v.kind_name(),
        to
    ))
}

/// Resolver layering: builtins, then `_`/`_parent`/`_root`, then the scope.
struct ScopeResolver<'a> {
    scope: Option<&'a Scope<'a>>,
    raw: Option<&'a expr::Value>,
}

impl Resolver for ScopeResolver<'_> {
    fn resolve(&self, name: &str) -> Option<expr::Value> {
        if let Some(v) = expr::stdlib().get(name) {
            return Some(v.clone());
        }
        if name == "_" {
            return self.raw.cloned();
        }
        let scope = self.scope?;
        match name {
            "_parent" => scope.parent.map(Scope::as_struct_value),
            "_root" => {
                let mut s = scope;
                while let Some(p) = s.parent {
                    s = p;
                }
                Some(s.as_struct_value())
            }
            _ => scope.lookup(name).map(to_expr_value),
        }
    }
}

/// Evaluates a compiled program against the current frame. `raw` binds the
/// identifier `_` for `in`/`out` slots.
pub(crate) fn eval_program(
    program: &expr::Program,
    scope: Option<&Scope<'_>>,
    raw: Option<&expr::Value>,
) -> Result<expr::Value> {
    let resolver = ScopeResolver { scope, raw };
    Ok(program.eval(&resolver)?)
}
