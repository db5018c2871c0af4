//! Tree-walking evaluator.
//!
//! Evaluation is strict: both operands of a binary operator are computed
//! before the operator is applied, including `&&` and `||`. The ternary is
//! the single exception; only the taken branch runs.

use crate::ast::Node;
use crate::env::Resolver;
use crate::error::ExprError;
use crate::ops;
use crate::value::Value;

pub fn evaluate(env: &dyn Resolver, node: &Node) -> Result<Value, ExprError> {
    match node {
        Node::Const(v) => Ok(v.clone()),
        Node::Ident(name) => env
            .resolve(name)
            .ok_or_else(|| ExprError::UnknownIdentifier(name.clone())),
        Node::Paren(inner) => evaluate(env, inner),
        Node::Unary { op, operand } => {
            let v = evaluate(env, operand)?;
            ops::apply_unary(*op, v)
        }
        Node::Binary { op, left, right } => {
            let l = evaluate(env, left)?;
            let r = evaluate(env, right)?;
            ops::apply_binary(*op, l, r)
        }
        Node::Conditional { cond, then, els } => {
            let c = evaluate(env, cond)?;
            match c.as_bool() {
                Some(true) => evaluate(env, then),
                Some(false) => evaluate(env, els),
                None => Err(ExprError::Conversion {
                    from: c.kind_name().to_string(),
                    to: "bool".to_string(),
                }),
            }
        }
        Node::Call { func, args } => {
            let f = evaluate(env, func)?;
            let args = args
                .iter()
                .map(|a| evaluate(env, a))
                .collect::<Result<Vec<_>, _>>()?;
            ops::call(f, &args)
        }
        Node::Index { operand, index } => {
            let o = evaluate(env, operand)?;
            let i = evaluate(env, index)?;
            ops::index(o, i)
        }
        Node::Dot { operand, member } => {
            let o = evaluate(env, operand)?;
            ops::descend(o, member)
        }
    }
}
