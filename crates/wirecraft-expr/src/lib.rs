//! # wirecraft-expr
//!
//! A small strict-evaluation expression language used by the `wirecraft`
//! codec to compute field sizes, bit widths, and conditional presence at
//! runtime. Expressions are conventional infix with the usual precedence,
//! evaluated against a host-supplied [`Resolver`] scope.
//!
//! ## Example
//!
//! ```
//! use indexmap::IndexMap;
//! use wirecraft_expr::{MapResolver, Program, Value};
//!
//! let mut fields = IndexMap::new();
//! fields.insert("Count".to_string(), Value::Uint(3));
//! let env = MapResolver::new(fields);
//!
//! let program = Program::compile("Count * 8 + 1").unwrap();
//! assert_eq!(program.eval(&env).unwrap(), Value::Uint(25));
//! ```

pub mod ast;
pub mod builtin;
pub mod env;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod value;

pub use builtin::stdlib;
pub use env::{MapResolver, MetaResolver, Resolver};
pub use error::ExprError;
pub use value::{Builtin, Value};

use ast::Node;

/// A compiled expression: parsed once, constant-folded, evaluated many times.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    source: String,
    root: Node,
}

impl Program {
    /// Parses and folds `source`.
    pub fn compile(source: &str) -> Result<Program, ExprError> {
        let root = parser::parse(source)?.constant_fold();
        Ok(Program {
            source: source.to_string(),
            root,
        })
    }

    /// Evaluates the program against `env`.
    pub fn eval(&self, env: &dyn Resolver) -> Result<Value, ExprError> {
        eval::evaluate(env, &self.root)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Empty;

    impl Resolver for Empty {
        fn resolve(&self, _name: &str) -> Option<Value> {
            None
        }
    }

    #[test]
    fn program_round_trip() {
        let p = Program::compile("1 + 2 * 3").unwrap();
        assert_eq!(p.source(), "1 + 2 * 3");
        assert_eq!(p.eval(&Empty).unwrap(), Value::ConstInt(7));
    }

    #[test]
    fn compile_reports_syntax_errors() {
        assert!(matches!(
            Program::compile("1 +").unwrap_err(),
            ExprError::Syntax(_)
        ));
    }
}
