/// Errors produced while lexing, parsing, or evaluating an expression.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unknown identifier {0}")]
    UnknownIdentifier(String),

    #[error("invalid operation: operator {op} not defined for {operand}")]
    UndefinedOperator { op: &'static str, operand: String },

    #[error("cannot convert {from} to {to}")]
    Conversion { from: String, to: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("invalid index: {0}")]
    InvalidIndex(String),

    #[error("invalid field {0}")]
    InvalidField(String),

    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("value is not callable: {0}")]
    NotCallable(String),
}
