//! Expression AST and post-parse constant folding.

use std::fmt;

use crate::ops;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitClear,
    BitXor,
    BitOr,
    LogAnd,
    LogOr,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitClear => "&^",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::LogAnd => "&&",
            BinaryOp::LogOr => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Const(Value),
    Ident(String),
    Paren(Box<Node>),
    Call {
        func: Box<Node>,
        args: Vec<Node>,
    },
    Index {
        operand: Box<Node>,
        index: Box<Node>,
    },
    Dot {
        operand: Box<Node>,
        member: String,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Conditional {
        cond: Box<Node>,
        then: Box<Node>,
        els: Box<Node>,
    },
}

impl Node {
    /// Folds constant subtrees into [`Node::Const`]. Folding failures (for
    /// example a type mismatch between two literals) leave the node in place
    /// so the error surfaces at evaluation time.
    pub fn constant_fold(self) -> Node {
        match self {
            Node::Const(_) | Node::Ident(_) => self,
            Node::Paren(inner) => {
                let inner = inner.constant_fold();
                match inner {
                    Node::Const(v) => Node::Const(v),
                    other => Node::Paren(Box::new(other)),
                }
            }
            Node::Call { func, args } => Node::Call {
                func: Box::new(func.constant_fold()),
                args: args.into_iter().map(Node::constant_fold).collect(),
            },
            Node::Index { operand, index } => Node::Index {
                operand: Box::new(operand.constant_fold()),
                index: Box::new(index.constant_fold()),
            },
            Node::Dot { operand, member } => Node::Dot {
                operand: Box::new(operand.constant_fold()),
                member,
            },
            Node::Unary { op, operand } => {
                let operand = operand.constant_fold();
                if let Node::Const(v) = &operand {
                    if let Ok(folded) = ops::apply_unary(op, v.clone()) {
                        return Node::Const(folded);
                    }
                }
                Node::Unary {
                    op,
                    operand: Box::new(operand),
                }
            }
            Node::Binary { op, left, right } => {
                let left = left.constant_fold();
                let right = right.constant_fold();
                if let (Node::Const(l), Node::Const(r)) = (&left, &right) {
                    if let Ok(folded) = ops::apply_binary(op, l.clone(), r.clone()) {
                        return Node::Const(folded);
                    }
                }
                Node::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            Node::Conditional { cond, then, els } => {
                let cond = cond.constant_fold();
                if let Node::Const(v) = &cond {
                    if let Some(b) = v.as_bool() {
                        return if b {
                            then.constant_fold()
                        } else {
                            els.constant_fold()
                        };
                    }
                }
                Node::Conditional {
                    cond: Box::new(cond),
                    then: Box::new(then.constant_fold()),
                    els: Box::new(els.constant_fold()),
                }
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Const(v) => write!(f, "{}", v),
            Node::Ident(name) => write!(f, "{}", name),
            Node::Paren(inner) => write!(f, "({})", inner),
            Node::Call { func, args } => {
                write!(f, "{}(", func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Node::Index { operand, index } => write!(f, "{}[{}]", operand, index),
            Node::Dot { operand, member } => write!(f, "{}.{}", operand, member),
            Node::Unary { op, operand } => write!(f, "{}{}", op.symbol(), operand),
            Node::Binary { op, left, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Node::Conditional { cond, then, els } => {
                write!(f, "{} ? {} : {}", cond, then, els)
            }
        }
    }
}
