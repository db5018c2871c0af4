//! Engine error type. Every failure is fatal to the current operation;
//! recovery is the caller's business.

/// Errors raised while compiling descriptors or packing/unpacking values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed annotation: bad option word, unknown or disallowed type,
    /// bit width out of range.
    #[error("invalid annotation: {0}")]
    Annotation(String),

    /// `sizeof`/`sizefrom` names a missing or ineligible sibling.
    #[error("cannot resolve size field: {0}")]
    Resolution(String),

    /// Decode would read past the end of the input, or encode would overrun
    /// the precomputed output buffer.
    #[error("buffer exhausted: need {needed} more bit(s), {available} available")]
    Buffer { needed: usize, available: usize },

    /// Value shape incompatible with the declared wire type.
    #[error("type mismatch: {0}")]
    Type(String),

    /// An embedded expression failed to parse or evaluate.
    #[error(transparent)]
    Expr(#[from] wirecraft_expr::ExprError),

    /// Propagated from a custom packer/unpacker.
    #[error("custom codec: {0}")]
    Hook(String),
}

pub type Result<T> = std::result::Result<T, Error>;
