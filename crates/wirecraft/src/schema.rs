//! Type descriptors: the canonical, source-independent description of every
//! packable shape, and the declared layout of record types.

use std::sync::Arc;

/// Canonical description of a packable type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDesc {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Complex of two `f32` halves, real part first.
    C64,
    /// Complex of two `f64` halves, real part first.
    C128,
    Array { len: usize, elem: Box<TypeDesc> },
    Slice(Box<TypeDesc>),
    Str,
    Struct(Arc<StructType>),
    /// A type whose codec is entirely user-provided; `name` ties values to
    /// their declaration.
    Custom(String),
}

impl TypeDesc {
    /// Fixed width in bits for primitive types.
    pub fn bit_width(&self) -> Option<usize> {
        match self {
            TypeDesc::Bool | TypeDesc::I8 | TypeDesc::U8 => Some(8),
            TypeDesc::I16 | TypeDesc::U16 => Some(16),
            TypeDesc::I32 | TypeDesc::U32 | TypeDesc::F32 => Some(32),
            TypeDesc::I64 | TypeDesc::U64 | TypeDesc::F64 | TypeDesc::C64 => Some(64),
            TypeDesc::C128 => Some(128),
            _ => None,
        }
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            TypeDesc::I8 | TypeDesc::I16 | TypeDesc::I32 | TypeDesc::I64
        )
    }

    pub fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            TypeDesc::U8 | TypeDesc::U16 | TypeDesc::U32 | TypeDesc::U64
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer()
    }

    /// Whether a bit-subfield width may be applied to this wire type.
    pub fn valid_bit_type(&self) -> bool {
        self.is_integer()
            || matches!(
                self,
                TypeDesc::Bool | TypeDesc::F32 | TypeDesc::F64 | TypeDesc::C64 | TypeDesc::C128
            )
    }

    /// Whether this native type can be the target of a size driver.
    pub fn valid_size_type(&self) -> bool {
        matches!(self, TypeDesc::Slice(_) | TypeDesc::Str)
    }

    /// Element type of a container. Strings read as byte sequences.
    pub fn elem(&self) -> Option<TypeDesc> {
        match self {
            TypeDesc::Array { elem, .. } => Some((**elem).clone()),
            TypeDesc::Slice(elem) => Some((**elem).clone()),
            TypeDesc::Str => Some(TypeDesc::U8),
            _ => None,
        }
    }
}

/// One declared field of a record: a name, its native type, the wire
/// annotation, and the optional expression slots.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeDesc,
    /// Comma-separated option list; see the annotation grammar.
    pub tag: String,
    /// Controls presence; must evaluate to a boolean.
    pub if_expr: Option<String>,
    /// Element count for a variable-length field; must evaluate to an integer.
    pub size_expr: Option<String>,
    /// Wire width in bits; must evaluate to an integer.
    pub bits_expr: Option<String>,
    /// Post-processes a decoded value; the raw value is bound to `_`.
    pub in_expr: Option<String>,
    /// Pre-processes a value before encoding; the native value is bound to `_`.
    pub out_expr: Option<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty,
            tag: String::new(),
            if_expr: None,
            size_expr: None,
            bits_expr: None,
            in_expr: None,
            out_expr: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_if(mut self, expr: impl Into<String>) -> Self {
        self.if_expr = Some(expr.into());
        self
    }

    pub fn with_size(mut self, expr: impl Into<String>) -> Self {
        self.size_expr = Some(expr.into());
        self
    }

    pub fn with_bits(mut self, expr: impl Into<String>) -> Self {
        self.bits_expr = Some(expr.into());
        self
    }

    pub fn with_in(mut self, expr: impl Into<String>) -> Self {
        self.in_expr = Some(expr.into());
        self
    }

    pub fn with_out(mut self, expr: impl Into<String>) -> Self {
        self.out_expr = Some(expr.into());
        self
    }
}

/// A record type: an ordered, named collection of typed fields. Identity is
/// the `Arc` allocation; the descriptor cache keys on it.
#[derive(Debug, PartialEq)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl StructType {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Arc<StructType> {
        Arc::new(StructType {
            name: name.into(),
            fields,
        })
    }

    /// Declaration index of a field by name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}
