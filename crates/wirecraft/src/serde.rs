//! JSON-deserializable record type descriptions.
//!
//! These mirror types describe the *shape* of the data to be packed. They
//! are intended to be loaded from JSON (for example a schema file shipped
//! with your application) and then converted into core types with `TryFrom`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::schema::{FieldDef, StructType, TypeDesc};
use crate::typestr::parse_type;

/// Top-level record type definition.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StructTypeDef {
    pub name: String,
    pub fields: Vec<FieldDefDef>,
}

/// Description of a single field.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FieldDefDef {
    /// Field name; `_` is padding.
    pub name: String,
    /// Native type: a type expression string or an inline record definition.
    #[serde(rename = "type")]
    pub ty: TypeRefDef,
    /// Annotation option list.
    #[serde(default)]
    pub tag: String,
    /// Presence condition.
    #[serde(default, rename = "if")]
    pub if_expr: Option<String>,
    /// Element count expression.
    #[serde(default, rename = "size")]
    pub size_expr: Option<String>,
    /// Bit width expression.
    #[serde(default, rename = "bits")]
    pub bits_expr: Option<String>,
    /// Post-decode transform; the raw value is `_`.
    #[serde(default, rename = "in")]
    pub in_expr: Option<String>,
    /// Pre-encode transform; the native value is `_`.
    #[serde(default, rename = "out")]
    pub out_expr: Option<String>,
}

/// A type reference: either a type expression or an inline record.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum TypeRefDef {
    Name(String),
    Struct(StructTypeDef),
    /// A slice of an inline record: `{"slice": {...}}`.
    SliceOf { slice: Box<TypeRefDef> },
    /// A fixed array of an inline record: `{"array": {...}, "len": N}`.
    ArrayOf { array: Box<TypeRefDef>, len: usize },
}

impl TryFrom<&TypeRefDef> for TypeDesc {
    type Error = Error;

    fn try_from(value: &TypeRefDef) -> Result<Self, Error> {
        Ok(match value {
            TypeRefDef::Name(expr) => parse_type(expr)?,
            TypeRefDef::Struct(def) => TypeDesc::Struct(Arc::<StructType>::try_from(def)?),
            TypeRefDef::SliceOf { slice } => {
                TypeDesc::Slice(Box::new(TypeDesc::try_from(slice.as_ref())?))
            }
            TypeRefDef::ArrayOf { array, len } => TypeDesc::Array {
                len: *len,
                elem: Box::new(TypeDesc::try_from(array.as_ref())?),
            },
        })
    }
}

impl TryFrom<&StructTypeDef> for Arc<StructType> {
    type Error = Error;

    fn try_from(def: &StructTypeDef) -> Result<Self, Error> {
        let mut fields = Vec::with_capacity(def.fields.len());
        for fd in &def.fields {
            let ty = TypeDesc::try_from(&fd.ty)?;
            let mut out = FieldDef::new(fd.name.clone(), ty).with_tag(fd.tag.clone());
            out.if_expr = fd.if_expr.clone();
            out.size_expr = fd.size_expr.clone();
            out.bits_expr = fd.bits_expr.clone();
            out.in_expr = fd.in_expr.clone();
            out.out_expr = fd.out_expr.clone();
            fields.push(out);
        }
        Ok(StructType::new(def.name.clone(), fields))
    }
}
