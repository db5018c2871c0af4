//! Compiled field descriptors.
//!
//! A record type compiles once into a flat list of [`Field`]s, cached
//! process-wide by the record's identity. Descriptors are frozen after
//! construction; the decoder and encoder only read them.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock, RwLock};

use wirecraft_expr::Program;

use crate::bits::ByteOrder;
use crate::errors::{Error, Result};
use crate::resolver::{eval_program, Scope};
use crate::schema::{StructType, TypeDesc};
use crate::tag::parse_tag;
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FieldFlags {
    /// True encodes as all-ones of the wire width instead of 1.
    pub variant_bool: bool,
    /// True and false are flipped on the wire.
    pub inverted_bool: bool,
}

/// Compiled form of one annotated field.
#[derive(Debug, Clone)]
pub(crate) struct Field {
    pub name: String,
    /// Declaration index in the enclosing record; -1 for synthetic element
    /// descriptors.
    pub index: i32,
    pub wire_type: TypeDesc,
    pub native_type: TypeDesc,
    pub order: Option<ByteOrder>,
    /// Declaration index of the sibling holding this field's element count.
    pub s_index: i32,
    /// Declaration index of the sibling this field is the count of.
    pub t_index: i32,
    pub skip: usize,
    pub trivial: bool,
    pub bit_size: u8,
    pub flags: FieldFlags,
    pub if_expr: Option<Program>,
    pub size_expr: Option<Program>,
    pub bits_expr: Option<Program>,
    pub in_expr: Option<Program>,
    pub out_expr: Option<Program>,
}

impl Field {
    /// A transient descriptor for a bare type, used at the top level.
    pub fn from_type(ty: TypeDesc) -> Result<Field> {
        let trivial = is_type_trivial(&ty)?;
        Ok(Field {
            name: String::new(),
            index: -1,
            wire_type: ty.clone(),
            native_type: ty,
            order: None,
            s_index: -1,
            t_index: -1,
            skip: 0,
            trivial,
            bit_size: 0,
            flags: FieldFlags::default(),
            if_expr: None,
            size_expr: None,
            bits_expr: None,
            in_expr: None,
            out_expr: None,
        })
    }

    /// The synthetic descriptor for one element of this container field.
    pub fn elem(&self) -> Result<Field> {
        let wire = self.wire_type.elem().ok_or_else(|| {
            Error::Type(format!("{:?} has no element type", self.wire_type))
        })?;
        let native = self.native_type.elem().ok_or_else(|| {
            Error::Type(format!("{:?} has no element type", self.native_type))
        })?;
        Ok(Field {
            name: format!("*{}", self.name),
            index: -1,
            wire_type: wire,
            native_type: native,
            order: self.order,
            s_index: -1,
            t_index: -1,
            skip: 0,
            trivial: self.trivial,
            bit_size: 0,
            flags: FieldFlags::default(),
            if_expr: None,
            size_expr: None,
            bits_expr: None,
            in_expr: None,
            out_expr: None,
        })
    }

    pub fn eval_if(&self, scope: Option<&Scope<'_>>) -> Result<bool> {
        let Some(program) = &self.if_expr else {
            return Ok(true);
        };
        let v = eval_program(program, scope, None)?;
        v.as_bool()
            .ok_or_else(|| Error::Type("if expression must produce a boolean".to_string()))
    }

    /// Effective bit width: the `bits` expression wins over the static
    /// annotation; 0 means the full wire width.
    pub fn eval_bits(&self, scope: Option<&Scope<'_>>) -> Result<usize> {
        let Some(program) = &self.bits_expr else {
            return Ok(self.bit_size as usize);
        };
        let v = eval_program(program, scope, None)?;
        let bits = v
            .as_int()
            .ok_or_else(|| Error::Type("bits expression must produce an integer".to_string()))?;
        let width = self.wire_type.bit_width().unwrap_or(0);
        if bits < 1 || bits as usize > width {
            return Err(Error::Type(format!(
                "bits expression produced {} for a {}-bit wire type",
                bits, width
            )));
        }
        Ok(bits as usize)
    }

    /// Element count from the `size` expression, if present.
    pub fn eval_size(&self, scope: Option<&Scope<'_>>) -> Result<Option<usize>> {
        let Some(program) = &self.size_expr else {
            return Ok(None);
        };
        let v = eval_program(program, scope, None)?;
        let n = v
            .as_int()
            .ok_or_else(|| Error::Type("size expression must produce an integer".to_string()))?;
        if n < 0 {
            return Err(Error::Type(format!(
                "size expression produced a negative count {}",
                n
            )));
        }
        Ok(Some(n as usize))
    }

    /// Exact encoded size of this field in bits, including its skip prefix.
    pub fn size_of_bits(&self, v: &Value, scope: Option<&Scope<'_>>) -> Result<usize> {
        let skip_bits = self.skip * 8;

        if self.name != "_" {
            if let Value::Custom(codec) = v {
                return Ok(codec.bit_size());
            }
        } else if !is_type_trivial(&self.native_type)? {
            // Padding with non-trivial content is unreachable; only the skip
            // prefix occupies the wire.
            return Ok(skip_bits);
        }

        if !self.eval_if(scope)? {
            return Ok(0);
        }

        let bits = self.eval_bits(scope)?;
        if bits != 0 {
            return Ok(bits + skip_bits);
        }

        match &self.wire_type {
            TypeDesc::Bool
            | TypeDesc::I8
            | TypeDesc::I16
            | TypeDesc::I32
            | TypeDesc::I64
            | TypeDesc::U8
            | TypeDesc::U16
            | TypeDesc::U32
            | TypeDesc::U64
            | TypeDesc::F32
            | TypeDesc::F64
            | TypeDesc::C64
            | TypeDesc::C128 => {
                let width = self.wire_type.bit_width().unwrap_or(0);
                Ok(width + skip_bits)
            }
            TypeDesc::Array { len, .. } => self.container_bits(*len, v, skip_bits),
            TypeDesc::Slice(_) | TypeDesc::Str => {
                let len = v.len().ok_or_else(|| {
                    Error::Type(format!(
                        "value {:?} is not a container for field {}",
                        v.type_desc(),
                        self.name
                    ))
                })?;
                self.container_bits(len, v, skip_bits)
            }
            TypeDesc::Struct(st) => {
                let Value::Struct(sv) = v else {
                    return Err(Error::Type(format!(
                        "expected a record value for field {}",
                        self.name
                    )));
                };
                let fds = cached_fields(st)?;
                let child = Scope::full(st, &sv.fields, scope);
                let mut size = skip_bits;
                for fd in fds.iter() {
                    let slot = sv.fields.get(fd.index as usize).ok_or_else(|| {
                        Error::Type(format!("record value too short for type {}", st.name))
                    })?;
                    size += fd.size_of_bits(slot, Some(&child))?;
                }
                Ok(size)
            }
            TypeDesc::Custom(name) => Err(Error::Type(format!(
                "custom type {} requires a codec value",
                name
            ))),
        }
    }

    fn container_bits(&self, len: usize, v: &Value, skip_bits: usize) -> Result<usize> {
        let mut size = skip_bits;
        if len == 0 {
            return Ok(size);
        }
        let ef = self.elem()?;
        if self.trivial {
            // Constant-size elements: cost one, multiply.
            let zero = Value::zero(&ef.wire_type)?;
            size += ef.size_of_bits(&zero, None)? * len;
            return Ok(size);
        }
        match v {
            Value::Array(items) | Value::Slice(items) => {
                for item in items.iter().take(len) {
                    size += ef.size_of_bits(item, None)?;
                }
                // Fixed arrays longer than the value pad with zero elements.
                if items.len() < len {
                    let zero = Value::zero(&ef.wire_type)?;
                    let pad = ef.size_of_bits(&zero, None)?;
                    size += pad * (len - items.len());
                }
                Ok(size)
            }
            Value::Bytes(_) | Value::Str(_) => Ok(size + 8 * len),
            other => Err(Error::Type(format!(
                "value {:?} is not a container for field {}",
                other.type_desc(),
                self.name
            ))),
        }
    }

    pub fn size_of_bytes(&self, v: &Value, scope: Option<&Scope<'_>>) -> Result<usize> {
        Ok((self.size_of_bits(v, scope)? + 7) / 8)
    }
}

/// Whether a type's serialized size is constant and data-independent.
pub(crate) fn is_type_trivial(ty: &TypeDesc) -> Result<bool> {
    Ok(match ty {
        TypeDesc::Bool
        | TypeDesc::I8
        | TypeDesc::I16
        | TypeDesc::I32
        | TypeDesc::I64
        | TypeDesc::U8
        | TypeDesc::U16
        | TypeDesc::U32
        | TypeDesc::U64
        | TypeDesc::F32
        | TypeDesc::F64
        | TypeDesc::C64
        | TypeDesc::C128 => true,
        TypeDesc::Array { elem, .. } => is_type_trivial(elem)?,
        TypeDesc::Struct(st) => {
            let fds = cached_fields(st)?;
            fds.iter().all(|f| f.trivial)
        }
        TypeDesc::Slice(_) | TypeDesc::Str | TypeDesc::Custom(_) => false,
    })
}

fn compile_slot(slot: &Option<String>) -> Result<Option<Program>> {
    match slot {
        Some(src) => Ok(Some(Program::compile(src)?)),
        None => Ok(None),
    }
}

/// Compiles the declared fields of a record type, resolving size-driver
/// links and expression slots.
fn fields_from_struct(st: &Arc<StructType>) -> Result<Vec<Field>> {
    let mut result: Vec<Field> = Vec::with_capacity(st.fields.len());
    // Driver fields waiting for their target: name → position in `result`.
    let mut pending_size_of: HashMap<String, usize> = HashMap::new();

    for (i, def) in st.fields.iter().enumerate() {
        let opts = parse_tag(&def.tag)?;
        if opts.ignore {
            continue;
        }

        let wire = opts.ty.clone().unwrap_or_else(|| def.ty.clone());

        let mut s_index = -1;
        if let Some(pos) = pending_size_of.remove(&def.name) {
            if !def.ty.valid_size_type() {
                return Err(Error::Resolution(format!(
                    "sizeof target {} is not a slice or string",
                    def.name
                )));
            }
            if !result[pos].wire_type.is_integer() {
                return Err(Error::Resolution(format!(
                    "sizeof field {} is not an integer",
                    result[pos].name
                )));
            }
            s_index = result[pos].index;
            result[pos].t_index = i as i32;
        } else if let Some(target) = &opts.size_of {
            pending_size_of.insert(target.clone(), result.len());
        }

        if let Some(driver_name) = &opts.size_from {
            if !def.ty.valid_size_type() {
                return Err(Error::Resolution(format!(
                    "sizefrom target {} is not a slice or string",
                    def.name
                )));
            }
            let driver = result
                .iter_mut()
                .find(|f| &f.name == driver_name)
                .ok_or_else(|| {
                    Error::Resolution(format!("couldn't find sizefrom field {}", driver_name))
                })?;
            if !driver.wire_type.is_integer() {
                return Err(Error::Resolution(format!(
                    "sizefrom field {} is not an integer",
                    driver_name
                )));
            }
            s_index = driver.index;
            driver.t_index = i as i32;
        }

        if def.size_expr.is_some() && !def.ty.valid_size_type() {
            return Err(Error::Resolution(format!(
                "size expression on fixed-size field {}",
                def.name
            )));
        }
        if def.bits_expr.is_some() && !wire.valid_bit_type() {
            return Err(Error::Annotation(format!(
                "bits expression on non-bitwise field {}",
                def.name
            )));
        }

        let trivial = is_type_trivial(&wire)?;

        result.push(Field {
            name: def.name.clone(),
            index: i as i32,
            wire_type: wire,
            native_type: def.ty.clone(),
            order: opts.order,
            s_index,
            t_index: -1,
            skip: opts.skip,
            trivial,
            bit_size: opts.bit_size,
            flags: FieldFlags {
                variant_bool: opts.variant_bool,
                inverted_bool: opts.inverted_bool,
            },
            if_expr: compile_slot(&def.if_expr)?,
            size_expr: compile_slot(&def.size_expr)?,
            bits_expr: compile_slot(&def.bits_expr)?,
            in_expr: compile_slot(&def.in_expr)?,
            out_expr: compile_slot(&def.out_expr)?,
        });
    }

    if let Some(name) = pending_size_of.into_keys().next() {
        return Err(Error::Resolution(format!(
            "couldn't find sizeof field {}",
            name
        )));
    }

    Ok(result)
}

/// Cache key: record identity is the `Arc` allocation. Holding the `Arc`
/// keeps the address stable for the life of the cache.
struct TypeKey(Arc<StructType>);

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

type FieldCache = RwLock<HashMap<TypeKey, Arc<Vec<Field>>>>;

static FIELD_CACHE: OnceLock<FieldCache> = OnceLock::new();

/// Compiled descriptors for a record type, memoized process-wide. Lookups
/// take a shared read; first-time compilation takes the exclusive write.
pub(crate) fn cached_fields(st: &Arc<StructType>) -> Result<Arc<Vec<Field>>> {
    let cache = FIELD_CACHE.get_or_init(|| RwLock::new(HashMap::new()));

    let key = TypeKey(st.clone());
    {
        let read = cache.read().unwrap_or_else(|e| e.into_inner());
        if let Some(fields) = read.get(&key) {
            return Ok(fields.clone());
        }
    }

    let fields = Arc::new(fields_from_struct(st)?);
    let mut write = cache.write().unwrap_or_else(|e| e.into_inner());
    Ok(write.entry(key).or_insert(fields).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDef;

    fn fds(ty: &Arc<StructType>) -> Arc<Vec<Field>> {
        cached_fields(ty).unwrap()
    }

    #[test]
    fn sizeof_links_driver_and_target() {
        let ty = StructType::new(
            "Message",
            vec![
                FieldDef::new("Length", TypeDesc::I32).with_tag("sizeof=Packets"),
                FieldDef::new(
                    "Packets",
                    TypeDesc::Slice(Box::new(TypeDesc::U32)),
                ),
            ],
        );
        let fields = fds(&ty);
        assert_eq!(fields[0].t_index, 1);
        assert_eq!(fields[0].s_index, -1);
        assert_eq!(fields[1].s_index, 0);
        assert_eq!(fields[1].t_index, -1);
    }

    #[test]
    fn sizefrom_scans_earlier_fields() {
        let ty = StructType::new(
            "Message",
            vec![
                FieldDef::new("Size", TypeDesc::I32),
                FieldDef::new("Array", TypeDesc::Slice(Box::new(TypeDesc::I32)))
                    .with_tag("sizefrom=Size"),
            ],
        );
        let fields = fds(&ty);
        assert_eq!(fields[0].t_index, 1);
        assert_eq!(fields[1].s_index, 0);
    }

    #[test]
    fn unresolved_sizeof_is_an_error() {
        let ty = StructType::new(
            "Broken",
            vec![FieldDef::new("Length", TypeDesc::I32).with_tag("sizeof=Nope")],
        );
        assert!(matches!(
            cached_fields(&ty).unwrap_err(),
            Error::Resolution(_)
        ));
    }

    #[test]
    fn sizeof_on_fixed_size_target_is_an_error() {
        let ty = StructType::new(
            "Broken",
            vec![
                FieldDef::new("Length", TypeDesc::I32).with_tag("sizeof=Array"),
                FieldDef::new(
                    "Array",
                    TypeDesc::Array {
                        len: 2,
                        elem: Box::new(TypeDesc::I16),
                    },
                ),
            ],
        );
        assert!(matches!(
            cached_fields(&ty).unwrap_err(),
            Error::Resolution(_)
        ));
    }

    #[test]
    fn non_integer_driver_is_an_error() {
        let ty = StructType::new(
            "Broken",
            vec![
                FieldDef::new("Length", TypeDesc::Str).with_tag("sizeof=Slice"),
                FieldDef::new("Slice", TypeDesc::Slice(Box::new(TypeDesc::U8))),
            ],
        );
        assert!(matches!(
            cached_fields(&ty).unwrap_err(),
            Error::Resolution(_)
        ));
    }

    #[test]
    fn ignored_fields_are_dropped() {
        let ty = StructType::new(
            "S",
            vec![
                FieldDef::new("Keep", TypeDesc::U8),
                FieldDef::new("Drop", TypeDesc::U8).with_tag("-"),
                FieldDef::new("Tail", TypeDesc::U8),
            ],
        );
        let fields = fds(&ty);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].index, 0);
        assert_eq!(fields[1].index, 2);
    }

    #[test]
    fn trivial_propagates_through_nesting() {
        let inner = StructType::new(
            "Inner",
            vec![
                FieldDef::new("A", TypeDesc::U16),
                FieldDef::new("B", TypeDesc::U16),
            ],
        );
        assert!(is_type_trivial(&TypeDesc::Struct(inner.clone())).unwrap());

        let outer = StructType::new(
            "Outer",
            vec![FieldDef::new(
                "Items",
                TypeDesc::Slice(Box::new(TypeDesc::Struct(inner))),
            )],
        );
        assert!(!is_type_trivial(&TypeDesc::Struct(outer)).unwrap());
    }

    #[test]
    fn fixed_sizes() {
        let ty = StructType::new(
            "Sized",
            vec![
                FieldDef::new("A", TypeDesc::U32),
                FieldDef::new("B", TypeDesc::U8).with_tag("u8:3"),
                FieldDef::new("C", TypeDesc::F64).with_tag("skip=2"),
            ],
        );
        let fields = fds(&ty);
        let rec = ty.record().unwrap();
        assert_eq!(
            fields[0].size_of_bits(rec.get("A").unwrap(), None).unwrap(),
            32
        );
        assert_eq!(
            fields[1].size_of_bits(rec.get("B").unwrap(), None).unwrap(),
            3
        );
        assert_eq!(
            fields[2].size_of_bits(rec.get("C").unwrap(), None).unwrap(),
            80
        );
    }

    #[test]
    fn variable_sizes_track_value_length() {
        let ty = StructType::new(
            "Var",
            vec![FieldDef::new("Data", TypeDesc::Slice(Box::new(TypeDesc::U16)))],
        );
        let fields = fds(&ty);
        let v = Value::Slice(vec![Value::U16(1), Value::U16(2), Value::U16(3)]);
        assert_eq!(fields[0].size_of_bits(&v, None).unwrap(), 48);
        assert_eq!(fields[0].size_of_bytes(&v, None).unwrap(), 6);
    }

    #[test]
    fn wire_override_drives_size() {
        // Native f64 slice carried as a fixed array of f32 on the wire.
        let ty = StructType::new(
            "Var",
            vec![FieldDef::new("Samples", TypeDesc::Slice(Box::new(TypeDesc::F64)))
                .with_tag("[4]f32")],
        );
        let fields = fds(&ty);
        let v = Value::Slice(vec![Value::F64(0.5)]);
        assert_eq!(fields[0].size_of_bits(&v, None).unwrap(), 4 * 32);
    }

    #[test]
    fn if_expression_can_zero_a_field() {
        let ty = StructType::new(
            "Cond",
            vec![
                FieldDef::new("Tag", TypeDesc::U8),
                FieldDef::new("Body", TypeDesc::U32).with_if("Tag == 1"),
            ],
        );
        let fields = fds(&ty);
        let mut rec = ty.record().unwrap();
        rec.set("Tag", 0u8).unwrap();
        let scope_fields = rec.fields.clone();
        let scope = Scope::full(&ty, &scope_fields, None);
        assert_eq!(
            fields[1]
                .size_of_bits(&Value::U32(0), Some(&scope))
                .unwrap(),
            0
        );
        rec.set("Tag", 1u8).unwrap();
        let scope_fields = rec.fields.clone();
        let scope = Scope::full(&ty, &scope_fields, None);
        assert_eq!(
            fields[1]
                .size_of_bits(&Value::U32(0), Some(&scope))
                .unwrap(),
            32
        );
    }
}
