//! Decoder: walks a descriptor tree and populates a native value from the
//! bit reader.
//!
//! Fields decode in declaration order, so a size driver is always committed
//! before its target allocates. Endianness overrides scope over the subtree
//! they annotate.

use std::sync::Arc;

use crate::bits::{BitReader, ByteOrder};
use crate::errors::{Error, Result};
use crate::field::{cached_fields, Field};
use crate::resolver::{eval_program, store_expr_value, to_expr_value, Scope};
use crate::schema::{StructType, TypeDesc};
use crate::value::{Complex32, Complex64, Value};

pub(crate) struct Decoder<'d> {
    pub r: BitReader<'d>,
    pub order: ByteOrder,
}

impl<'d> Decoder<'d> {
    pub fn new(data: &'d [u8], order: ByteOrder) -> Self {
        Self {
            r: BitReader::new(data),
            order,
        }
    }

    /// Reads one wire integer of `width` bytes, honoring a bit-subfield
    /// width and the current byte order.
    fn read_uint(&mut self, width: usize, bits: usize) -> Result<u64> {
        let mut buf = [0u8; 8];
        let buf = &mut buf[..width];
        let eff = if bits == 0 { width * 8 } else { bits };
        self.r.read_bits(eff, buf)?;
        Ok(self.order.uint(buf))
    }

    /// Decodes all fields of a record in declaration order.
    pub fn read_struct(
        &mut self,
        st: &Arc<StructType>,
        fields: &mut [Value],
        parent: Option<&Scope<'_>>,
    ) -> Result<()> {
        let fds = cached_fields(st)?;
        for fd in fds.iter() {
            let idx = fd.index as usize;
            if idx >= fields.len() {
                return Err(Error::Type(format!(
                    "record value too short for type {}",
                    st.name
                )));
            }

            // Commit the driver's length before stepping into the target.
            let len_hint = if fd.s_index >= 0 {
                let driver = fds
                    .iter()
                    .find(|f| f.index == fd.s_index)
                    .ok_or_else(|| {
                        Error::Resolution(format!("missing size driver for {}", fd.name))
                    })?;
                if !driver.wire_type.is_integer() {
                    return Err(Error::Type(format!(
                        "unsupported size type {:?}: {}",
                        driver.wire_type, driver.name
                    )));
                }
                let n = fields[fd.s_index as usize].as_length().ok_or_else(|| {
                    Error::Type(format!(
                        "unsupported size type {:?}: {}",
                        driver.wire_type, driver.name
                    ))
                })?;
                if n < 0 {
                    return Err(Error::Type(format!(
                        "negative element count {} for {}",
                        n, fd.name
                    )));
                }
                Some(n as usize)
            } else {
                None
            };

            let (before, rest) = fields.split_at_mut(idx);
            let slot = match rest.first_mut() {
                Some(slot) => slot,
                None => unreachable!(),
            };
            let scope = Scope {
                ty: st,
                before,
                after: &[],
                parent,
            };
            self.read_value(fd, slot, Some(&scope), len_hint)?;
        }
        Ok(())
    }

    /// Decodes one field into `v`.
    pub fn read_value(
        &mut self,
        f: &Field,
        v: &mut Value,
        scope: Option<&Scope<'_>>,
        len_hint: Option<usize>,
    ) -> Result<()> {
        if f.name != "_" {
            if let Value::Custom(codec) = v {
                let rest = self.r.remaining_bytes();
                let consumed = codec.unpack(rest, self.order)?;
                return self.r.skip_bits(consumed * 8);
            }
        } else {
            let bits = f.size_of_bits(v, scope)?;
            return self.r.skip_bits(bits);
        }

        let saved_order = self.order;
        if let Some(order) = f.order {
            self.order = order;
        }
        let result = self.read_value_inner(f, v, scope, len_hint);
        self.order = saved_order;
        result
    }

    fn read_value_inner(
        &mut self,
        f: &Field,
        v: &mut Value,
        scope: Option<&Scope<'_>>,
        len_hint: Option<usize>,
    ) -> Result<()> {
        if !f.eval_if(scope)? {
            return Ok(());
        }

        if f.skip != 0 {
            self.r.skip_bits(f.skip * 8)?;
        }

        // Resolve the element count for variable-length fields, from the
        // driver sibling or the size expression, and reshape the slot.
        let declared_len = match len_hint {
            Some(n) => Some(n),
            None => f.eval_size(scope)?,
        };
        if let Some(n) = declared_len {
            match (&f.native_type, &mut *v) {
                (TypeDesc::Slice(_), Value::Bytes(b)) => {
                    *b = vec![0u8; n];
                }
                (TypeDesc::Slice(elem), Value::Slice(items)) => {
                    items.clear();
                    for _ in 0..n {
                        items.push(Value::zero(elem)?);
                    }
                }
                (TypeDesc::Str, Value::Str(s)) => {
                    // Blank backing of the right byte length; filled below.
                    *s = "\0".repeat(n);
                }
                _ => {
                    return Err(Error::Type(format!(
                        "unsupported size target {:?}",
                        f.native_type
                    )))
                }
            }
        }

        let bits = f.eval_bits(scope)?;
        self.dispatch(f, v, scope, bits)?;

        if let Some(program) = &f.in_expr {
            let raw = to_expr_value(v);
            let ev = eval_program(program, scope, Some(&raw))?;
            store_expr_value(v, ev)?;
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        f: &Field,
        v: &mut Value,
        scope: Option<&Scope<'_>>,
        bits: usize,
    ) -> Result<()> {
        match &f.wire_type {
            TypeDesc::Array { len, elem } => self.read_array(f, v, *len, elem),
            TypeDesc::Struct(st) => match v {
                Value::Struct(sv) => {
                    if !Arc::ptr_eq(st, sv.ty()) {
                        return Err(Error::Type(format!(
                            "record value of type {} where {} is declared",
                            sv.ty().name,
                            st.name
                        )));
                    }
                    let ty = sv.ty().clone();
                    self.read_struct(&ty, &mut sv.fields, scope)
                }
                other => Err(Error::Type(format!(
                    "expected a record value, got {:?}",
                    other.type_desc()
                ))),
            },
            TypeDesc::Slice(_) | TypeDesc::Str => self.read_slice(f, v),
            TypeDesc::Bool | TypeDesc::U8 => self.read_int(f, v, 1, bits, false),
            TypeDesc::U16 => self.read_int(f, v, 2, bits, false),
            TypeDesc::U32 => self.read_int(f, v, 4, bits, false),
            TypeDesc::U64 => self.read_int(f, v, 8, bits, false),
            TypeDesc::I8 => self.read_int(f, v, 1, bits, true),
            TypeDesc::I16 => self.read_int(f, v, 2, bits, true),
            TypeDesc::I32 => self.read_int(f, v, 4, bits, true),
            TypeDesc::I64 => self.read_int(f, v, 8, bits, true),
            TypeDesc::F32 => {
                let x = self.read_uint(4, bits)?;
                self.store_float(v, f32::from_bits(x as u32) as f64)
            }
            TypeDesc::F64 => {
                let x = self.read_uint(8, bits)?;
                self.store_float(v, f64::from_bits(x))
            }
            TypeDesc::C64 => {
                let re = f32::from_bits(self.read_uint(4, bits)? as u32);
                let im = f32::from_bits(self.read_uint(4, bits)? as u32);
                self.store_complex(v, re as f64, im as f64)
            }
            TypeDesc::C128 => {
                let re = f64::from_bits(self.read_uint(8, bits)?);
                let im = f64::from_bits(self.read_uint(8, bits)?);
                self.store_complex(v, re, im)
            }
            TypeDesc::Custom(name) => Err(Error::Type(format!(
                "custom type {} requires a codec value",
                name
            ))),
        }
    }

    fn read_array(&mut self, f: &Field, v: &mut Value, len: usize, elem: &TypeDesc) -> Result<()> {
        match (&f.native_type, &mut *v) {
            // C-string semantics: bytes to the array length, cut at NUL.
            (TypeDesc::Str, Value::Str(s)) => {
                if *elem != TypeDesc::U8 {
                    return Err(Error::Type(format!(
                        "invalid array cast type: {:?}",
                        f.native_type
                    )));
                }
                let raw = self.r.read_bytes(len)?;
                let cut = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
                *s = std::str::from_utf8(&raw[..cut])
                    .map_err(|_| {
                        Error::Type(format!("field {} is not valid UTF-8", f.name))
                    })?
                    .to_string();
                Ok(())
            }
            (_, Value::Bytes(bytes)) => {
                bytes.resize(len, 0);
                for slot in bytes.iter_mut() {
                    let mut one = [0u8; 1];
                    self.r.read_bits(8, &mut one)?;
                    *slot = one[0];
                }
                Ok(())
            }
            (TypeDesc::Array { .. }, Value::Array(items)) => {
                if items.len() < len {
                    return Err(Error::Type(format!(
                        "array value too short for field {}",
                        f.name
                    )));
                }
                let ef = f.elem()?;
                for item in items.iter_mut().take(len) {
                    self.read_value(&ef, item, None, None)?;
                }
                Ok(())
            }
            (TypeDesc::Slice(native_elem), slot) => {
                // A fixed wire array decoded into a slice allocates the
                // array's length.
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(Value::zero(native_elem)?);
                }
                let ef = f.elem()?;
                for item in items.iter_mut() {
                    self.read_value(&ef, item, None, None)?;
                }
                *slot = Value::Slice(items);
                Ok(())
            }
            (native, _) => Err(Error::Type(format!(
                "invalid array cast type: {:?}",
                native
            ))),
        }
    }

    fn read_slice(&mut self, f: &Field, v: &mut Value) -> Result<()> {
        match v {
            Value::Str(s) => {
                let n = s.len();
                let raw = self.r.read_bytes(n)?;
                *s = std::str::from_utf8(raw)
                    .map_err(|_| Error::Type(format!("field {} is not valid UTF-8", f.name)))?
                    .to_string();
                Ok(())
            }
            Value::Bytes(bytes) => {
                let n = bytes.len();
                let raw = self.r.read_bytes(n)?;
                bytes.copy_from_slice(raw);
                Ok(())
            }
            Value::Slice(items) | Value::Array(items) => {
                let ef = f.elem()?;
                for item in items.iter_mut() {
                    self.read_value(&ef, item, None, None)?;
                }
                Ok(())
            }
            other => Err(Error::Type(format!(
                "invalid array cast type: {:?}",
                other.type_desc()
            ))),
        }
    }

    fn read_int(
        &mut self,
        f: &Field,
        v: &mut Value,
        width: usize,
        bits: usize,
        signed: bool,
    ) -> Result<()> {
        let raw = self.read_uint(width, bits)?;
        // Sign conversion happens at the wire width.
        let wide: i64 = if signed {
            match width {
                1 => raw as u8 as i8 as i64,
                2 => raw as u16 as i16 as i64,
                4 => raw as u32 as i32 as i64,
                _ => raw as i64,
            }
        } else {
            raw as i64
        };
        match v {
            Value::Bool(b) => {
                let mut x = wide != 0;
                if f.flags.inverted_bool {
                    x = !x;
                }
                *b = x;
                Ok(())
            }
            other => other.store_int(wide),
        }
    }

    fn store_float(&mut self, v: &mut Value, x: f64) -> Result<()> {
        match v {
            Value::F32(slot) => {
                *slot = x as f32;
                Ok(())
            }
            Value::F64(slot) => {
                *slot = x;
                Ok(())
            }
            other => Err(Error::Type(format!(
                "cannot store a float into {:?}",
                other.type_desc()
            ))),
        }
    }

    fn store_complex(&mut self, v: &mut Value, re: f64, im: f64) -> Result<()> {
        match v {
            Value::C64(slot) => {
                *slot = Complex32::new(re as f32, im as f32);
                Ok(())
            }
            Value::C128(slot) => {
                *slot = Complex64::new(re, im);
                Ok(())
            }
            other => Err(Error::Type(format!(
                "cannot store a complex into {:?}",
                other.type_desc()
            ))),
        }
    }
}
