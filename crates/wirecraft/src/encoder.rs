//! Encoder: walks a descriptor tree and emits a value into the bit writer.
//!
//! Before a size driver is emitted, its in-memory value is overwritten with
//! the target's current element count, so the on-wire length is always
//! consistent with the data that follows. Fixed wire arrays longer than the
//! native value pad with zero elements.

use std::sync::Arc;

use crate::bits::{BitWriter, ByteOrder};
use crate::errors::{Error, Result};
use crate::field::{cached_fields, Field};
use crate::resolver::{eval_program, store_expr_value, to_expr_value, Scope};
use crate::schema::{StructType, TypeDesc};
use crate::value::Value;

pub(crate) struct Encoder {
    pub w: BitWriter,
    pub order: ByteOrder,
}

impl Encoder {
    pub fn new(size_bytes: usize, order: ByteOrder) -> Self {
        Self {
            w: BitWriter::new(size_bytes),
            order,
        }
    }

    fn write_uint(&mut self, width: usize, bits: usize, x: u64) -> Result<()> {
        let mut buf = [0u8; 8];
        let buf = &mut buf[..width];
        self.order.put_uint(buf, x);
        let eff = if bits == 0 { width * 8 } else { bits };
        self.w.write_bits(eff, buf)
    }

    /// Encodes all fields of a record in declaration order.
    pub fn write_struct(
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

            // A size driver mirrors its target's current element count,
            // regardless of the caller's prior value.
            if fd.t_index >= 0 {
                if !fd.wire_type.is_integer() {
                    return Err(Error::Type(format!(
                        "unsupported size type {:?}: {}",
                        fd.wire_type, fd.name
                    )));
                }
                let target = fields.get(fd.t_index as usize).ok_or_else(|| {
                    Error::Resolution(format!("missing size target for {}", fd.name))
                })?;
                let n = target.len().ok_or_else(|| {
                    Error::Type(format!(
                        "unsupported size target {:?}",
                        target.type_desc()
                    ))
                })?;
                fields[idx].store_int(n as i64)?;
            }

            let (before, rest) = fields.split_at_mut(idx);
            let (slot, after) = match rest.split_first_mut() {
                Some(pair) => pair,
                None => unreachable!(),
            };
            let scope = Scope {
                ty: st,
                before,
                after,
                parent,
            };
            self.write_value(fd, slot, Some(&scope))?;
        }
        Ok(())
    }

    /// Encodes one field from `v`.
    pub fn write_value(
        &mut self,
        f: &Field,
        v: &mut Value,
        scope: Option<&Scope<'_>>,
    ) -> Result<()> {
        if f.name != "_" {
            if let Value::Custom(codec) = v {
                let buf = self.w.remaining_bytes_mut();
                let written = codec.pack(buf, self.order)?;
                return self.w.advance_bytes(written);
            }
        } else {
            let bits = f.size_of_bits(v, scope)?;
            return self.w.skip_bits(bits);
        }

        let saved_order = self.order;
        if let Some(order) = f.order {
            self.order = order;
        }
        let result = self.write_value_inner(f, v, scope);
        self.order = saved_order;
        result
    }

    fn write_value_inner(
        &mut self,
        f: &Field,
        v: &mut Value,
        scope: Option<&Scope<'_>>,
    ) -> Result<()> {
        if !f.eval_if(scope)? {
            return Ok(());
        }

        if f.skip != 0 {
            self.w.skip_bits(f.skip * 8)?;
        }

        let bits = f.eval_bits(scope)?;

        if let Some(program) = &f.out_expr {
            let raw = to_expr_value(v);
            let ev = eval_program(program, scope, Some(&raw))?;
            let mut adjusted = v.clone();
            store_expr_value(&mut adjusted, ev)?;
            return self.dispatch(f, &mut adjusted, scope, bits);
        }

        self.dispatch(f, v, scope, bits)
    }

    fn dispatch(
        &mut self,
        f: &Field,
        v: &mut Value,
        scope: Option<&Scope<'_>>,
        bits: usize,
    ) -> Result<()> {
        match &f.wire_type {
            TypeDesc::Array { len, .. } => self.write_container(f, v, Some(*len)),
            TypeDesc::Slice(_) | TypeDesc::Str => self.write_container(f, v, None),
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
                    self.write_struct(&ty, &mut sv.fields, scope)
                }
                other => Err(Error::Type(format!(
                    "expected a record value, got {:?}",
                    other.type_desc()
                ))),
            },
            TypeDesc::Bool | TypeDesc::U8 => self.write_int(f, v, 1, bits),
            TypeDesc::U16 => self.write_int(f, v, 2, bits),
            TypeDesc::U32 => self.write_int(f, v, 4, bits),
            TypeDesc::U64 => self.write_int(f, v, 8, bits),
            TypeDesc::I8 => self.write_int(f, v, 1, bits),
            TypeDesc::I16 => self.write_int(f, v, 2, bits),
            TypeDesc::I32 => self.write_int(f, v, 4, bits),
            TypeDesc::I64 => self.write_int(f, v, 8, bits),
            TypeDesc::F32 => {
                let x = self.float_from(v)? as f32;
                self.write_uint(4, bits, x.to_bits() as u64)
            }
            TypeDesc::F64 => {
                let x = self.float_from(v)?;
                self.write_uint(8, bits, x.to_bits())
            }
            TypeDesc::C64 => {
                let (re, im) = self.complex_from(v)?;
                self.write_uint(4, bits, (re as f32).to_bits() as u64)?;
                self.write_uint(4, bits, (im as f32).to_bits() as u64)
            }
            TypeDesc::C128 => {
                let (re, im) = self.complex_from(v)?;
                self.write_uint(8, bits, re.to_bits())?;
                self.write_uint(8, bits, im.to_bits())
            }
            TypeDesc::Custom(name) => Err(Error::Type(format!(
                "custom type {} requires a codec value",
                name
            ))),
        }
    }

    /// Writes a container's elements; `cap` pads fixed wire arrays with zero
    /// elements past the native length.
    fn write_container(&mut self, f: &Field, v: &mut Value, cap: Option<usize>) -> Result<()> {
        match v {
            Value::Str(s) => {
                let bytes = s.as_bytes();
                match cap {
                    // Fixed array: bytes then zero padding, bit-exact.
                    Some(cap) => {
                        for b in bytes.iter().take(cap) {
                            self.w.write_bits(8, &[*b])?;
                        }
                        for _ in bytes.len()..cap {
                            self.w.write_bits(8, &[0])?;
                        }
                        Ok(())
                    }
                    None => self.w.write_bytes(bytes),
                }
            }
            Value::Bytes(bytes) => match cap {
                Some(cap) => {
                    for b in bytes.iter().take(cap) {
                        self.w.write_bits(8, &[*b])?;
                    }
                    for _ in bytes.len()..cap {
                        self.w.write_bits(8, &[0])?;
                    }
                    Ok(())
                }
                None => self.w.write_bytes(bytes),
            },
            Value::Array(items) | Value::Slice(items) => {
                let ef = f.elem()?;
                let count = match cap {
                    Some(cap) => cap.min(items.len()),
                    None => items.len(),
                };
                for item in items.iter_mut().take(count) {
                    self.write_value(&ef, item, None)?;
                }
                if let Some(cap) = cap {
                    // Zero-valued elements fill the remainder of the array.
                    for _ in items.len()..cap {
                        let mut zero = Value::zero(&ef.wire_type)?;
                        self.write_value(&ef, &mut zero, None)?;
                    }
                }
                Ok(())
            }
            other => Err(Error::Type(format!(
                "invalid array cast type: {:?}",
                other.type_desc()
            ))),
        }
    }

    fn write_int(&mut self, f: &Field, v: &mut Value, width: usize, bits: usize) -> Result<()> {
        let x: u64 = match &*v {
            Value::Bool(b) => {
                let mut x = *b;
                if f.flags.inverted_bool {
                    x = !x;
                }
                if x {
                    if f.flags.variant_bool {
                        !0u64
                    } else {
                        1
                    }
                } else {
                    0
                }
            }
            other => other.as_length().ok_or_else(|| {
                Error::Type(format!(
                    "cannot encode {:?} as an integer for field {}",
                    other.type_desc(),
                    f.name
                ))
            })? as u64,
        };
        self.write_uint(width, bits, x)
    }

    fn float_from(&self, v: &Value) -> Result<f64> {
        match v {
            Value::F32(x) => Ok(*x as f64),
            Value::F64(x) => Ok(*x),
            other => Err(Error::Type(format!(
                "cannot encode {:?} as a float",
                other.type_desc()
            ))),
        }
    }

    fn complex_from(&self, v: &Value) -> Result<(f64, f64)> {
        match v {
            Value::C64(c) => Ok((c.re as f64, c.im as f64)),
            Value::C128(c) => Ok((c.re, c.im)),
            other => Err(Error::Type(format!(
                "cannot encode {:?} as a complex",
                other.type_desc()
            ))),
        }
    }
}
