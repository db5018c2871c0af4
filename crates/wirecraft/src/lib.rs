//! # wirecraft
//!
//! Declarative packing and unpacking of structured records to and from raw
//! binary, with bit-level layout control.
//!
//! A record type declares its fields once; per-field annotations describe
//! the wire layout: integer/float/complex/boolean/string/array/slice and
//! nested record types, bit-subfields that need not align to byte
//! boundaries, per-field endianness overrides, length fields that drive
//! other fields' sizes, custom codecs, and embedded expressions for sizes,
//! widths, and conditional presence.
//!
//! ## Example
//!
//! ```
//! use wirecraft::{pack, unpack, ByteOrder, FieldDef, StructType, TypeDesc, Value};
//!
//! let message = StructType::new(
//!     "Message",
//!     vec![
//!         FieldDef::new("Length", TypeDesc::U32).with_tag("sizeof=Body"),
//!         FieldDef::new("Body", TypeDesc::Str),
//!     ],
//! );
//!
//! let mut value = Value::Struct(message.record().unwrap());
//! if let Value::Struct(rec) = &mut value {
//!     rec.set("Body", "hi").unwrap();
//! }
//!
//! let bytes = pack(ByteOrder::Big, &mut value).unwrap();
//! assert_eq!(bytes, [0, 0, 0, 2, b'h', b'i']);
//!
//! let mut decoded = Value::Struct(message.record().unwrap());
//! unpack(&bytes, ByteOrder::Big, &mut decoded).unwrap();
//! assert_eq!(decoded, value);
//! ```

pub mod bits;
mod decoder;
mod encoder;
pub mod errors;
mod field;
pub mod hooks;
mod resolver;
pub mod schema;
pub mod tag;
pub mod typestr;
pub mod value;

#[cfg(feature = "serde")]
pub mod serde;

pub use bits::ByteOrder;
pub use errors::{Error, Result};
pub use hooks::CustomCodec;
pub use schema::{FieldDef, StructType, TypeDesc};
pub use value::{Complex32, Complex64, StructValue, Value};

use decoder::Decoder;
use encoder::Encoder;
use field::Field;

/// Encodes `v` into a freshly allocated buffer.
///
/// Packing runs in two passes: an exact size pass, then a write pass into a
/// buffer of that size. Size drivers (`sizeof`/`sizefrom`) are overwritten
/// in `v` with their target's element count before they are emitted, which
/// is why the value is taken mutably.
pub fn pack(order: ByteOrder, v: &mut Value) -> Result<Vec<u8>> {
    let f = Field::from_type(v.type_desc()?)?;
    let bits = f.size_of_bits(v, None)?;
    let mut enc = Encoder::new((bits + 7) / 8, order);
    enc.write_value(&f, v, None)?;
    Ok(enc.w.into_vec())
}

/// Decodes `data` into `v`, which supplies the target shape.
///
/// Fields are read sequentially in declaration order. Variable-length fields
/// are allocated from their size driver as it is decoded. On error the
/// target value is indeterminate: fields decoded before the failure keep
/// their new contents.
pub fn unpack(data: &[u8], order: ByteOrder, v: &mut Value) -> Result<()> {
    let f = Field::from_type(v.type_desc()?)?;
    let mut dec = Decoder::new(data, order);
    dec.read_value(&f, v, None, None)
}

/// Exact encoded size of `v` in bits.
pub fn bit_size(v: &Value) -> Result<usize> {
    let f = Field::from_type(v.type_desc()?)?;
    f.size_of_bits(v, None)
}

/// Exact encoded size of `v` in bytes.
pub fn size_of(v: &Value) -> Result<usize> {
    Ok((bit_size(v)? + 7) / 8)
}
