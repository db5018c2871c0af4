//! Custom packer/unpacker hooks.
//!
//! A value carrying a [`CustomCodec`] owns its entire wire representation:
//! the engine hands the codec the remaining buffer and trusts its byte
//! counts. `size_of`/`bit_size` must match exactly what `pack` writes; the
//! encoder sizes its output buffer from them.

use std::any::Any;
use std::fmt;

use crate::bits::ByteOrder;
use crate::errors::Result;

pub trait CustomCodec: fmt::Debug + Send + Sync {
    /// Name linking values to their `TypeDesc::Custom` declaration.
    fn type_name(&self) -> &str;

    /// Encoded size in bytes.
    fn size_of(&self) -> usize;

    /// Encoded size in bits; defaults to whole bytes.
    fn bit_size(&self) -> usize {
        8 * self.size_of()
    }

    /// Writes the value into the front of `buf`; returns bytes written.
    fn pack(&self, buf: &mut [u8], order: ByteOrder) -> Result<usize>;

    /// Reads the value from the front of `buf`; returns bytes consumed.
    fn unpack(&mut self, buf: &[u8], order: ByteOrder) -> Result<usize>;

    fn clone_codec(&self) -> Box<dyn CustomCodec>;

    fn codec_eq(&self, other: &dyn CustomCodec) -> bool;

    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn CustomCodec> {
    fn clone(&self) -> Self {
        self.clone_codec()
    }
}

impl PartialEq for Box<dyn CustomCodec> {
    fn eq(&self, other: &Self) -> bool {
        self.codec_eq(other.as_ref())
    }
}
