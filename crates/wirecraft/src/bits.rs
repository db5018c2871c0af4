//! Bit-level reader and writer over byte buffers.
//!
//! Both sides keep a single bit cursor counted from the MSB of the first
//! byte. Byte-aligned, whole-byte transfers take a `copy_from_slice` fast
//! path; everything else goes bit by bit. The layout contract: bit *i* of an
//! encoded field (counted from the MSB of the field's first byte) equals bit
//! *i* of the value's low `bits` bits.
//!
//! Multi-byte integers are marshalled through a full-width byte buffer using
//! the current byte order and cropped to the trailing `⌈bits/8⌉` bytes before
//! they reach the bit layer; reads are symmetric.

use crate::errors::{Error, Result};

/// Byte order for multi-byte integer marshalling. There is no implicit
/// default; the top-level call supplies the order in scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

impl ByteOrder {
    /// Writes the low `buf.len()` bytes of `x` into `buf` in this order.
    pub fn put_uint(self, buf: &mut [u8], x: u64) {
        let width = buf.len();
        for (i, b) in buf.iter_mut().enumerate() {
            let shift = match self {
                ByteOrder::Big => 8 * (width - 1 - i),
                ByteOrder::Little => 8 * i,
            };
            *b = (x >> shift) as u8;
        }
    }

    /// Reads `buf` as an unsigned integer in this order.
    pub fn uint(self, buf: &[u8]) -> u64 {
        let width = buf.len();
        let mut x = 0u64;
        for (i, b) in buf.iter().enumerate() {
            let shift = match self {
                ByteOrder::Big => 8 * (width - 1 - i),
                ByteOrder::Little => 8 * i,
            };
            x |= (*b as u64) << shift;
        }
        x
    }
}

fn short(needed: usize, available: usize) -> Error {
    Error::Buffer { needed, available }
}

/// Places bit `i` of a `bits`-wide field into `buf`, which holds the low
/// `bits` bits right-aligned.
fn put_bit(buf: &mut [u8], bits: usize, i: usize, val: u8) {
    let weight = bits - 1 - i;
    let idx = buf.len() - 1 - weight / 8;
    buf[idx] |= val << (weight % 8);
}

/// Extracts bit `i` of a `bits`-wide field from `buf` (same layout).
fn get_bit(buf: &[u8], bits: usize, i: usize) -> u8 {
    let weight = bits - 1 - i;
    let idx = buf.len() - 1 - weight / 8;
    (buf[idx] >> (weight % 8)) & 1
}

/// Consuming reader with a bit cursor.
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    pub fn bit_pos(&self) -> usize {
        self.bit_pos
    }

    fn remaining_bits(&self) -> usize {
        self.data.len() * 8 - self.bit_pos
    }

    fn ensure(&self, bits: usize) -> Result<()> {
        if bits > self.remaining_bits() {
            return Err(short(bits, self.remaining_bits()));
        }
        Ok(())
    }

    fn read_bit(&mut self) -> u8 {
        let b = (self.data[self.bit_pos / 8] >> (7 - self.bit_pos % 8)) & 1;
        self.bit_pos += 1;
        b
    }

    /// Reads `bits` bits into the low end of `out`, MSB-first. `out` is the
    /// full wire width of the field; only its trailing bytes are touched.
    pub fn read_bits(&mut self, bits: usize, out: &mut [u8]) -> Result<()> {
        self.ensure(bits)?;
        let crop = out.len() - (bits + 7) / 8;
        let out = &mut out[crop..];

        if self.bit_pos % 8 == 0 && bits % 8 == 0 {
            let start = self.bit_pos / 8;
            out.copy_from_slice(&self.data[start..start + bits / 8]);
            self.bit_pos += bits;
        } else {
            for i in 0..bits {
                let bit = self.read_bit();
                put_bit(out, bits, i, bit);
            }
        }
        Ok(())
    }

    /// Reads `n` whole bytes from the current byte position. A pending bit
    /// offset is preserved across the read.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let start = self.bit_pos / 8;
        if start + n > self.data.len() {
            return Err(short(n * 8, (self.data.len() - start) * 8));
        }
        self.bit_pos += n * 8;
        Ok(&self.data[start..start + n])
    }

    /// Advances the cursor without touching content.
    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.bit_pos += n;
        Ok(())
    }

    /// The unconsumed tail, from the current byte position.
    pub fn remaining_bytes(&self) -> &'a [u8] {
        &self.data[self.bit_pos / 8..]
    }
}

/// Writer over an exact-size, zero-initialized buffer.
#[derive(Debug)]
pub struct BitWriter {
    buf: Vec<u8>,
    bit_pos: usize,
}

impl BitWriter {
    pub fn new(size_bytes: usize) -> Self {
        Self {
            buf: vec![0u8; size_bytes],
            bit_pos: 0,
        }
    }

    fn remaining_bits(&self) -> usize {
        self.buf.len() * 8 - self.bit_pos
    }

    fn ensure(&self, bits: usize) -> Result<()> {
        if bits > self.remaining_bits() {
            return Err(short(bits, self.remaining_bits()));
        }
        Ok(())
    }

    fn write_bit(&mut self, val: u8) {
        self.buf[self.bit_pos / 8] |= (val & 1) << (7 - self.bit_pos % 8);
        self.bit_pos += 1;
    }

    /// Writes the low `bits` bits of `input` (full wire width), MSB-first.
    pub fn write_bits(&mut self, bits: usize, input: &[u8]) -> Result<()> {
        self.ensure(bits)?;
        let crop = input.len() - (bits + 7) / 8;
        let input = &input[crop..];

        if self.bit_pos % 8 == 0 && bits % 8 == 0 {
            let start = self.bit_pos / 8;
            self.buf[start..start + bits / 8].copy_from_slice(input);
            self.bit_pos += bits;
        } else {
            for i in 0..bits {
                let bit = get_bit(input, bits, i);
                self.write_bit(bit);
            }
        }
        Ok(())
    }

    /// Writes `n` whole bytes at the current byte position, preserving a
    /// pending bit offset.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let start = self.bit_pos / 8;
        if start + bytes.len() > self.buf.len() {
            return Err(short(bytes.len() * 8, (self.buf.len() - start) * 8));
        }
        self.buf[start..start + bytes.len()].copy_from_slice(bytes);
        self.bit_pos += bytes.len() * 8;
        Ok(())
    }

    /// Advances the cursor, leaving zeros behind.
    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.bit_pos += n;
        Ok(())
    }

    /// Mutable view of the unwritten tail, for custom codecs.
    pub fn remaining_bytes_mut(&mut self) -> &mut [u8] {
        let start = self.bit_pos / 8;
        &mut self.buf[start..]
    }

    /// Marks `n` bytes as written by a custom codec.
    pub fn advance_bytes(&mut self, n: usize) -> Result<()> {
        let start = self.bit_pos / 8;
        if start + n > self.buf.len() {
            return Err(short(n * 8, (self.buf.len() - start) * 8));
        }
        self.bit_pos += n * 8;
        Ok(())
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_order_round_trip() {
        let mut buf = [0u8; 4];
        ByteOrder::Big.put_uint(&mut buf, 0x12345678);
        assert_eq!(buf, [0x12, 0x34, 0x56, 0x78]);
        assert_eq!(ByteOrder::Big.uint(&buf), 0x12345678);

        ByteOrder::Little.put_uint(&mut buf, 0x12345678);
        assert_eq!(buf, [0x78, 0x56, 0x34, 0x12]);
        assert_eq!(ByteOrder::Little.uint(&buf), 0x12345678);
    }

    #[test]
    fn aligned_fast_path_read() {
        let data = [0xAB, 0xCD, 0xEF];
        let mut r = BitReader::new(&data);
        let mut out = [0u8; 2];
        r.read_bits(16, &mut out).unwrap();
        assert_eq!(out, [0xAB, 0xCD]);
        assert_eq!(r.bit_pos(), 16);
    }

    #[test]
    fn misaligned_slow_path_read() {
        // 010 10 10101010 101 — three bit-subfields around a full byte.
        let data = [0x55, 0x55];
        let mut r = BitReader::new(&data);

        let mut a = [0u8; 1];
        r.read_bits(3, &mut a).unwrap();
        assert_eq!(a[0], 0b010);

        let mut b = [0u8; 1];
        r.read_bits(2, &mut b).unwrap();
        assert_eq!(b[0], 0b10);

        let mut c = [0u8; 1];
        r.read_bits(8, &mut c).unwrap();
        assert_eq!(c[0], 0xAA);

        let mut d = [0u8; 1];
        r.read_bits(3, &mut d).unwrap();
        assert_eq!(d[0], 0b101);
    }

    #[test]
    fn aligned_fast_path_write() {
        let mut w = BitWriter::new(2);
        w.write_bits(16, &[0xAB, 0xCD]).unwrap();
        assert_eq!(w.into_vec(), vec![0xAB, 0xCD]);
    }

    #[test]
    fn misaligned_slow_path_write() {
        let mut w = BitWriter::new(2);
        w.write_bits(3, &[0b010]).unwrap();
        w.write_bits(2, &[0b10]).unwrap();
        w.write_bits(8, &[0xAA]).unwrap();
        w.write_bits(3, &[0b101]).unwrap();
        assert_eq!(w.into_vec(), vec![0x55, 0x55]);
    }

    #[test]
    fn nine_bits_leave_trailing_zeros() {
        let mut w = BitWriter::new(2);
        w.write_bits(3, &[0b111]).unwrap();
        w.write_bits(3, &[0b111]).unwrap();
        w.write_bits(3, &[0b111]).unwrap();
        let out = w.into_vec();
        assert_eq!(out, vec![0xFF, 0x80]);
        assert_eq!(out[1] & 0x7F, 0);
    }

    #[test]
    fn skip_zero_fills_on_write() {
        let mut w = BitWriter::new(3);
        w.write_bits(8, &[0x11]).unwrap();
        w.skip_bits(8).unwrap();
        w.write_bits(8, &[0x22]).unwrap();
        assert_eq!(w.into_vec(), vec![0x11, 0x00, 0x22]);
    }

    #[test]
    fn wide_field_crops_to_trailing_bytes() {
        // 12 bits marshalled through a 4-byte big-endian buffer.
        let mut buf = [0u8; 4];
        ByteOrder::Big.put_uint(&mut buf, 0xABC);
        let mut w = BitWriter::new(2);
        w.write_bits(12, &buf).unwrap();
        let out = w.into_vec();
        assert_eq!(out, vec![0xAB, 0xC0]);

        let mut r = BitReader::new(&out);
        let mut back = [0u8; 4];
        r.read_bits(12, &mut back).unwrap();
        assert_eq!(ByteOrder::Big.uint(&back), 0xABC);
    }

    #[test]
    fn read_bytes_preserves_bit_offset() {
        let data = [0x80, 0x01, 0x02, 0x03];
        let mut r = BitReader::new(&data);
        let mut one = [0u8; 1];
        r.read_bits(1, &mut one).unwrap();
        assert_eq!(one[0], 1);
        // Byte reads move whole bytes from the current byte position.
        assert_eq!(r.read_bytes(2).unwrap(), &[0x80, 0x01]);
        assert_eq!(r.bit_pos(), 17);
    }

    #[test]
    fn read_past_end_is_a_buffer_error() {
        let data = [0xFF];
        let mut r = BitReader::new(&data);
        let mut out = [0u8; 2];
        assert!(matches!(
            r.read_bits(9, &mut out),
            Err(Error::Buffer { needed: 9, available: 8 })
        ));
    }

    #[test]
    fn write_past_end_is_a_buffer_error() {
        let mut w = BitWriter::new(1);
        assert!(matches!(
            w.write_bits(9, &[0xFF, 0xFF]),
            Err(Error::Buffer { .. })
        ));
    }
}
