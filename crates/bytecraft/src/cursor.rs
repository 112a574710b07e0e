//! Byte cursor over an input slice, plus little-endian integer helpers used
//! by the bitfield codec.

use crate::errors::DecodeErrorKind;

/// A forward-only cursor over a byte slice. Every read consumes exactly the
/// bytes requested or fails without advancing.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left in the stream.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.pos == self.data.len()
    }

    /// Consumes and returns the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeErrorKind> {
        if n > self.remaining() {
            return Err(DecodeErrorKind::UnexpectedEof {
                needed: n,
                available: self.remaining(),
            });
        }

        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Consumes the next `N` bytes as a fixed-size array, for `from_le_bytes`.
    pub fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeErrorKind> {
        let slice = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }
}

/// Interprets up to 8 bytes as an unsigned little-endian integer.
pub fn read_uint_le(bytes: &[u8]) -> u64 {
    debug_assert!(bytes.len() <= 8);

    let mut value = 0u64;
    for (i, &byte) in bytes.iter().enumerate() {
        value |= (byte as u64) << (i * 8);
    }

    value
}

/// Appends the low `n` bytes of `value` in little-endian order.
pub fn write_uint_le(value: u64, n: usize, out: &mut Vec<u8>) {
    debug_assert!(n <= 8);

    for i in 0..n {
        out.push((value >> (i * 8)) as u8);
    }
}
