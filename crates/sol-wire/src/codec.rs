//! Bounds-checked reading of little-endian account and instruction data.
//!
//! On-chain account layouts are flat byte runs: fixed-width scalars in
//! little-endian order plus length-prefixed UTF-8 strings (a `u32` LE byte
//! count followed by the bytes). `ByteReader` walks such a buffer while
//! tracking its position, so decoders fail cleanly on truncated or corrupt
//! data instead of panicking on a slice index.

use crate::error::WireError;

/// Cursor over a borrowed byte buffer.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `len` bytes, or fail if the buffer is too short.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < len {
            return Err(WireError::Serialization(format!(
                "unexpected end of data: need {len} bytes, have {}",
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Take the next `N` bytes as a fixed-size array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let slice = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32_le(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.read_array::<4>()?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.read_array::<8>()?))
    }

    pub fn read_i64_le(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_le_bytes(self.read_array::<8>()?))
    }

    /// Read a 32-byte public key.
    pub fn read_pubkey(&mut self) -> Result<[u8; 32], WireError> {
        self.read_array::<32>()
    }

    /// Read a length-prefixed UTF-8 string: `u32` LE byte count,
    /// then that many bytes.
    ///
    /// The length is validated against the remaining buffer before any
    /// allocation, so a corrupt prefix cannot trigger an oversized read.
    pub fn read_string(&mut self) -> Result<String, WireError> {
        let len = self.read_u32_le()? as usize;
        if len > self.remaining() {
            return Err(WireError::Serialization(format!(
                "string length {len} exceeds remaining {} bytes",
                self.remaining()
            )));
        }
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| WireError::Serialization(format!("string is not valid UTF-8: {e}")))
    }
}
