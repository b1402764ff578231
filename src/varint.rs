use crate::error::{Error, Result};

/// Longest LEB128 encoding of a `u32`.
pub const MAX_VAR_U32: usize = 5;
/// Longest LEB128 encoding of a `u64`.
pub const MAX_VAR_U64: usize = 10;

/// A LEB128-encoded unsigned integer: 7 bits per byte, least significant group first, high bit
/// set on every byte except the last.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VarInt {
    n: [u8; MAX_VAR_U64],
    len: u8,
}

impl VarInt {
    pub fn from_u64(mut i: u64) -> VarInt {
        let mut n = [0u8; MAX_VAR_U64];
        let mut len = 0;
        loop {
            let byte = (i & 0x7F) as u8;
            i >>= 7;
            if i == 0 {
                n[len] = byte;
                len += 1;
                break;
            }
            n[len] = byte | 0x80;
            len += 1;
        }
        VarInt { n, len: len as u8 }
    }

    pub fn from_u32(i: u32) -> VarInt {
        Self::from_u64(i as u64)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.n[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Decode a varint of at most `max_len` bytes from the front of `buf`. Returns the value and
    /// the number of bytes it occupied.
    pub fn decode(buf: &[u8], max_len: usize) -> Result<(u64, usize)> {
        let mut value = 0u64;
        for i in 0..max_len {
            let byte = match buf.get(i) {
                Some(b) => *b,
                None => return Err(Error::underflow("decode varint", buf.len(), i + 1)),
            };
            value |= ((byte & 0x7F) as u64) << (7 * i);
            if byte & 0x80 == 0 {
                // The final group of a maximum-width encoding may only hold the leftover bits
                let bits = if max_len == MAX_VAR_U32 { 32 } else { 64 };
                let used = 7 * i as u32;
                if used + 7 > bits && (byte as u32) >> (bits - used) != 0 {
                    return Err(Error::MalformedEncoding(format!(
                        "varint overflows {} bits",
                        bits
                    )));
                }
                return Ok((value, i + 1));
            }
        }
        Err(Error::MalformedEncoding(format!(
            "varint continuation bits didn't terminate within {} bytes",
            max_len
        )))
    }
}

#[inline]
pub fn zigzag_i32(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

#[inline]
pub fn unzigzag_i32(v: u32) -> i32 {
    ((v >> 1) as i32) ^ -((v & 1) as i32)
}

#[inline]
pub fn zigzag_i64(v: i64) -> u64 {
    ((v << 1) ^ (v >> 63)) as u64
}

#[inline]
pub fn unzigzag_i64(v: u64) -> i64 {
    ((v >> 1) as i64) ^ -((v & 1) as i64)
}
