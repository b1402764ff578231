//! Byte source for decoding.

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{Error, Result};
use crate::varint::{unzigzag_i32, unzigzag_i64, VarInt, MAX_VAR_U32, MAX_VAR_U64};

#[derive(Clone, Debug)]
pub struct Input<'a> {
    data: &'a [u8],
    position: usize,
}

macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr, $method:ident, $step:expr) => {
        pub fn $name(&mut self) -> Result<$type> {
            let mut rest = &self.data[self.position..];
            let v = rest
                .$method::<LittleEndian>()
                .map_err(|_| Error::underflow($step, self.remaining(), $size))?;
            self.position += $size;
            Ok(v)
        }
    };
}

impl<'a> Input<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(Error::underflow(
                "set position",
                self.data.len(),
                position,
            ));
        }
        self.position = position;
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::underflow("read bytes", self.remaining(), len));
        }
        let start = self.position;
        self.position += len;
        Ok(&self.data[start..self.position])
    }

    /// Split off the next `len` bytes as their own input, and move past them. Positions in the
    /// returned input stay relative to the start of the whole buffer.
    pub fn take(&mut self, len: usize) -> Result<Input<'a>> {
        let start = self.position;
        self.read_bytes(len)?;
        Ok(Input {
            data: &self.data[..self.position],
            position: start,
        })
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut rest = &self.data[self.position..];
        let v = rest
            .read_u8()
            .map_err(|_| Error::underflow("decode u8", 0, 1))?;
        self.position += 1;
        Ok(v)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(Error::MalformedEncoding(format!(
                "Got bool byte 0x{:02x}, expected 0 or 1",
                v
            ))),
        }
    }

    impl_read_le!(read_i16, i16, 2, read_i16, "decode i16");
    impl_read_le!(read_u32, u32, 4, read_u32, "decode u32");
    impl_read_le!(read_i32, i32, 4, read_i32, "decode i32");
    impl_read_le!(read_u64, u64, 8, read_u64, "decode u64");
    impl_read_le!(read_i64, i64, 8, read_i64, "decode i64");
    impl_read_le!(read_f32, f32, 4, read_f32, "decode f32");
    impl_read_le!(read_f64, f64, 8, read_f64, "decode f64");

    pub fn read_var_u32(&mut self) -> Result<u32> {
        let (v, len) = VarInt::decode(&self.data[self.position..], MAX_VAR_U32)?;
        self.position += len;
        Ok(v as u32)
    }

    pub fn read_var_u64(&mut self) -> Result<u64> {
        let (v, len) = VarInt::decode(&self.data[self.position..], MAX_VAR_U64)?;
        self.position += len;
        Ok(v)
    }

    pub fn read_var_i32(&mut self) -> Result<i32> {
        Ok(unzigzag_i32(self.read_var_u32()?))
    }

    pub fn read_var_i64(&mut self) -> Result<i64> {
        Ok(unzigzag_i64(self.read_var_u64()?))
    }

    /// Read a length prefix. Lengths can't exceed what's left in the input, which also stops
    /// corrupt data from triggering huge allocations.
    pub fn read_len(&mut self) -> Result<usize> {
        let len = self.read_var_u64()?;
        if len > self.remaining() as u64 {
            return Err(Error::underflow(
                "length prefix",
                self.remaining(),
                len.min(usize::MAX as u64) as usize,
            ));
        }
        Ok(len as usize)
    }

    pub fn read_str(&mut self) -> Result<String> {
        let len = self.read_len()?;
        self.str_body(len)
    }

    pub fn read_str_opt(&mut self) -> Result<Option<String>> {
        match self.read_var_u64()? {
            0 => Ok(None),
            n => {
                let len = (n - 1) as usize;
                if len > self.remaining() {
                    return Err(Error::underflow("string content", self.remaining(), len));
                }
                self.str_body(len).map(Some)
            }
        }
    }

    fn str_body(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(|s| s.to_string())
            .map_err(|e| Error::MalformedEncoding(format!("{}", e)))
    }
}
