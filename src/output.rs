//! Byte sink for encoding.
//!
//! An [`Output`] is backed by one of three stores:
//! - a caller-supplied fixed slice ([`Output::new`]), which fails with
//!   [`Error::CapacityExceeded`] instead of overflowing,
//! - an owned vector that grows up to a maximum size ([`Output::growable`]),
//! - a fixed-size chunk in front of an [`io::Write`] ([`Output::from_writer`]), flushed whenever
//!   it fills up.
//!
//! Every primitive checks for room before touching the store, so a failed write leaves the bytes
//! already written exactly as they were.

use std::io;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::varint::{zigzag_i32, zigzag_i64, VarInt};

const MIN_CHUNK: usize = 16;

enum Sink<'a> {
    Slice(&'a mut [u8]),
    Growable {
        bytes: Vec<u8>,
        max: usize,
    },
    Stream {
        chunk: Vec<u8>,
        writer: &'a mut dyn io::Write,
        flushed: u64,
    },
}

pub struct Output<'a> {
    sink: Sink<'a>,
    position: usize,
}

macro_rules! impl_write_le {
    ($name:ident, $type:ty, $size:expr, $method:ident) => {
        pub fn $name(&mut self, value: $type) -> Result<()> {
            let mut bytes = [0u8; $size];
            LittleEndian::$method(&mut bytes, value);
            self.put(&bytes)
        }
    };
}

impl<'a> Output<'a> {
    /// Write into a fixed, caller-owned buffer.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            sink: Sink::Slice(buf),
            position: 0,
        }
    }

    /// Write into an owned buffer starting at `initial` bytes and growing up to `max` bytes.
    pub fn growable(initial: usize, max: usize) -> Output<'static> {
        Output {
            sink: Sink::Growable {
                bytes: vec![0u8; initial.min(max)],
                max,
            },
            position: 0,
        }
    }

    /// Write into an owned buffer with no size limit.
    pub fn unbounded() -> Output<'static> {
        Output::growable(64, usize::MAX)
    }

    /// Buffer up to `chunk_size` bytes at a time in front of `writer`.
    pub fn from_writer(writer: &'a mut dyn io::Write, chunk_size: usize) -> Self {
        Self {
            sink: Sink::Stream {
                chunk: vec![0u8; chunk_size.max(MIN_CHUNK)],
                writer,
                flushed: 0,
            },
            position: 0,
        }
    }

    /// Current write position within the buffered bytes.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the write position. It can't be moved past the buffer's current capacity.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        let capacity = self.capacity();
        if position > capacity {
            return Err(Error::CapacityExceeded {
                needed: position - self.position,
                available: capacity - self.position,
            });
        }
        self.position = position;
        Ok(())
    }

    /// Reset the position to the start, discarding buffered bytes.
    pub fn clear(&mut self) {
        self.position = 0;
    }

    /// Total bytes written, including any already flushed to a writer.
    pub fn total(&self) -> u64 {
        match self.sink {
            Sink::Stream { flushed, .. } => flushed + self.position as u64,
            _ => self.position as u64,
        }
    }

    /// Bytes that can currently be held without growing or flushing.
    pub fn capacity(&self) -> usize {
        match self.sink {
            Sink::Slice(ref buf) => buf.len(),
            Sink::Growable { ref bytes, .. } => bytes.len(),
            Sink::Stream { ref chunk, .. } => chunk.len(),
        }
    }

    /// The buffered bytes not yet flushed.
    pub fn as_slice(&self) -> &[u8] {
        match self.sink {
            Sink::Slice(ref buf) => &buf[..self.position],
            Sink::Growable { ref bytes, .. } => &bytes[..self.position],
            Sink::Stream { ref chunk, .. } => &chunk[..self.position],
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Push buffered bytes to the writer, if there is one. A no-op for slice and vector stores.
    pub fn flush(&mut self) -> Result<()> {
        if let Sink::Stream {
            ref chunk,
            ref mut writer,
            ref mut flushed,
        } = self.sink
        {
            writer.write_all(&chunk[..self.position])?;
            writer.flush()?;
            *flushed += self.position as u64;
            self.position = 0;
        }
        Ok(())
    }

    /// Make room for `n` more bytes at the current position.
    fn require(&mut self, n: usize) -> Result<()> {
        let needed = self.position + n;
        let position = self.position;
        match self.sink {
            Sink::Slice(ref buf) => {
                if needed > buf.len() {
                    return Err(Error::CapacityExceeded {
                        needed: n,
                        available: buf.len() - position,
                    });
                }
            }
            Sink::Growable { ref mut bytes, max } => {
                if needed > bytes.len() {
                    if needed > max {
                        return Err(Error::CapacityExceeded {
                            needed: n,
                            available: max - position,
                        });
                    }
                    let new_len = bytes.len().saturating_mul(2).max(needed).min(max);
                    bytes.resize(new_len, 0);
                }
            }
            Sink::Stream { ref chunk, .. } => {
                if needed > chunk.len() {
                    self.flush()?;
                }
            }
        }
        Ok(())
    }

    fn put(&mut self, data: &[u8]) -> Result<()> {
        self.require(data.len())?;
        let start = self.position;
        let end = start + data.len();
        match self.sink {
            Sink::Slice(ref mut buf) => buf[start..end].copy_from_slice(data),
            Sink::Growable { ref mut bytes, .. } => bytes[start..end].copy_from_slice(data),
            Sink::Stream { ref mut chunk, .. } => chunk[start..end].copy_from_slice(data),
        }
        self.position = end;
        Ok(())
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        if let Sink::Stream { ref chunk, .. } = self.sink {
            // Larger than a chunk: feed it through one chunk at a time
            let chunk_len = chunk.len();
            let mut rest = data;
            while rest.len() > chunk_len - self.position {
                let (head, tail) = rest.split_at(chunk_len - self.position);
                self.put(head)?;
                self.flush()?;
                rest = tail;
            }
            return self.put(rest);
        }
        self.put(data)
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.put(&[value])
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.put(&[value as u8])
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.put(&[value as u8])
    }

    impl_write_le!(write_i16, i16, 2, write_i16);
    impl_write_le!(write_u32, u32, 4, write_u32);
    impl_write_le!(write_i32, i32, 4, write_i32);
    impl_write_le!(write_u64, u64, 8, write_u64);
    impl_write_le!(write_i64, i64, 8, write_i64);
    impl_write_le!(write_f32, f32, 4, write_f32);
    impl_write_le!(write_f64, f64, 8, write_f64);

    /// Write a LEB128 varint. Returns the number of bytes written.
    pub fn write_var_u32(&mut self, value: u32) -> Result<usize> {
        let v = VarInt::from_u32(value);
        self.put(v.as_bytes())?;
        Ok(v.len())
    }

    pub fn write_var_u64(&mut self, value: u64) -> Result<usize> {
        let v = VarInt::from_u64(value);
        self.put(v.as_bytes())?;
        Ok(v.len())
    }

    /// Write a zigzag-encoded varint, so small negative numbers stay short.
    pub fn write_var_i32(&mut self, value: i32) -> Result<usize> {
        self.write_var_u32(zigzag_i32(value))
    }

    pub fn write_var_i64(&mut self, value: i64) -> Result<usize> {
        self.write_var_u64(zigzag_i64(value))
    }

    pub fn write_len(&mut self, len: usize) -> Result<usize> {
        self.write_var_u64(len as u64)
    }

    /// Write a string as its byte length followed by its UTF-8 bytes. No terminator is written,
    /// so embedded NUL characters round-trip.
    pub fn write_str(&mut self, value: &str) -> Result<()> {
        self.write_len(value.len())?;
        self.write_bytes(value.as_bytes())
    }

    /// Write an optional string, with the length prefix offset by one and `0` meaning none.
    pub fn write_str_opt(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            None => self.write_u8(0),
            Some(s) => {
                self.write_var_u64(s.len() as u64 + 1)?;
                self.write_bytes(s.as_bytes())
            }
        }
    }
}

impl Output<'static> {
    /// Take the written bytes out of an owned buffer.
    pub fn into_inner(self) -> Vec<u8> {
        let position = self.position;
        match self.sink {
            Sink::Growable { mut bytes, .. } => {
                bytes.truncate(position);
                bytes
            }
            Sink::Slice(buf) => buf[..position].to_vec(),
            Sink::Stream { chunk, .. } => chunk[..position].to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_exact_fit() {
        let mut buf = [0u8; 7];
        let mut out = Output::new(&mut buf);
        out.write_i32(-2).unwrap();
        out.write_i16(0x0102).unwrap();
        out.write_u8(9).unwrap();
        assert_eq!(out.position(), 7);
        assert_eq!(buf, [0xFE, 0xFF, 0xFF, 0xFF, 0x02, 0x01, 9]);
    }

    #[test]
    fn fixed_overflow_leaves_prior_bytes() {
        let mut buf = [0xAAu8; 6];
        let mut out = Output::new(&mut buf);
        out.write_i32(1).unwrap();
        match out.write_i32(2) {
            Err(Error::CapacityExceeded { needed, available }) => {
                assert_eq!(needed, 4);
                assert_eq!(available, 2);
            }
            other => panic!("expected CapacityExceeded, got {:?}", other),
        }
        assert_eq!(out.position(), 4);
        assert_eq!(buf, [1, 0, 0, 0, 0xAA, 0xAA]);
    }

    #[test]
    fn growable_respects_max() {
        let mut out = Output::growable(2, 10);
        out.write_u64(7).unwrap();
        out.write_i16(1).unwrap();
        assert!(matches!(
            out.write_u8(1),
            Err(Error::CapacityExceeded { .. })
        ));
        assert_eq!(out.into_inner().len(), 10);
    }

    #[test]
    fn strings_keep_nul() {
        let mut out = Output::unbounded();
        out.write_str("a\0b").unwrap();
        out.write_str_opt(None).unwrap();
        out.write_str_opt(Some("")).unwrap();
        assert_eq!(out.into_inner(), vec![3, b'a', 0, b'b', 0, 1]);
    }

    #[test]
    fn stream_flushes_chunks() {
        let mut sink: Vec<u8> = Vec::new();
        {
            let mut out = Output::from_writer(&mut sink, 16);
            for i in 0..10u32 {
                out.write_u32(i).unwrap();
            }
            out.write_bytes(&[0x55; 40]).unwrap();
            assert_eq!(out.total(), 80);
            out.flush().unwrap();
        }
        assert_eq!(sink.len(), 80);
        assert_eq!(&sink[4..8], &[1, 0, 0, 0]);
        assert!(sink[40..].iter().all(|b| *b == 0x55));
    }

    #[test]
    fn position_control() {
        let mut buf = [0u8; 4];
        let mut out = Output::new(&mut buf);
        out.write_u8(1).unwrap();
        out.write_u8(2).unwrap();
        out.set_position(0).unwrap();
        out.write_u8(3).unwrap();
        assert_eq!(out.as_slice(), &[3]);
        assert!(out.set_position(5).is_err());
        out.clear();
        assert_eq!(out.position(), 0);
    }
}
