//! Little-endian primitive reader and writer shared by every format.
//!
//! Each read names the field it is decoding so that a truncated input
//! reports where the stream ran out.

use crate::error::{MeshError, Result, argument_err};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Write};

pub struct ByteReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(data) }
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn ensure(&self, field: &'static str, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(MeshError::Truncated { field, needed, offset: self.position() });
        }
        Ok(())
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        self.ensure(field, 1)?;
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_i8(&mut self, field: &'static str) -> Result<i8> {
        self.ensure(field, 1)?;
        Ok(self.cursor.read_i8()?)
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16> {
        self.ensure(field, 2)?;
        Ok(self.cursor.read_u16::<LittleEndian>()?)
    }

    pub fn read_i16(&mut self, field: &'static str) -> Result<i16> {
        self.ensure(field, 2)?;
        Ok(self.cursor.read_i16::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32> {
        self.ensure(field, 4)?;
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self, field: &'static str) -> Result<i32> {
        self.ensure(field, 4)?;
        Ok(self.cursor.read_i32::<LittleEndian>()?)
    }

    pub fn read_f32(&mut self, field: &'static str) -> Result<f32> {
        self.ensure(field, 4)?;
        Ok(self.cursor.read_f32::<LittleEndian>()?)
    }

    /// Borrows the next `len` bytes without copying.
    pub fn read_bytes(&mut self, field: &'static str, len: usize) -> Result<&'a [u8]> {
        self.ensure(field, len)?;
        let start = self.position();
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + len) as u64);
        Ok(&data[start..start + len])
    }

    pub fn skip(&mut self, field: &'static str, len: usize) -> Result<()> {
        self.read_bytes(field, len).map(|_| ())
    }

    /// Reads a `u16` byte length followed by that many bytes of UTF-8.
    pub fn read_string(&mut self, field: &'static str) -> Result<String> {
        let len = self.read_u16(field)? as usize;
        let bytes = self.read_bytes(field, len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|source| MeshError::Decode { field, source })
    }
}

#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        Ok(self.buf.write_u8(value)?)
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        Ok(self.buf.write_i8(value)?)
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        Ok(self.buf.write_u16::<LittleEndian>(value)?)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        Ok(self.buf.write_i16::<LittleEndian>(value)?)
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        Ok(self.buf.write_u32::<LittleEndian>(value)?)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        Ok(self.buf.write_i32::<LittleEndian>(value)?)
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        Ok(self.buf.write_f32::<LittleEndian>(value)?)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        Ok(self.buf.write_all(bytes)?)
    }

    pub fn write_string(&mut self, field: &'static str, value: &str) -> Result<()> {
        let len = u16::try_from(value.len())
            .map_err(|_| argument_err(format!("{} is {} bytes long, limit is 65535", field, value.len())))?;
        self.write_u16(len)?;
        self.write_bytes(value.as_bytes())
    }
}

/// Converts a collection length into the width of its on-disk count field.
pub fn count_as<T: TryFrom<usize>>(field: &'static str, len: usize) -> Result<T> {
    T::try_from(len).map_err(|_| argument_err(format!("{} of {} does not fit its count field", field, len)))
}
