//! Octet Encoding Rules helpers for the variable-length fields of ILP packets.
#![forbid(unsafe_code)]

use std::io::{Error, ErrorKind, Result};

use byteorder::{BigEndian, ReadBytesExt};
use bytes::BufMut;

const HIGH_BIT: u8 = 0x80;
const LOWER_SEVEN_BITS: u8 = 0x7f;

/// Returns the size (in bytes) of the buffer that encodes a VarOctetString of
/// `length` bytes.
pub fn predict_var_octet_string(length: usize) -> usize {
    if length < 128 {
        1 + length
    } else {
        1 + predict_var_uint_size(length as u64) + length
    }
}

/// Returns the minimum number of bytes needed to encode the value.
fn predict_var_uint_size(value: u64) -> usize {
    let significant_bits = 64 - value.leading_zeros() as usize;
    ((significant_bits + 7) / 8).max(1)
}

pub trait BufOerExt<'a> {
    fn peek_var_octet_string(&self) -> Result<&'a [u8]>;
    fn read_var_octet_string(&mut self) -> Result<&'a [u8]>;
    fn skip(&mut self, discard_bytes: usize) -> Result<()>;
    fn read_var_octet_string_length(&mut self) -> Result<usize>;
    fn read_var_uint(&mut self) -> Result<u64>;
}

impl<'a> BufOerExt<'a> for &'a [u8] {
    /// Decodes a variable-length octet string without moving the cursor.
    #[inline]
    fn peek_var_octet_string(&self) -> Result<&'a [u8]> {
        let mut peek: &'a [u8] = *self;
        peek.read_var_octet_string()
    }

    /// Decodes a variable-length octet string.
    #[inline]
    fn read_var_octet_string(&mut self) -> Result<&'a [u8]> {
        let length = self.read_var_octet_string_length()?;
        if self.len() < length {
            return Err(Error::new(ErrorKind::UnexpectedEof, "buffer too small"));
        }
        let (content, rest) = self.split_at(length);
        *self = rest;
        Ok(content)
    }

    #[inline]
    fn skip(&mut self, discard_bytes: usize) -> Result<()> {
        if self.len() < discard_bytes {
            Err(Error::new(ErrorKind::UnexpectedEof, "buffer too small"))
        } else {
            *self = &self[discard_bytes..];
            Ok(())
        }
    }

    #[doc(hidden)]
    #[inline]
    fn read_var_octet_string_length(&mut self) -> Result<usize> {
        let length = self.read_u8()?;
        if length & HIGH_BIT == 0 {
            return Ok(length as usize);
        }
        let length_prefix_length = (length & LOWER_SEVEN_BITS) as usize;
        if length_prefix_length == 0 || length_prefix_length > 8 {
            Err(Error::new(
                ErrorKind::InvalidData,
                "invalid length prefix",
            ))
        } else {
            Ok(self.read_uint::<BigEndian>(length_prefix_length)? as usize)
        }
    }

    /// Decodes a variable-length unsigned integer.
    #[inline]
    fn read_var_uint(&mut self) -> Result<u64> {
        let size = self.read_var_octet_string_length()?;
        match size {
            0 => Err(Error::new(ErrorKind::InvalidData, "zero-length VarUInt")),
            1..=8 => self.read_uint::<BigEndian>(size),
            _ => Err(Error::new(ErrorKind::InvalidData, "VarUInt too large")),
        }
    }
}

pub trait MutBufOerExt: BufMut + Sized {
    /// Encodes bytes as a variable-length octet string.
    #[inline]
    fn put_var_octet_string(&mut self, buf: &[u8]) {
        self.put_var_octet_string_length(buf.len());
        self.put_slice(buf);
    }

    #[doc(hidden)]
    #[inline]
    fn put_var_octet_string_length(&mut self, length: usize) {
        if length < 128 {
            self.put_u8(length as u8);
        } else {
            let length_of_length = predict_var_uint_size(length as u64);
            self.put_u8(HIGH_BIT | length_of_length as u8);
            self.put_uint(length as u64, length_of_length);
        }
    }

    /// Encodes a `u64` as a variable-length unsigned integer.
    #[inline]
    fn put_var_uint(&mut self, uint: u64) {
        let size = predict_var_uint_size(uint);
        self.put_var_octet_string_length(size);
        self.put_uint(uint, size);
    }
}

impl<B: BufMut + Sized> MutBufOerExt for B {}
