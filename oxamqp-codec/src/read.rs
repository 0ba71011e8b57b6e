//! Reading primitives out of a borrowed slice

use crate::error::Error;

/// A reader for a slice of bytes
#[derive(Debug)]
pub struct SliceReader<'s> {
    slice: &'s [u8],
    consumed: usize,
}

impl<'s> SliceReader<'s> {
    /// Creates a new slice reader
    pub fn new(slice: &'s [u8]) -> Self {
        Self { slice, consumed: 0 }
    }

    /// Number of bytes that have been consumed so far
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Bytes that have not been consumed yet
    pub fn remaining(&self) -> &'s [u8] {
        self.slice
    }

    /// Peek the next byte without consuming
    pub fn peek(&self) -> Option<u8> {
        self.slice.first().copied()
    }

    /// Read the next byte
    pub fn next(&mut self) -> Result<u8, Error> {
        let [b] = self.read_const_bytes::<1>()?;
        Ok(b)
    }

    /// Return a slice of the given length. If the internal slice doesn't have
    /// enough bytes, an `Err(_)` will be returned.
    pub fn get_byte_slice(&mut self, n: usize) -> Result<&'s [u8], Error> {
        if self.slice.len() < n {
            return Err(Error::UnexpectedEof);
        }
        let (read_slice, remaining) = self.slice.split_at(n);
        self.slice = remaining;
        self.consumed += n;
        Ok(read_slice)
    }

    /// Read `N` bytes into a stack allocated array
    pub fn read_const_bytes<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.get_byte_slice(N)?);
        Ok(buf)
    }

    /// Read a length or count field of the given width
    pub(crate) fn read_len(&mut self, wide: bool) -> Result<usize, Error> {
        let len = if wide {
            u32::from_be_bytes(self.read_const_bytes()?) as usize
        } else {
            self.next()? as usize
        };
        Ok(len)
    }
}
