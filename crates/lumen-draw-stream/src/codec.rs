//! Bounds-checked cursors over instruction bytes.
//!
//! Values are stored in native byte order with no alignment; a stream never
//! leaves the process that recorded it.

use bytemuck::Pod;

use crate::error::DecodeError;

/// Writes into a region whose size was computed up front.
///
/// Overrunning the region is a bug in the size computation and panics.
pub(crate) struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_ne_bytes());
    }

    pub(crate) fn write_pod<T: Pod>(&mut self, v: &T) {
        self.write_bytes(bytemuck::bytes_of(v));
    }

    pub(crate) fn write_pod_slice<T: Pod>(&mut self, v: &[T]) {
        self.write_bytes(bytemuck::cast_slice(v));
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        assert!(
            end <= self.buf.len(),
            "instruction write overruns its region ({end} > {})",
            self.buf.len()
        );
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
    }

    /// Writes a `u32` length followed by the bytes.
    pub(crate) fn write_len_prefixed(&mut self, bytes: &[u8]) {
        self.write_u32(len_u32(bytes.len()));
        self.write_bytes(bytes);
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> usize {
        self.pos
    }
}

pub(crate) fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("length {len} does not fit in u32"))
}

/// Reads from a page, reporting offsets relative to the page start.
#[derive(Clone)]
pub(crate) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::Truncated {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.read_pod()
    }

    pub(crate) fn read_pod<T: Pod>(&mut self) -> Result<T, DecodeError> {
        let bytes = self.read_bytes(core::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Reads a `u32` length followed by that many bytes.
    pub(crate) fn read_len_prefixed(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_u32()? as usize;
        self.read_bytes(len)
    }

    pub(crate) fn read_str(&mut self) -> Result<&'a str, DecodeError> {
        let offset = self.pos;
        let bytes = self.read_len_prefixed()?;
        core::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_and_reader_agree_on_layout() {
        let mut buf = [0u8; 32];
        let mut w = ByteWriter::new(&mut buf);
        w.write_u8(7);
        w.write_pod(&0x1122_3344_5566_7788u64);
        w.write_len_prefixed(b"abc");
        assert_eq!(w.position(), 1 + 8 + 4 + 3);

        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_u8().unwrap(), 7);
        assert_eq!(r.read_pod::<u64>().unwrap(), 0x1122_3344_5566_7788);
        assert_eq!(r.read_str().unwrap(), "abc");
        assert_eq!(r.remaining(), 32 - 16);
    }

    #[test]
    fn reader_reports_truncation() {
        let buf = [1u8, 2, 3];
        let mut r = ByteReader::new(&buf);
        r.read_u8().unwrap();
        assert_eq!(
            r.read_u32(),
            Err(DecodeError::Truncated {
                offset: 1,
                needed: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn reader_rejects_bad_utf8() {
        let mut buf = [0u8; 6];
        let mut w = ByteWriter::new(&mut buf);
        w.write_len_prefixed(&[0xff, 0xfe]);
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.read_str(), Err(DecodeError::InvalidUtf8 { offset: 0 }));
    }

    #[test]
    #[should_panic(expected = "overruns its region")]
    fn writer_panics_past_region() {
        let mut buf = [0u8; 3];
        let mut w = ByteWriter::new(&mut buf);
        w.write_u32(1);
    }
}
