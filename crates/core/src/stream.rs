//! `std::io` adapters over a cell pointer.
//!
//! Typed `get`/`put` stream a value's bytes through these one cell at a
//! time. The reader stops at a fixed limit (one trip round the 16-bit
//! address space for typed `get`) so decoding garbage can't loop forever;
//! the writer goes through [`EeRef::update`](crate::EeRef::update) and skips cells that
//! already hold the right byte.

use std::io;

use crate::hw::EepromHardware;
use crate::ptr::EePtr;

/// Reads cells starting at a pointer.
pub struct CellReader<'a, H: ?Sized> {
    ptr: EePtr<'a, H>,
    remaining: usize,
}

impl<'a, H: EepromHardware + ?Sized> CellReader<'a, H> {
    /// Reader over at most `limit` cells.
    pub fn new(ptr: EePtr<'a, H>, limit: usize) -> Self {
        CellReader { ptr, remaining: limit }
    }

    /// Where the next byte would come from.
    pub fn position(&self) -> EePtr<'a, H> {
        self.ptr
    }
}

impl<H: EepromHardware + ?Sized> io::Read for CellReader<'_, H> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining);
        for slot in &mut buf[..n] {
            *slot = self.ptr.get();
            self.ptr.inc();
        }
        self.remaining -= n;
        Ok(n)
    }
}

/// Writes cells starting at a pointer, skipping unchanged ones.
pub struct CellWriter<'a, H: ?Sized> {
    ptr: EePtr<'a, H>,
    written: usize,
}

impl<'a, H: EepromHardware + ?Sized> CellWriter<'a, H> {
    pub fn new(ptr: EePtr<'a, H>) -> Self {
        CellWriter { ptr, written: 0 }
    }

    pub fn position(&self) -> EePtr<'a, H> {
        self.ptr
    }

    /// Bytes streamed so far, changed or not.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl<H: EepromHardware + ?Sized> io::Write for CellWriter<'_, H> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &b in buf {
            self.ptr.update(b);
            self.ptr.inc();
        }
        self.written += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
