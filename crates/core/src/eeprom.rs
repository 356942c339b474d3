//! Whole-device facade.
//!
//! [`Eeprom`] owns the hardware handle and nothing else. All of its methods
//! are thin wrappers over [`EeRef`], [`EeBit`] and [`EePtr`]; the only
//! logic of its own is the typed `get`/`put` streaming and the
//! NUL-terminated string protocol.
//!
//! Typed values are streamed in their bincode encoding (fixed-width
//! integers, little-endian). For plain fixed-size types that is exactly the
//! packed little-endian byte image AVR firmware would store.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::bit::EeBit;
use crate::cell::EeRef;
use crate::hw::EepromHardware;
use crate::ptr::{EePtr, EeRange, RangeIter};
use crate::stream::{CellReader, CellWriter};

/// Cells a `u16` pointer can reach before it comes back to where it started.
const ADDRESS_SPACE: usize = 0x1_0000;

/// How [`Eeprom::get_string`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEnd {
    /// Hit a zero byte.
    Terminated,
    /// Ran off the end of the device without finding a terminator.
    EndOfStorage,
}

/// The EEPROM address space `[0, length)`.
pub struct Eeprom<H> {
    hw: H,
}

impl<H: EepromHardware> Eeprom<H> {
    pub fn new(hw: H) -> Self {
        Eeprom { hw }
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn into_inner(self) -> H {
        self.hw
    }

    /// Number of cells (`E2END + 1`).
    pub fn length(&self) -> u16 {
        self.hw.last_address().wrapping_add(1)
    }

    pub fn begin(&self) -> EePtr<'_, H> {
        EePtr::new(&self.hw, 0)
    }

    /// One past the last cell. Not itself readable.
    pub fn end(&self) -> EePtr<'_, H> {
        EePtr::new(&self.hw, self.length())
    }

    pub fn ptr(&self, addr: u16) -> EePtr<'_, H> {
        EePtr::new(&self.hw, addr)
    }

    /// `EEPROM[addr]`
    pub fn at(&self, addr: u16) -> EeRef<'_, H> {
        EeRef::new(&self.hw, addr)
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.at(addr).get()
    }

    pub fn write(&self, addr: u16, value: u8) {
        self.at(addr).set(value);
    }

    /// Write only if the stored byte differs.
    pub fn update(&self, addr: u16, value: u8) {
        self.at(addr).update(value);
    }

    pub fn bit(&self, addr: u16, bidx: u8) -> EeBit<'_, H> {
        self.at(addr).bit(bidx)
    }

    pub fn read_bit(&self, addr: u16, bidx: u8) -> bool {
        self.bit(addr, bidx).get()
    }

    pub fn write_bit(&self, addr: u16, bidx: u8, value: bool) {
        self.bit(addr, bidx).assign(value);
    }

    /// Whether the device will accept another write right now. Advisory:
    /// nothing in this crate waits on it.
    pub fn ready(&self) -> bool {
        self.hw.is_ready()
    }

    /// The region `[ptr, ptr + length)`.
    pub fn iterate<'a>(&'a self, ptr: EePtr<'a, H>, length: u16) -> EeRange<'a, H> {
        EeRange::new(ptr, length)
    }

    /// The region a typed value occupies when stored at `ptr`.
    pub fn iterate_for<'a, T: Serialize + ?Sized>(&'a self, ptr: EePtr<'a, H>, value: &T) -> Result<EeRange<'a, H>, String> {
        let size = bincode::serialized_size(value)
            .map_err(|e| format!("Size error: {}", e))?;
        let length = u16::try_from(size)
            .map_err(|_| format!("Value too large for EEPROM: {} bytes", size))?;
        Ok(EeRange::new(ptr, length))
    }

    /// Every cell of the device.
    pub fn iter(&self) -> RangeIter<'_, H> {
        RangeIter::new(self.begin(), self.end())
    }

    /// Read a typed value stored at `ptr`. The pointer wraps like it does
    /// for `put`; only a decode that would cover the whole 16-bit address
    /// space is cut short.
    pub fn get<T: DeserializeOwned>(&self, ptr: EePtr<'_, H>) -> Result<T, String> {
        let reader = CellReader::new(ptr, ADDRESS_SPACE);
        bincode::deserialize_from(reader)
            .map_err(|e| format!("Decode error at 0x{:04X}: {}", ptr.index(), e))
    }

    /// Read a typed value into `out`, returning it for chaining.
    pub fn get_into<'v, T: DeserializeOwned>(&self, ptr: EePtr<'_, H>, out: &'v mut T) -> Result<&'v mut T, String> {
        *out = self.get(ptr)?;
        Ok(out)
    }

    /// Store a typed value at `ptr`. Cells that already hold the right byte
    /// are not rewritten.
    pub fn put<'v, T: Serialize + ?Sized>(&self, ptr: EePtr<'_, H>, value: &'v T) -> Result<&'v T, String> {
        let mut writer = CellWriter::new(ptr);
        bincode::serialize_into(&mut writer, value)
            .map_err(|e| format!("Encode error at 0x{:04X}: {}", ptr.index(), e))?;
        Ok(value)
    }

    /// Read a NUL-terminated string into `out` (cleared first). Stops at the
    /// first zero byte or at the end of the device, whichever comes first.
    /// Bytes that are not valid UTF-8 come back as U+FFFD.
    pub fn get_string(&self, ptr: EePtr<'_, H>, out: &mut String) -> StringEnd {
        let end = self.length();
        let mut p = ptr;
        let mut bytes = Vec::new();
        let result = loop {
            if p.index() >= end {
                break StringEnd::EndOfStorage;
            }
            let b = p.get();
            if b == 0 {
                break StringEnd::Terminated;
            }
            bytes.push(b);
            p.inc();
        };
        out.clear();
        out.push_str(&String::from_utf8_lossy(&bytes));
        result
    }

    /// Store `s` followed by a zero byte. Returns the number of bytes
    /// covered (`s.len() + 1`). An embedded NUL in `s` ends the string early
    /// on the next read.
    pub fn put_string(&self, ptr: EePtr<'_, H>, s: &str) -> usize {
        let mut p = ptr;
        for &b in s.as_bytes().iter().chain(std::iter::once(&0u8)) {
            p.update(b);
            p.inc();
        }
        s.len() + 1
    }
}

impl<'a, H: EepromHardware> IntoIterator for &'a Eeprom<H> {
    type Item = EeRef<'a, H>;
    type IntoIter = RangeIter<'a, H>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
