//! Single-bit handle.
//!
//! [`EeBit`] is a cell handle plus a one-hot mask. Reading masks one cell
//! read; assigning is a read-modify-write through the cell, so every
//! assignment costs one physical write whatever the bit held before.
//!
//! Stepping past bit 7 moves to bit 0 of the next address (and back from
//! bit 0 to bit 7 of the previous one), which lets a pair of handles bound
//! an arbitrary run of bits.

use std::fmt;

use crate::cell::EeRef;
use crate::hw::EepromHardware;

/// Reference to one bit of an EEPROM cell.
pub struct EeBit<'a, H: ?Sized> {
    pub(crate) cell: EeRef<'a, H>,
    mask: u8,
}

impl<'a, H: EepromHardware + ?Sized> EeBit<'a, H> {
    /// Bit `bidx` of the cell at `index`. Only the low 3 bits of `bidx`
    /// are used, so the mask always has exactly one bit set.
    pub fn new(hw: &'a H, index: u16, bidx: u8) -> Self {
        EeBit { cell: EeRef::new(hw, index), mask: 1 << (bidx & 0x07) }
    }

    /// The underlying cell.
    pub fn cell(&self) -> EeRef<'a, H> {
        self.cell
    }

    pub fn index(&self) -> u16 {
        self.cell.index
    }

    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// Bit position within the cell (0–7).
    pub fn bit_index(&self) -> u8 {
        self.mask.trailing_zeros() as u8
    }

    /// Move to another bit of the same cell.
    pub fn set_index(&mut self, bidx: u8) -> &mut Self {
        self.mask = 1 << (bidx & 0x07);
        self
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.cell.get() & self.mask != 0
    }

    pub fn assign(&mut self, value: bool) -> &mut Self {
        if value {
            self.cell |= self.mask;
        } else {
            self.cell &= !self.mask;
        }
        self
    }

    /// Copy the value of another bit into this one.
    pub fn assign_from(&mut self, other: &EeBit<'_, H>) -> &mut Self {
        let v = other.get();
        self.assign(v)
    }

    pub fn set(&mut self) -> &mut Self {
        self.assign(true)
    }

    pub fn clear(&mut self) -> &mut Self {
        self.assign(false)
    }

    /// Prefix `++`.
    pub fn next_bit(&mut self) -> &mut Self {
        if self.mask & 0x80 != 0 {
            self.cell.index = self.cell.index.wrapping_add(1);
            self.mask = 0x01;
        } else {
            self.mask <<= 1;
        }
        self
    }

    /// Prefix `--`.
    pub fn prev_bit(&mut self) -> &mut Self {
        if self.mask & 0x01 != 0 {
            self.cell.index = self.cell.index.wrapping_sub(1);
            self.mask = 0x80;
        } else {
            self.mask >>= 1;
        }
        self
    }

    /// Postfix `++`: returns the handle before stepping.
    pub fn post_next(&mut self) -> Self {
        let cpy = *self;
        self.next_bit();
        cpy
    }

    /// Postfix `--`: returns the handle before stepping.
    pub fn post_prev(&mut self) -> Self {
        let cpy = *self;
        self.prev_bit();
        cpy
    }

    /// Absolute bit position, used for range length. 19 bits wide.
    fn position(&self) -> u32 {
        (self.cell.index as u32) * 8 + self.mask.trailing_zeros()
    }
}

impl<H: ?Sized> Clone for EeBit<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H: ?Sized> Copy for EeBit<'_, H> {}

impl<H: ?Sized> PartialEq for EeBit<'_, H> {
    fn eq(&self, other: &Self) -> bool {
        self.mask == other.mask && self.cell.index == other.cell.index
    }
}

impl<H: ?Sized> Eq for EeBit<'_, H> {}

impl<H: ?Sized> fmt::Debug for EeBit<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EeBit(0x{:04X}:{})", self.cell.index, self.mask.trailing_zeros())
    }
}

impl<H: EepromHardware + ?Sized> From<EeBit<'_, H>> for bool {
    fn from(bit: EeBit<'_, H>) -> bool {
        bit.get()
    }
}

/// Bit positions wrap with the 16-bit cell address.
const BIT_SPACE_MASK: u32 = (1 << 19) - 1;

/// Half-open run of bits `[begin, end)`.
pub struct BitIter<'a, H: ?Sized> {
    cur: EeBit<'a, H>,
    end: EeBit<'a, H>,
}

impl<'a, H: EepromHardware + ?Sized> BitIter<'a, H> {
    pub fn new(begin: EeBit<'a, H>, end: EeBit<'a, H>) -> Self {
        BitIter { cur: begin, end }
    }
}

impl<'a, H: EepromHardware + ?Sized> Iterator for BitIter<'a, H> {
    type Item = EeBit<'a, H>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur == self.end {
            return None;
        }
        Some(self.cur.post_next())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.end.position().wrapping_sub(self.cur.position()) & BIT_SPACE_MASK) as usize;
        (n, Some(n))
    }
}

impl<H: EepromHardware + ?Sized> DoubleEndedIterator for BitIter<'_, H> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.cur == self.end {
            return None;
        }
        self.end.prev_bit();
        Some(self.end)
    }
}

impl<H: EepromHardware + ?Sized> ExactSizeIterator for BitIter<'_, H> {}
