//! Cell pointer and iteration ranges.
//!
//! [`EePtr`] behaves like a raw pointer into EEPROM: it can be moved with
//! `+=`/`-=` or [`inc`](EePtr::inc)/[`dec`](EePtr::dec), and it derefs to the
//! [`EeRef`] at its current address, so cell methods are callable straight
//! through it (`ptr.update(3)`, `*ptr += 1`). Moving it never touches the
//! hardware and is never bounds-checked.
//!
//! [`EeRange`] is a `(start, length)` pair over arbitrary regions, meant for
//! `for` loops and for serialising structured data.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Deref, DerefMut, Sub, SubAssign};

use crate::cell::EeRef;
use crate::hw::EepromHardware;

/// Bidirectional pointer over EEPROM cells.
pub struct EePtr<'a, H: ?Sized> {
    cell: EeRef<'a, H>,
}

impl<'a, H: EepromHardware + ?Sized> EePtr<'a, H> {
    pub fn new(hw: &'a H, index: u16) -> Self {
        EePtr { cell: EeRef::new(hw, index) }
    }

    #[inline]
    pub fn index(&self) -> u16 {
        self.cell.index
    }

    /// Reposition to an absolute address.
    pub fn set_index(&mut self, index: u16) -> &mut Self {
        self.cell.index = index;
        self
    }

    /// Dereference: the cell at the current address.
    pub fn cell(&self) -> EeRef<'a, H> {
        self.cell
    }

    /// `ptr[offset]`
    pub fn at(&self, offset: u16) -> EeRef<'a, H> {
        EeRef::new(self.cell.hardware(), self.cell.index.wrapping_add(offset))
    }

    /// Prefix `++`.
    pub fn inc(&mut self) -> &mut Self {
        self.cell.index = self.cell.index.wrapping_add(1);
        self
    }

    /// Prefix `--`.
    pub fn dec(&mut self) -> &mut Self {
        self.cell.index = self.cell.index.wrapping_sub(1);
        self
    }

    /// Postfix `++`: returns the pointer before moving.
    pub fn post_inc(&mut self) -> Self {
        let old = *self;
        self.inc();
        old
    }

    /// Postfix `--`: returns the pointer before moving.
    pub fn post_dec(&mut self) -> Self {
        let old = *self;
        self.dec();
        old
    }
}

impl<'a, H: ?Sized> Deref for EePtr<'a, H> {
    type Target = EeRef<'a, H>;

    fn deref(&self) -> &Self::Target {
        &self.cell
    }
}

impl<H: ?Sized> DerefMut for EePtr<'_, H> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.cell
    }
}

impl<H: ?Sized> Clone for EePtr<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H: ?Sized> Copy for EePtr<'_, H> {}

impl<H: ?Sized> PartialEq for EePtr<'_, H> {
    fn eq(&self, other: &Self) -> bool {
        self.cell.index == other.cell.index
    }
}

impl<H: ?Sized> Eq for EePtr<'_, H> {}

impl<H: ?Sized> PartialOrd for EePtr<'_, H> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<H: ?Sized> Ord for EePtr<'_, H> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cell.index.cmp(&other.cell.index)
    }
}

impl<H: ?Sized> fmt::Debug for EePtr<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EePtr(0x{:04X})", self.cell.index)
    }
}

impl<H: ?Sized> From<EePtr<'_, H>> for u16 {
    fn from(ptr: EePtr<'_, H>) -> u16 {
        ptr.cell.index
    }
}

impl<H: EepromHardware + ?Sized> AddAssign<u16> for EePtr<'_, H> {
    fn add_assign(&mut self, n: u16) {
        self.cell.index = self.cell.index.wrapping_add(n);
    }
}

impl<H: EepromHardware + ?Sized> SubAssign<u16> for EePtr<'_, H> {
    fn sub_assign(&mut self, n: u16) {
        self.cell.index = self.cell.index.wrapping_sub(n);
    }
}

impl<H: EepromHardware + ?Sized> Add<u16> for EePtr<'_, H> {
    type Output = Self;

    fn add(mut self, n: u16) -> Self {
        self += n;
        self
    }
}

impl<H: EepromHardware + ?Sized> Sub<u16> for EePtr<'_, H> {
    type Output = Self;

    fn sub(mut self, n: u16) -> Self {
        self -= n;
        self
    }
}

/// Contiguous region `[start, start + length)`.
pub struct EeRange<'a, H: ?Sized> {
    pub start: EePtr<'a, H>,
    pub length: u16,
}

impl<'a, H: EepromHardware + ?Sized> EeRange<'a, H> {
    pub fn new(start: EePtr<'a, H>, length: u16) -> Self {
        EeRange { start, length }
    }

    pub fn begin(&self) -> EePtr<'a, H> {
        self.start
    }

    /// One past the last cell; a loop bound, not a cell to read.
    pub fn end(&self) -> EePtr<'a, H> {
        self.start + self.length
    }

    pub fn len(&self) -> usize {
        self.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn iter(&self) -> RangeIter<'a, H> {
        RangeIter { cur: self.begin(), end: self.end() }
    }
}

impl<H: ?Sized> Clone for EeRange<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H: ?Sized> Copy for EeRange<'_, H> {}

impl<H: ?Sized> fmt::Debug for EeRange<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EeRange(0x{:04X}, {})", self.start.cell.index, self.length)
    }
}

impl<'a, H: EepromHardware + ?Sized> IntoIterator for EeRange<'a, H> {
    type Item = EeRef<'a, H>;
    type IntoIter = RangeIter<'a, H>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Walks a pointer from `begin` to `end`, yielding each cell.
pub struct RangeIter<'a, H: ?Sized> {
    cur: EePtr<'a, H>,
    end: EePtr<'a, H>,
}

impl<'a, H: EepromHardware + ?Sized> RangeIter<'a, H> {
    pub fn new(begin: EePtr<'a, H>, end: EePtr<'a, H>) -> Self {
        RangeIter { cur: begin, end }
    }
}

impl<'a, H: EepromHardware + ?Sized> Iterator for RangeIter<'a, H> {
    type Item = EeRef<'a, H>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur == self.end {
            return None;
        }
        Some(self.cur.post_inc().cell())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end.index().wrapping_sub(self.cur.index()) as usize;
        (n, Some(n))
    }
}

impl<H: EepromHardware + ?Sized> DoubleEndedIterator for RangeIter<'_, H> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.cur == self.end {
            return None;
        }
        Some(self.end.dec().cell())
    }
}

impl<H: EepromHardware + ?Sized> ExactSizeIterator for RangeIter<'_, H> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimEeprom;

    #[test]
    fn test_pointer_arithmetic() {
        let sim = SimEeprom::new();
        let mut p = EePtr::new(&sim, 10);
        p += 5;
        assert_eq!(p.index(), 15);
        p -= 3;
        assert_eq!(p.index(), 12);
        assert_eq!(p.post_inc().index(), 12);
        assert_eq!(p.index(), 13);
        assert_eq!(p.inc().index(), 14);
        assert_eq!(p.post_dec().index(), 14);
        assert_eq!(p.dec().index(), 12);
        assert_eq!((p + 4).index(), 16);
        assert_eq!((p - 12).index(), 0);
        assert_eq!(u16::from(p), 12);
        p.set_index(700);
        assert_eq!(p.index(), 700);
    }

    #[test]
    fn test_deref_reaches_cell() {
        let sim = SimEeprom::new();
        let mut p = EePtr::new(&sim, 4);
        p.set(1);
        *p += 2;
        assert_eq!(p.get(), 3);
        p.update(3);
        assert_eq!(sim.writes(), 2);
        assert_eq!(p.cell(), EeRef::new(&sim, 4));
        assert_eq!(p.at(2).index(), 6);
    }

    #[test]
    fn test_no_bounds_on_pointer() {
        let sim = SimEeprom::new();
        let mut p = EePtr::new(&sim, 0);
        p.dec();
        assert_eq!(p.index(), 0xFFFF);
        // Reading past the device is left to the hardware.
        assert_eq!(p.get(), 0xFF);
    }

    #[test]
    fn test_range_iteration() {
        let sim = SimEeprom::new();
        let range = EeRange::new(EePtr::new(&sim, 30), 4);
        assert_eq!(range.len(), 4);
        assert_eq!(range.end(), EePtr::new(&sim, 34));
        for (i, mut cell) in range.into_iter().enumerate() {
            cell.set(i as u8);
        }
        let seen: Vec<(u16, u8)> = range.iter().map(|c| (c.index(), c.get())).collect();
        assert_eq!(seen, vec![(30, 0), (31, 1), (32, 2), (33, 3)]);
        let back: Vec<u16> = range.iter().rev().map(|c| c.index()).collect();
        assert_eq!(back, vec![33, 32, 31, 30]);
        assert!(EeRange::new(EePtr::new(&sim, 5), 0).iter().next().is_none());
    }
}
