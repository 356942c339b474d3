//! Byte cell handle.
//!
//! [`EeRef`] stands in for one byte of EEPROM the way `&mut u8` stands in for
//! a byte of RAM. It holds only the address; every read and write goes to
//! the hardware, so a handle is never stale.
//!
//! Compound assignment (`+=`, `^=`, `<<=`, ...) is read-modify-write: one
//! read, one unconditional write, even when the result equals the old value.
//! Use [`EeRef::update`] when skipping redundant writes matters.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{
    AddAssign, BitAndAssign, BitOrAssign, BitXorAssign, DivAssign, MulAssign, RemAssign, ShlAssign,
    ShrAssign, SubAssign,
};

use crate::bit::{BitIter, EeBit};
use crate::hw::EepromHardware;
use crate::ptr::EePtr;

/// Reference to a single EEPROM cell.
pub struct EeRef<'a, H: ?Sized> {
    hw: &'a H,
    pub(crate) index: u16,
}

impl<'a, H: EepromHardware + ?Sized> EeRef<'a, H> {
    pub fn new(hw: &'a H, index: u16) -> Self {
        EeRef { hw, index }
    }

    /// Address of the referenced cell.
    #[inline]
    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn hardware(&self) -> &'a H {
        self.hw
    }

    /// Current cell contents.
    #[inline]
    pub fn get(&self) -> u8 {
        self.hw.read_byte(self.index)
    }

    /// Unconditional write.
    #[inline]
    pub fn set(&mut self, value: u8) -> &mut Self {
        self.hw.write_byte(self.index, value);
        self
    }

    /// Copy the contents of another cell into this one.
    pub fn assign_from(&mut self, other: &EeRef<'_, H>) -> &mut Self {
        let v = other.get();
        self.set(v)
    }

    /// Write only if `value` differs from what is stored.
    pub fn update(&mut self, value: u8) -> &mut Self {
        if value != self.get() {
            self.set(value);
        }
        self
    }

    /// Read, apply `f`, write back.
    pub fn modify(&mut self, f: impl FnOnce(u8) -> u8) -> &mut Self {
        let v = f(self.get());
        self.set(v)
    }

    /// Prefix `++`.
    pub fn increment(&mut self) -> &mut Self {
        *self += 1;
        self
    }

    /// Prefix `--`.
    pub fn decrement(&mut self) -> &mut Self {
        *self -= 1;
        self
    }

    /// Postfix `++`: returns the value before the increment.
    pub fn post_increment(&mut self) -> u8 {
        let ret = self.get();
        self.increment();
        ret
    }

    /// Postfix `--`: returns the value before the decrement.
    pub fn post_decrement(&mut self) -> u8 {
        let ret = self.get();
        self.decrement();
        ret
    }

    /// Handle to bit `bidx` (0–7) of this cell.
    pub fn bit(&self, bidx: u8) -> EeBit<'a, H> {
        EeBit::new(self.hw, self.index, bidx)
    }

    /// Bit 0 of this cell.
    pub fn bits_begin(&self) -> EeBit<'a, H> {
        EeBit::new(self.hw, self.index, 0)
    }

    /// One past bit 7: bit 0 of the next cell.
    pub fn bits_end(&self) -> EeBit<'a, H> {
        EeBit::new(self.hw, self.index.wrapping_add(1), 0)
    }

    /// The 8 bits of this cell, LSB first.
    pub fn bits(&self) -> BitIter<'a, H> {
        BitIter::new(self.bits_begin(), self.bits_end())
    }

    /// Address-of: a pointer positioned at this cell.
    pub fn ptr(&self) -> EePtr<'a, H> {
        EePtr::new(self.hw, self.index)
    }
}

impl<H: ?Sized> Clone for EeRef<'_, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H: ?Sized> Copy for EeRef<'_, H> {}

impl<H: ?Sized> PartialEq for EeRef<'_, H> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<H: ?Sized> Eq for EeRef<'_, H> {}

impl<H: ?Sized> PartialOrd for EeRef<'_, H> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<H: ?Sized> Ord for EeRef<'_, H> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl<H: ?Sized> fmt::Debug for EeRef<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EeRef(0x{:04X})", self.index)
    }
}

impl<H: EepromHardware + ?Sized> From<EeRef<'_, H>> for u8 {
    fn from(cell: EeRef<'_, H>) -> u8 {
        cell.get()
    }
}

macro_rules! compound_op {
    ($trait:ident, $method:ident, |$v:ident, $rhs:ident| $body:expr) => {
        impl<H: EepromHardware + ?Sized> $trait<u8> for EeRef<'_, H> {
            fn $method(&mut self, $rhs: u8) {
                self.modify(|$v| $body);
            }
        }
    };
}

// Arithmetic truncates to 8 bits like the register does. Division or
// remainder by zero panics, same as for a plain u8.
compound_op!(AddAssign, add_assign, |v, rhs| v.wrapping_add(rhs));
compound_op!(SubAssign, sub_assign, |v, rhs| v.wrapping_sub(rhs));
compound_op!(MulAssign, mul_assign, |v, rhs| v.wrapping_mul(rhs));
compound_op!(DivAssign, div_assign, |v, rhs| v / rhs);
compound_op!(RemAssign, rem_assign, |v, rhs| v % rhs);
compound_op!(BitXorAssign, bitxor_assign, |v, rhs| v ^ rhs);
compound_op!(BitAndAssign, bitand_assign, |v, rhs| v & rhs);
compound_op!(BitOrAssign, bitor_assign, |v, rhs| v | rhs);
// Shifting out all 8 bits leaves 0.
compound_op!(ShlAssign, shl_assign, |v, rhs| v.checked_shl(rhs as u32).unwrap_or(0));
compound_op!(ShrAssign, shr_assign, |v, rhs| v.checked_shr(rhs as u32).unwrap_or(0));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimEeprom;

    #[test]
    fn test_set_get() {
        let sim = SimEeprom::new();
        let mut c = EeRef::new(&sim, 10);
        assert_eq!(c.get(), 0xFF);
        c.set(0x42);
        assert_eq!(c.get(), 0x42);
        assert_eq!(u8::from(c), 0x42);
    }

    #[test]
    fn test_update_skips_equal_value() {
        let sim = SimEeprom::new();
        let mut c = EeRef::new(&sim, 3);
        c.set(7);
        sim.reset_counters();

        c.update(7);
        assert_eq!(sim.writes(), 0);
        assert_eq!(sim.reads(), 1);

        c.update(8);
        assert_eq!(sim.writes(), 1);
        assert_eq!(c.get(), 8);
    }

    #[test]
    fn test_compound_ops_always_write() {
        let sim = SimEeprom::new();
        let mut c = EeRef::new(&sim, 0);
        c.set(0x0F);
        sim.reset_counters();

        c |= 0x0F; // value unchanged
        assert_eq!(sim.reads(), 1);
        assert_eq!(sim.writes(), 1);

        c ^= 0xFF;
        assert_eq!(sim.reads(), 2);
        assert_eq!(sim.writes(), 2);
        assert_eq!(c.get(), 0xF0);
    }

    #[test]
    fn test_arithmetic_wraps() {
        let sim = SimEeprom::new();
        let mut c = EeRef::new(&sim, 1);
        c.set(250);
        c += 10;
        assert_eq!(c.get(), 4);
        c -= 5;
        assert_eq!(c.get(), 255);
        c *= 2;
        assert_eq!(c.get(), 254);
        c /= 3;
        assert_eq!(c.get(), 84);
        c %= 10;
        assert_eq!(c.get(), 4);
        c &= 0x06;
        assert_eq!(c.get(), 4);
    }

    #[test]
    fn test_shifts() {
        let sim = SimEeprom::new();
        let mut c = EeRef::new(&sim, 2);
        c.set(0x81);
        c <<= 1;
        assert_eq!(c.get(), 0x02);
        c >>= 1;
        assert_eq!(c.get(), 0x01);
        c <<= 8;
        assert_eq!(c.get(), 0x00);
        c.set(0x80);
        c >>= 12;
        assert_eq!(c.get(), 0x00);
    }

    #[test]
    fn test_increment_decrement() {
        let sim = SimEeprom::new();
        let mut c = EeRef::new(&sim, 5);
        c.set(9);
        assert_eq!(c.increment().get(), 10);
        assert_eq!(c.post_increment(), 10);
        assert_eq!(c.get(), 11);
        assert_eq!(c.decrement().get(), 10);
        assert_eq!(c.post_decrement(), 10);
        assert_eq!(c.get(), 9);

        c.set(0xFF);
        c.increment();
        assert_eq!(c.get(), 0);
    }

    #[test]
    fn test_assign_from_other_cell() {
        let sim = SimEeprom::new();
        let src = EeRef::new(&sim, 0);
        let mut dst = EeRef::new(&sim, 1);
        EeRef::new(&sim, 0).set(0x33);
        dst.assign_from(&src);
        assert_eq!(dst.get(), 0x33);
    }

    #[test]
    fn test_identity_is_address() {
        let sim = SimEeprom::new();
        let a = EeRef::new(&sim, 4);
        let b = EeRef::new(&sim, 4);
        let c = EeRef::new(&sim, 5);
        assert_eq!(a, b);
        assert!(a < c);
        assert_eq!(a.ptr().index(), 4);
        assert_eq!(format!("{:?}", c), "EeRef(0x0005)");
    }
}
