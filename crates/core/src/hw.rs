//! Hardware primitives.
//!
//! Every proxy operation in this crate bottoms out in exactly one call to
//! one of these. They take `&self` because the EEPROM is a device register
//! file, not Rust-owned memory: handles are freely copied and all of them
//! talk to the same hardware.

/// Byte-level access to an EEPROM address space.
///
/// Implementations decide what happens at addresses past
/// [`last_address`](EepromHardware::last_address); the proxy layer never
/// checks.
pub trait EepromHardware {
    /// Read one byte.
    fn read_byte(&self, addr: u16) -> u8;

    /// Write one byte. Returns as soon as the write has been issued; it may
    /// still be in progress (see [`is_ready`](EepromHardware::is_ready)).
    fn write_byte(&self, addr: u16, value: u8);

    /// True when the device can accept another write.
    fn is_ready(&self) -> bool;

    /// Last valid address (`E2END`).
    fn last_address(&self) -> u16;
}

impl<H: EepromHardware + ?Sized> EepromHardware for &H {
    #[inline]
    fn read_byte(&self, addr: u16) -> u8 {
        (**self).read_byte(addr)
    }

    #[inline]
    fn write_byte(&self, addr: u16, value: u8) {
        (**self).write_byte(addr, value)
    }

    #[inline]
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    #[inline]
    fn last_address(&self) -> u16 {
        (**self).last_address()
    }
}
