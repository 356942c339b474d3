//! EEPROM control registers and the access sequences avr-libc uses.
//!
//! | Register | ATmega (data space) | Content                      |
//! |----------|---------------------|------------------------------|
//! | EECR     | 0x3F                | Control: EERE/EEPE/EEMPE/... |
//! | EEDR     | 0x40                | Data                         |
//! | EEARL    | 0x41                | Address low                  |
//! | EEARH    | 0x42                | Address high                 |
//!
//! A write is only started if EEPE is set while EEMPE is still armed, so the
//! byte write is always the two-step `EECR = EEMPE; EECR |= EEPE`.

use std::hint;

use crate::hw::EepromHardware;
use crate::Device;

// EECR bits
/// Read enable (strobe)
pub const EERE: u8 = 1 << 0;
/// Program enable; reads back 1 while a write is in progress
pub const EEPE: u8 = 1 << 1;
/// Master program enable
pub const EEMPE: u8 = 1 << 2;
/// Ready interrupt enable
pub const EERIE: u8 = 1 << 3;
pub const EEPM0: u8 = 1 << 4;
pub const EEPM1: u8 = 1 << 5;

/// Data-space addresses of the EEPROM registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    pub eecr: u16,
    pub eedr: u16,
    pub eearl: u16,
    pub eearh: u16,
}

impl RegisterMap {
    /// ATmega32u4 / ATmega328P / ATmega2560
    pub const ATMEGA: RegisterMap = RegisterMap { eecr: 0x3F, eedr: 0x40, eearl: 0x41, eearh: 0x42 };
}

/// EEPM1:0 programming mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramMode {
    /// Erase and write in one operation (3.4 ms)
    EraseWrite,
    /// Erase only, cell becomes 0xFF (1.8 ms)
    EraseOnly,
    /// Write only: bits can be cleared, never set (1.8 ms)
    WriteOnly,
}

impl ProgramMode {
    pub fn eepm_bits(self) -> u8 {
        match self {
            ProgramMode::EraseWrite => 0,
            ProgramMode::EraseOnly => EEPM0,
            ProgramMode::WriteOnly => EEPM1,
        }
    }

    /// Decode EEPM1:0 from an EECR value. The fourth encoding is reserved.
    pub fn from_eecr(eecr: u8) -> Option<ProgramMode> {
        match eecr & (EEPM1 | EEPM0) {
            0 => Some(ProgramMode::EraseWrite),
            EEPM0 => Some(ProgramMode::EraseOnly),
            EEPM1 => Some(ProgramMode::WriteOnly),
            _ => None,
        }
    }
}

/// 8-bit register access in the data space.
pub trait EepromRegisters {
    fn read_reg(&self, addr: u16) -> u8;
    fn write_reg(&self, addr: u16, value: u8);
}

impl<R: EepromRegisters + ?Sized> EepromRegisters for &R {
    fn read_reg(&self, addr: u16) -> u8 {
        (**self).read_reg(addr)
    }

    fn write_reg(&self, addr: u16, value: u8) {
        (**self).write_reg(addr, value)
    }
}

/// [`EepromHardware`] on top of the EECR/EEDR/EEAR registers.
///
/// Like `eeprom_read_byte`/`eeprom_write_byte`, both primitives spin until
/// any previous write has finished before touching EEAR.
pub struct RegisterEeprom<R> {
    regs: R,
    map: RegisterMap,
    e2end: u16,
}

impl<R: EepromRegisters> RegisterEeprom<R> {
    pub fn new(regs: R, device: Device) -> Self {
        RegisterEeprom { regs, map: device.register_map(), e2end: device.e2end() }
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn into_registers(self) -> R {
        self.regs
    }

    /// Spin until EEPE clears.
    pub fn wait_ready(&self) {
        while self.regs.read_reg(self.map.eecr) & EEPE != 0 {
            hint::spin_loop();
        }
    }

    fn load_address(&self, addr: u16) {
        self.regs.write_reg(self.map.eearh, (addr >> 8) as u8);
        self.regs.write_reg(self.map.eearl, addr as u8);
    }

    /// Program one cell with an explicit EEPM mode.
    pub fn program(&self, addr: u16, value: u8, mode: ProgramMode) {
        self.wait_ready();
        self.load_address(addr);
        self.regs.write_reg(self.map.eedr, value);
        // EEPM and EEMPE in one write, then set EEPE inside the window.
        self.regs.write_reg(self.map.eecr, mode.eepm_bits() | EEMPE);
        let eecr = self.regs.read_reg(self.map.eecr);
        self.regs.write_reg(self.map.eecr, eecr | EEPE);
    }

    /// Set a cell to 0xFF without writing new data.
    pub fn erase(&self, addr: u16) {
        self.program(addr, 0xFF, ProgramMode::EraseOnly);
    }
}

impl<R: EepromRegisters> EepromHardware for RegisterEeprom<R> {
    fn read_byte(&self, addr: u16) -> u8 {
        self.wait_ready();
        self.load_address(addr);
        let eecr = self.regs.read_reg(self.map.eecr);
        self.regs.write_reg(self.map.eecr, eecr | EERE);
        self.regs.read_reg(self.map.eedr)
    }

    fn write_byte(&self, addr: u16, value: u8) {
        self.program(addr, value, ProgramMode::EraseWrite);
    }

    fn is_ready(&self) -> bool {
        self.regs.read_reg(self.map.eecr) & EEPE == 0
    }

    fn last_address(&self) -> u16 {
        self.e2end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every register access; EEPE never reads back set.
    struct Trace {
        log: RefCell<Vec<(char, u16, u8)>>,
        eedr: u8,
    }

    impl EepromRegisters for Trace {
        fn read_reg(&self, addr: u16) -> u8 {
            let v = if addr == 0x40 { self.eedr } else { 0 };
            self.log.borrow_mut().push(('r', addr, v));
            v
        }

        fn write_reg(&self, addr: u16, value: u8) {
            self.log.borrow_mut().push(('w', addr, value));
        }
    }

    #[test]
    fn test_write_sequence() {
        let hw = RegisterEeprom::new(Trace { log: RefCell::new(Vec::new()), eedr: 0 }, Device::Atmega32u4);
        hw.write_byte(0x0123, 0xAB);
        let log = hw.registers().log.borrow();
        assert_eq!(*log, vec![
            ('r', 0x3F, 0),          // wait for EEPE clear
            ('w', 0x42, 0x01),       // EEARH
            ('w', 0x41, 0x23),       // EEARL
            ('w', 0x40, 0xAB),       // EEDR
            ('w', 0x3F, EEMPE),      // arm
            ('r', 0x3F, 0),
            ('w', 0x3F, EEPE),       // start
        ]);
    }

    #[test]
    fn test_read_sequence() {
        let hw = RegisterEeprom::new(Trace { log: RefCell::new(Vec::new()), eedr: 0x5C }, Device::Atmega328p);
        assert_eq!(hw.read_byte(0x0010), 0x5C);
        let log = hw.registers().log.borrow();
        assert_eq!(log[3], ('r', 0x3F, 0));
        assert_eq!(log[4], ('w', 0x3F, EERE));
        assert_eq!(log[5], ('r', 0x40, 0x5C));
    }

    #[test]
    fn test_mode_bits() {
        assert_eq!(ProgramMode::from_eecr(EEPM0 | EEMPE), Some(ProgramMode::EraseOnly));
        assert_eq!(ProgramMode::from_eecr(EEPM1), Some(ProgramMode::WriteOnly));
        assert_eq!(ProgramMode::from_eecr(EEPM1 | EEPM0), None);
        assert_eq!(ProgramMode::WriteOnly.eepm_bits(), EEPM1);
    }

    #[test]
    fn test_attiny_register_map() {
        let hw = RegisterEeprom::new(Trace { log: RefCell::new(Vec::new()), eedr: 0 }, Device::Attiny85);
        assert!(hw.is_ready());
        hw.write_byte(0x1FF, 1);
        let log = hw.registers().log.borrow();
        assert_eq!(log[2], ('w', 0x3F, 0x01)); // EEARH sits where EECR is on ATmega
        assert_eq!(hw.last_address(), 0x1FF);
    }
}
