//! EEPROM controller emulation.
//!
//! Register-level model of the AVR EEPROM controller, driven through
//! [`EepromRegisters`] exactly as firmware drives the real one:
//!
//! - EEAR is masked to the address bits the device decodes, so addresses
//!   past `E2END` wrap instead of faulting
//! - EERE copies the addressed cell into EEDR (ignored while busy)
//! - EEPE starts programming only while EEMPE is armed; EEMPE disarms
//!   itself [`MPE_WINDOW`] register accesses after being set
//! - EEPM1:0 selects erase+write, erase-only or write-only
//! - EEPE reads back set for `program_polls` EECR reads after each write

use std::cell::{Cell, RefCell};

use crate::regs::{EepromRegisters, ProgramMode, RegisterMap, EEMPE, EEPE, EEPM0, EEPM1, EERE, EERIE};
use crate::{Device, ERASED};

/// Register accesses EEMPE stays armed for (four CPU cycles on hardware).
pub const MPE_WINDOW: u8 = 4;

pub struct EepromCtrl {
    device: Device,
    map: RegisterMap,
    data: RefCell<Vec<u8>>,
    eecr: Cell<u8>,
    eedr: Cell<u8>,
    eear: Cell<u16>,
    mpe_window: Cell<u8>,
    busy_polls: Cell<u32>,
    /// EECR reads a write stays busy for
    pub program_polls: u32,
    program_cycles: Cell<u64>,
    dirty: Cell<bool>,
    /// Enable debug output (eprintln)
    pub debug: bool,
}

impl EepromCtrl {
    pub fn new(device: Device) -> Self {
        EepromCtrl {
            device,
            map: device.register_map(),
            data: RefCell::new(vec![ERASED; device.eeprom_size()]),
            eecr: Cell::new(0),
            eedr: Cell::new(0),
            eear: Cell::new(0),
            mpe_window: Cell::new(0),
            busy_polls: Cell::new(0),
            program_polls: 0,
            program_cycles: Cell::new(0),
            dirty: Cell::new(false),
            debug: false,
        }
    }

    pub fn with_program_polls(mut self, polls: u32) -> Self {
        self.program_polls = polls;
        self
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Clear the registers. Cell contents survive, as on a real reset.
    pub fn reset(&self) {
        self.eecr.set(0);
        self.eedr.set(0);
        self.eear.set(0);
        self.mpe_window.set(0);
        self.busy_polls.set(0);
    }

    /// Completed programming operations.
    pub fn program_cycles(&self) -> u64 {
        self.program_cycles.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn mark_clean(&self) {
        self.dirty.set(false);
    }

    pub fn save_image(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }

    pub fn load_image(&self, image: &[u8]) {
        let mut data = self.data.borrow_mut();
        let len = image.len().min(data.len());
        data[..len].copy_from_slice(&image[..len]);
        self.dirty.set(false);
    }

    fn busy(&self) -> bool {
        self.busy_polls.get() > 0
    }

    fn cell_addr(&self) -> usize {
        (self.eear.get() & self.device.address_mask()) as usize
    }

    /// Count one register access against the EEMPE window.
    fn tick_mpe(&self) {
        let w = self.mpe_window.get();
        if w > 0 {
            self.mpe_window.set(w - 1);
            if w == 1 {
                self.eecr.set(self.eecr.get() & !EEMPE);
            }
        }
    }

    fn start_program(&self, eecr: u8) -> bool {
        let addr = self.cell_addr();
        let mode = match ProgramMode::from_eecr(eecr) {
            Some(m) => m,
            None => {
                if self.debug {
                    eprintln!("[EEPROM] reserved EEPM mode, write to 0x{:04X} ignored", addr);
                }
                return false;
            }
        };
        let mut data = self.data.borrow_mut();
        let eedr = self.eedr.get();
        let old = data[addr];
        data[addr] = match mode {
            ProgramMode::EraseWrite => eedr,
            ProgramMode::EraseOnly => ERASED,
            // Programming can only pull bits to 0.
            ProgramMode::WriteOnly => old & eedr,
        };
        self.program_cycles.set(self.program_cycles.get() + 1);
        self.dirty.set(true);
        self.busy_polls.set(self.program_polls);
        true
    }

    fn write_eecr(&self, value: u8) {
        let busy = self.busy();
        let armed = self.eecr.get() & EEMPE != 0 && self.mpe_window.get() > 0;
        let mut eecr = (self.eecr.get() & !EERIE) | (value & EERIE);
        if !busy {
            eecr = (eecr & !(EEPM1 | EEPM0)) | (value & (EEPM1 | EEPM0));
        }

        if value & EEPE != 0 {
            if armed && !busy {
                if self.start_program(eecr) && self.program_polls > 0 {
                    eecr |= EEPE;
                }
            } else if self.debug {
                eprintln!("[EEPROM] EEPE ignored (armed={} busy={})", armed, busy);
            }
            eecr &= !EEMPE;
            self.mpe_window.set(0);
        } else if value & EEMPE != 0 {
            self.eecr.set(eecr | EEMPE);
            self.mpe_window.set(MPE_WINDOW);
            return;
        } else {
            eecr &= !EEMPE;
            self.mpe_window.set(0);
        }

        if value & EERE != 0 {
            if busy {
                if self.debug {
                    eprintln!("[EEPROM] EERE ignored while programming");
                }
            } else {
                let v = self.data.borrow()[self.cell_addr()];
                self.eedr.set(v);
            }
        }
        self.eecr.set(eecr);
    }

    fn read_eecr(&self) -> u8 {
        let v = self.eecr.get();
        let left = self.busy_polls.get();
        if left > 0 {
            self.busy_polls.set(left - 1);
            if left == 1 {
                self.eecr.set(self.eecr.get() & !EEPE);
            }
        }
        v
    }
}

impl EepromRegisters for EepromCtrl {
    fn read_reg(&self, addr: u16) -> u8 {
        let v = if addr == self.map.eecr {
            self.read_eecr()
        } else if addr == self.map.eedr {
            self.eedr.get()
        } else if addr == self.map.eearl {
            self.eear.get() as u8
        } else if addr == self.map.eearh {
            (self.eear.get() >> 8) as u8
        } else {
            0
        };
        self.tick_mpe();
        v
    }

    fn write_reg(&self, addr: u16, value: u8) {
        if addr == self.map.eecr {
            let arming = value & EEMPE != 0 && value & EEPE == 0;
            self.write_eecr(value);
            if arming {
                return;
            }
        } else if addr == self.map.eedr {
            self.eedr.set(value);
        } else if addr == self.map.eearl {
            self.eear.set((self.eear.get() & 0xFF00) | value as u16);
        } else if addr == self.map.eearh {
            self.eear.set((self.eear.get() & 0x00FF) | ((value as u16) << 8));
        }
        self.tick_mpe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::EepromHardware;
    use crate::regs::RegisterEeprom;

    fn arm_and_write(ctrl: &EepromCtrl, addr: u16, value: u8, eepm: u8) {
        ctrl.write_reg(0x42, (addr >> 8) as u8);
        ctrl.write_reg(0x41, addr as u8);
        ctrl.write_reg(0x40, value);
        ctrl.write_reg(0x3F, eepm | EEMPE);
        ctrl.write_reg(0x3F, eepm | EEMPE | EEPE);
    }

    #[test]
    fn test_driver_round_trip() {
        let hw = RegisterEeprom::new(EepromCtrl::new(Device::Atmega32u4), Device::Atmega32u4);
        hw.write_byte(0x0200, 0x77);
        assert_eq!(hw.read_byte(0x0200), 0x77);
        assert_eq!(hw.read_byte(0x0201), 0xFF);
        assert_eq!(hw.registers().program_cycles(), 1);
        assert!(hw.registers().is_dirty());
    }

    #[test]
    fn test_eepe_needs_eempe() {
        let ctrl = EepromCtrl::new(Device::Atmega32u4);
        ctrl.write_reg(0x40, 0x12);
        ctrl.write_reg(0x3F, EEPE);
        assert_eq!(ctrl.program_cycles(), 0);
        assert_eq!(ctrl.save_image()[0], 0xFF);
    }

    #[test]
    fn test_eempe_window_expires() {
        let ctrl = EepromCtrl::new(Device::Atmega32u4);
        ctrl.write_reg(0x40, 0x12);
        ctrl.write_reg(0x3F, EEMPE);
        for _ in 0..MPE_WINDOW {
            ctrl.read_reg(0x40);
        }
        assert_eq!(ctrl.read_reg(0x3F) & EEMPE, 0);
        ctrl.write_reg(0x3F, EEPE);
        assert_eq!(ctrl.program_cycles(), 0);

        arm_and_write(&ctrl, 0, 0x12, 0);
        assert_eq!(ctrl.program_cycles(), 1);
        assert_eq!(ctrl.save_image()[0], 0x12);
    }

    #[test]
    fn test_programming_modes() {
        let ctrl = EepromCtrl::new(Device::Atmega328p);
        arm_and_write(&ctrl, 5, 0b1100_1100, 0);
        arm_and_write(&ctrl, 5, 0b1010_1010, EEPM1);
        assert_eq!(ctrl.save_image()[5], 0b1000_1000);
        arm_and_write(&ctrl, 5, 0x00, EEPM0);
        assert_eq!(ctrl.save_image()[5], 0xFF);
        arm_and_write(&ctrl, 5, 0x00, EEPM1 | EEPM0);
        assert_eq!(ctrl.save_image()[5], 0xFF);
        assert_eq!(ctrl.program_cycles(), 3);
    }

    #[test]
    fn test_driver_program_modes() {
        let hw = RegisterEeprom::new(EepromCtrl::new(Device::Atmega32u4), Device::Atmega32u4);
        hw.write_byte(9, 0x0F);
        hw.program(9, 0x3C, ProgramMode::WriteOnly);
        assert_eq!(hw.read_byte(9), 0x0C);
        hw.erase(9);
        assert_eq!(hw.read_byte(9), 0xFF);
    }

    #[test]
    fn test_busy_polls() {
        let ctrl = EepromCtrl::new(Device::Atmega32u4).with_program_polls(3);
        let hw = RegisterEeprom::new(&ctrl, Device::Atmega32u4);
        hw.write_byte(1, 1);
        assert!(!hw.is_ready());
        assert!(!hw.is_ready());
        assert!(!hw.is_ready());
        assert!(hw.is_ready());

        // The driver waits out the busy time on its own.
        hw.write_byte(2, 2);
        assert_eq!(hw.read_byte(2), 2);
        assert!(hw.is_ready());
    }

    #[test]
    fn test_eere_ignored_while_busy() {
        let ctrl = EepromCtrl::new(Device::Atmega32u4).with_program_polls(2);
        arm_and_write(&ctrl, 0, 0x44, 0);
        ctrl.write_reg(0x40, 0x99);
        ctrl.write_reg(0x3F, EERE);
        assert_eq!(ctrl.read_reg(0x40), 0x99);
        ctrl.read_reg(0x3F);
        ctrl.read_reg(0x3F);
        ctrl.write_reg(0x3F, EERE);
        assert_eq!(ctrl.read_reg(0x40), 0x44);
    }

    #[test]
    fn test_address_wraps() {
        let hw = RegisterEeprom::new(EepromCtrl::new(Device::Attiny85), Device::Attiny85);
        hw.write_byte(0x0203, 0xAA);
        assert_eq!(hw.read_byte(0x0003), 0xAA);
        assert_eq!(hw.registers().save_image().len(), 512);
    }

    #[test]
    fn test_reset_keeps_data() {
        let ctrl = EepromCtrl::new(Device::Atmega32u4);
        arm_and_write(&ctrl, 7, 0x21, 0);
        ctrl.reset();
        assert_eq!(ctrl.read_reg(0x41), 0);
        assert_eq!(ctrl.save_image()[7], 0x21);
        ctrl.mark_clean();
        assert!(!ctrl.is_dirty());
        ctrl.load_image(&[0; 8]);
        assert_eq!(ctrl.save_image()[7], 0);
    }
}
