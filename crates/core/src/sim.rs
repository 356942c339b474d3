//! Memory-backed EEPROM.
//!
//! Behaves like the on-chip array as seen through avr-libc: erased cells read
//! 0xFF, reads past `E2END` return 0xFF and writes past it are dropped. Every
//! primitive call is counted, which is how tests check that `update` skips
//! redundant writes.
//!
//! The ready flag can be made to lag behind writes: with a non-zero write
//! latency, each write leaves the device busy for that many `is_ready`
//! polls.

use std::cell::{Cell, RefCell};

use crate::hw::EepromHardware;
use crate::{Device, ERASED};

pub struct SimEeprom {
    device: Device,
    data: RefCell<Vec<u8>>,
    reads: Cell<u64>,
    writes: Cell<u64>,
    /// `is_ready` polls left before the last write completes
    busy_polls: Cell<u32>,
    /// Polls each write stays busy for
    pub write_latency: u32,
    /// Modified since last load/save
    dirty: Cell<bool>,
    /// Enable debug output (eprintln)
    pub debug: bool,
}

impl SimEeprom {
    /// Erased ATmega32u4 EEPROM.
    pub fn new() -> Self {
        Self::with_device(Device::Atmega32u4)
    }

    pub fn with_device(device: Device) -> Self {
        SimEeprom {
            device,
            data: RefCell::new(vec![ERASED; device.eeprom_size()]),
            reads: Cell::new(0),
            writes: Cell::new(0),
            busy_polls: Cell::new(0),
            write_latency: 0,
            dirty: Cell::new(false),
            debug: false,
        }
    }

    pub fn with_write_latency(mut self, polls: u32) -> Self {
        self.write_latency = polls;
        self
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Primitive reads issued since the last reset.
    pub fn reads(&self) -> u64 {
        self.reads.get()
    }

    /// Primitive writes issued since the last reset, including dropped ones.
    pub fn writes(&self) -> u64 {
        self.writes.get()
    }

    pub fn reset_counters(&self) {
        self.reads.set(0);
        self.writes.set(0);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn mark_clean(&self) {
        self.dirty.set(false);
    }

    /// Copy of the whole array. Does not count as reads.
    pub fn save_image(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }

    /// Replace contents from an image. Shorter images leave the tail
    /// untouched; longer ones are cut to the device size.
    pub fn load_image(&self, image: &[u8]) {
        let mut data = self.data.borrow_mut();
        let len = image.len().min(data.len());
        data[..len].copy_from_slice(&image[..len]);
        self.dirty.set(false);
    }

    /// Reset every cell to 0xFF.
    pub fn erase(&self) {
        self.data.borrow_mut().fill(ERASED);
        self.dirty.set(true);
    }
}

impl Default for SimEeprom {
    fn default() -> Self {
        Self::new()
    }
}

impl EepromHardware for SimEeprom {
    fn read_byte(&self, addr: u16) -> u8 {
        self.reads.set(self.reads.get() + 1);
        match self.data.borrow().get(addr as usize) {
            Some(&v) => v,
            None => {
                if self.debug {
                    eprintln!("[EEPROM] read past E2END at 0x{:04X}", addr);
                }
                ERASED
            }
        }
    }

    fn write_byte(&self, addr: u16, value: u8) {
        self.writes.set(self.writes.get() + 1);
        if self.debug && self.busy_polls.get() > 0 {
            eprintln!("[EEPROM] write to 0x{:04X} while previous write in progress", addr);
        }
        let mut data = self.data.borrow_mut();
        if let Some(cell) = data.get_mut(addr as usize) {
            *cell = value;
            self.dirty.set(true);
        } else if self.debug {
            eprintln!("[EEPROM] write past E2END at 0x{:04X} dropped", addr);
        }
        self.busy_polls.set(self.write_latency);
    }

    fn is_ready(&self) -> bool {
        let left = self.busy_polls.get();
        if left > 0 {
            self.busy_polls.set(left - 1);
            false
        } else {
            true
        }
    }

    fn last_address(&self) -> u16 {
        self.device.e2end()
    }
}
