//! # avr-eeprom
//!
//! Byte- and bit-level access to the on-chip EEPROM of AVR microcontrollers
//! (ATmega32u4, ATmega328P, ATmega2560, ATtiny85) through lightweight proxy
//! handles that read like ordinary memory.
//!
//! ## Architecture
//!
//! - [`EepromHardware`] — The three hardware primitives everything is layered
//!   over: read a byte, write a byte, query the ready flag
//! - [`EeRef`] — Handle to one EEPROM cell (read, write, update, compound ops)
//! - [`EeBit`] — Handle to one bit of a cell, doubling as a bit iterator
//! - [`EePtr`] — Bidirectional pointer over cells, dereferences to [`EeRef`]
//! - [`EeRange`] — An arbitrary `(start, length)` region for ranged loops
//! - [`Eeprom`] — Stateless facade over the whole address space, with typed
//!   `get`/`put` and the NUL-terminated string protocol
//!
//! ## Backends
//!
//! - [`SimEeprom`] — Memory-backed device with read/write counters
//! - [`RegisterEeprom`] — Drives the EECR/EEDR/EEAR register sequence of a
//!   real part over any [`regs::EepromRegisters`] implementation
//! - [`peripherals::EepromCtrl`] — Register-level model of the on-chip
//!   EEPROM controller (EEMPE window, programming modes, busy time)
//!
//! ## Images
//!
//! - [`hex`] — Intel HEX (`.eep`) import/export
//! - [`savestate`] — Compressed EEPROM state files
//! - [`dump`] — Hex + ASCII region dump
//!
//! Every write in this crate is a single synchronous primitive call. Nothing
//! polls [`Eeprom::ready`] on the caller's behalf, and no address is ever
//! range-checked by the proxy layer.

use serde::{Deserialize, Serialize};

pub mod hw;
pub mod cell;
pub mod bit;
pub mod ptr;
pub mod stream;
pub mod eeprom;
pub mod sim;
pub mod regs;
pub mod peripherals;
pub mod hex;
pub mod savestate;
pub mod dump;

pub use hw::EepromHardware;
pub use cell::EeRef;
pub use bit::{BitIter, EeBit};
pub use ptr::{EePtr, EeRange, RangeIter};
pub use eeprom::{Eeprom, StringEnd};
pub use sim::SimEeprom;
pub use regs::RegisterEeprom;

// ATmega32u4 constants
/// EEPROM size: 1 KB
pub const EEPROM_SIZE: usize = 1024;
/// Last valid EEPROM address of the default device
pub const E2END: u16 = (EEPROM_SIZE - 1) as u16;
/// Value of an erased EEPROM cell
pub const ERASED: u8 = 0xFF;

/// Target device. Selects the hardware-defined EEPROM geometry and the
/// data-space location of the EEPROM control registers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    /// ATmega32u4 (Arduboy, Leonardo), 1 KB
    #[default]
    Atmega32u4,
    /// ATmega328P (Arduino Uno, Gamebuino Classic), 1 KB
    Atmega328p,
    /// ATmega2560 (Arduino Mega), 4 KB
    Atmega2560,
    /// ATtiny85, 512 bytes
    Attiny85,
}

impl Device {
    /// Last valid EEPROM address (the avr-libc `E2END` constant).
    pub fn e2end(self) -> u16 {
        match self {
            Device::Atmega32u4 | Device::Atmega328p => 0x03FF,
            Device::Atmega2560 => 0x0FFF,
            Device::Attiny85 => 0x01FF,
        }
    }

    /// Number of addressable cells.
    pub fn eeprom_size(self) -> usize {
        self.e2end() as usize + 1
    }

    /// Bits of EEAR the controller actually decodes. Sizes are powers of
    /// two, so this is also `E2END`.
    pub fn address_mask(self) -> u16 {
        self.e2end()
    }

    /// Data-space addresses of EECR/EEDR/EEARL/EEARH.
    pub fn register_map(self) -> regs::RegisterMap {
        match self {
            Device::Attiny85 => regs::RegisterMap { eecr: 0x3C, eedr: 0x3D, eearl: 0x3E, eearh: 0x3F },
            _ => regs::RegisterMap::ATMEGA,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Device::Atmega32u4 => "ATmega32u4",
            Device::Atmega328p => "ATmega328P",
            Device::Atmega2560 => "ATmega2560",
            Device::Attiny85 => "ATtiny85",
        }
    }

    /// Stable byte tag used in state file headers.
    pub fn to_byte(self) -> u8 {
        match self {
            Device::Atmega32u4 => 0,
            Device::Atmega328p => 1,
            Device::Atmega2560 => 2,
            Device::Attiny85 => 3,
        }
    }

    pub fn from_byte(b: u8) -> Option<Device> {
        match b {
            0 => Some(Device::Atmega32u4),
            1 => Some(Device::Atmega328p),
            2 => Some(Device::Atmega2560),
            3 => Some(Device::Attiny85),
            _ => None,
        }
    }
}
