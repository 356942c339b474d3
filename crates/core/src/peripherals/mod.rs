//! On-chip peripheral models.
//!
//! - [`EepromCtrl`] — EEPROM controller behind EECR/EEDR/EEARL/EEARH

mod eeprom;

pub use eeprom::EepromCtrl;
