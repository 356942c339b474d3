//! EEPROM state files.
//!
//! Captures a device's contents (plus its wear counter) using bincode
//! serialization with deflate compression, so a simulated EEPROM can be
//! persisted between runs.
//!
//! ## File format
//!
//! ```text
//! +------------------+
//! | Magic "AEEP"     |  4 bytes
//! +------------------+
//! | Format version   |  u32 little-endian (currently 1)
//! +------------------+
//! | Device           |  u8 (see Device::to_byte)
//! +------------------+
//! | Compressed data  |  deflate-compressed bincode payload
//! +------------------+
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::peripherals::EepromCtrl;
use crate::sim::SimEeprom;
use crate::Device;

/// Magic bytes identifying an EEPROM state file.
const MAGIC: &[u8; 4] = b"AEEP";
/// Current state file format version.
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EepromState {
    pub device: Device,
    pub data: Vec<u8>,
    /// Physical writes (or program cycles) performed so far
    pub write_count: u64,
}

impl EepromState {
    pub fn capture(sim: &SimEeprom) -> Self {
        EepromState { device: sim.device(), data: sim.save_image(), write_count: sim.writes() }
    }

    pub fn capture_ctrl(ctrl: &EepromCtrl) -> Self {
        EepromState { device: ctrl.device(), data: ctrl.save_image(), write_count: ctrl.program_cycles() }
    }

    /// Fresh simulated device holding this state's contents. Counters
    /// start from zero.
    pub fn restore(&self) -> SimEeprom {
        let sim = SimEeprom::with_device(self.device);
        sim.load_image(&self.data);
        sim
    }
}

/// Encode with header and deflate compression.
pub fn save_to_bytes(state: &EepromState) -> Result<Vec<u8>, String> {
    let payload = bincode::serialize(state)
        .map_err(|e| format!("Serialize error: {}", e))?;

    let compressed = miniz_oxide::deflate::compress_to_vec(&payload, 6);

    let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.push(state.device.to_byte());
    out.extend_from_slice(&compressed);
    Ok(out)
}

/// Decode, verifying magic, version and (optionally) the device.
pub fn load_from_bytes(data: &[u8], expected: Option<Device>) -> Result<EepromState, String> {
    if data.len() < HEADER_LEN {
        return Err("File too small".into());
    }
    if &data[0..4] != MAGIC {
        return Err("Invalid EEPROM state file (bad magic)".into());
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != FORMAT_VERSION {
        return Err(format!("Unsupported state version {} (expected {})",
            version, FORMAT_VERSION));
    }
    let device = Device::from_byte(data[8])
        .ok_or_else(|| format!("Unknown device tag {}", data[8]))?;
    if let Some(want) = expected {
        if device != want {
            return Err(format!("Device mismatch: file={} current={}", device.name(), want.name()));
        }
    }

    let decompressed = miniz_oxide::inflate::decompress_to_vec(&data[HEADER_LEN..])
        .map_err(|e| format!("Decompress error: {:?}", e))?;

    let state: EepromState = bincode::deserialize(&decompressed)
        .map_err(|e| format!("Deserialize error: {}", e))?;
    if state.device != device {
        return Err("Header and payload disagree on device".into());
    }
    if state.data.len() != device.eeprom_size() {
        return Err(format!("Image is {} bytes, {} has {}",
            state.data.len(), device.name(), device.eeprom_size()));
    }
    Ok(state)
}

pub fn save_to_file(state: &EepromState, path: &Path) -> Result<(), String> {
    let out = save_to_bytes(state)?;
    std::fs::write(path, &out)
        .map_err(|e| format!("Write error: {}", e))
}

pub fn load_from_file(path: &Path, expected: Option<Device>) -> Result<EepromState, String> {
    let data = std::fs::read(path)
        .map_err(|e| format!("Read error: {}", e))?;
    load_from_bytes(&data, expected)
}
