//! Hex + ASCII dumps of EEPROM contents.
//!
//! ```text
//! 0010: 68 65 6C 6C 6F 00 FF FF  FF FF FF FF FF FF FF FF  hello...........
//! ```

use crate::eeprom::Eeprom;
use crate::hw::EepromHardware;

const ROW: usize = 16;

/// Dump `length` bytes of an image starting at `start`. Clipped to the
/// image.
pub fn dump_region(image: &[u8], start: u16, length: u16) -> String {
    let start = (start as usize).min(image.len());
    let end = (start + length as usize).min(image.len());
    let mut s = String::new();
    for (n, row) in image[start..end].chunks(ROW).enumerate() {
        push_row(&mut s, start + n * ROW, row);
    }
    s
}

/// Dump a region by reading it through the device, one cell at a time.
/// Every byte shown costs one primitive read.
pub fn dump_eeprom<H: EepromHardware>(ee: &Eeprom<H>, start: u16, length: u16) -> String {
    let length = length.min(ee.length().saturating_sub(start));
    let bytes: Vec<u8> = ee.iterate(ee.ptr(start), length).into_iter().map(|c| c.get()).collect();
    let mut s = String::new();
    for (n, row) in bytes.chunks(ROW).enumerate() {
        push_row(&mut s, start as usize + n * ROW, row);
    }
    s
}

/// List the cells that differ between two images.
pub fn dump_diff(old: &[u8], new: &[u8]) -> String {
    let mut s = String::new();
    for (i, (a, b)) in old.iter().zip(new).enumerate() {
        if a != b {
            s.push_str(&format!("  0x{:04X}: {:02X} -> {:02X}\n", i, a, b));
        }
    }
    if s.is_empty() {
        s.push_str("  (no changes)\n");
    }
    s
}

fn push_row(s: &mut String, addr: usize, row: &[u8]) {
    s.push_str(&format!("{:04X}: ", addr));
    for i in 0..ROW {
        match row.get(i) {
            Some(b) => s.push_str(&format!("{:02X} ", b)),
            None => s.push_str("   "),
        }
        if i == 7 {
            s.push(' ');
        }
    }
    s.push(' ');
    s.extend(row.iter().map(|&c| if (0x20..0x7F).contains(&c) { c as char } else { '.' }));
    s.push('\n');
}
