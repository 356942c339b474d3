//! Intel HEX EEPROM images (`.eep`).
//!
//! `avr-objcopy -j .eeprom -O ihex` produces these from the `.eeprom` section
//! of a firmware ELF, and avrdude reads and writes the same format. Records
//! are `:LLAAAATT[DD...]CC`; types 00 (data), 01 (EOF), 02 (extended
//! segment address) and 04 (extended linear address) are honoured, 03/05
//! (start address) are skipped.

/// Bytes per data record written by [`to_hex`].
pub const RECORD_LEN: usize = 16;

/// Load an Intel HEX string into an EEPROM image.
///
/// Data outside `image` is dropped. Returns one past the highest address
/// written.
pub fn parse_hex(hex: &str, image: &mut [u8]) -> Result<usize, String> {
    let mut max_addr = 0usize;
    let mut base_addr: u32 = 0;

    for (lineno, line) in hex.lines().enumerate() {
        let line = line.trim();
        if !line.starts_with(':') {
            continue;
        }

        let bytes = decode_record(&line[1..])
            .map_err(|e| format!("Line {}: {}", lineno + 1, e))?;
        let byte_count = bytes[0] as usize;
        if bytes.len() != byte_count + 5 {
            return Err(format!("Line {}: length field says {} bytes, record has {}",
                lineno + 1, byte_count, bytes.len() - 5));
        }
        let offset = ((bytes[1] as u32) << 8) | bytes[2] as u32;
        let payload = &bytes[4..4 + byte_count];

        match bytes[3] {
            0x00 => {
                let start = (base_addr + offset) as usize;
                for (i, &b) in payload.iter().enumerate() {
                    if let Some(cell) = image.get_mut(start + i) {
                        *cell = b;
                        max_addr = max_addr.max(start + i + 1);
                    }
                }
            }
            0x01 => break,
            0x02 if byte_count >= 2 => {
                base_addr = (((payload[0] as u32) << 8) | payload[1] as u32) << 4;
            }
            0x04 if byte_count >= 2 => {
                base_addr = (((payload[0] as u32) << 8) | payload[1] as u32) << 16;
            }
            _ => {}
        }
    }

    Ok(max_addr)
}

/// Render an EEPROM image as Intel HEX.
///
/// With `skip_erased`, records made entirely of 0xFF are left out; loading
/// the result over an erased device reproduces the image. Images past
/// 64 KiB get a type 04 record each time the upper address half changes.
pub fn to_hex(image: &[u8], skip_erased: bool) -> String {
    let mut out = String::new();
    let mut upper = 0u16;
    for (n, chunk) in image.chunks(RECORD_LEN).enumerate() {
        if skip_erased && chunk.iter().all(|&b| b == 0xFF) {
            continue;
        }
        let full = n * RECORD_LEN;
        let high = (full >> 16) as u16;
        if high != upper {
            push_record(&mut out, &[0x02, 0x00, 0x00, 0x04, (high >> 8) as u8, high as u8]);
            upper = high;
        }
        let addr = full as u16;
        let mut rec = Vec::with_capacity(chunk.len() + 4);
        rec.push(chunk.len() as u8);
        rec.push((addr >> 8) as u8);
        rec.push(addr as u8);
        rec.push(0x00);
        rec.extend_from_slice(chunk);
        push_record(&mut out, &rec);
    }
    push_record(&mut out, &[0x00, 0x00, 0x00, 0x01]);
    out
}

fn push_record(out: &mut String, rec: &[u8]) {
    let sum = rec.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    out.push(':');
    for b in rec {
        out.push_str(&format!("{:02X}", b));
    }
    out.push_str(&format!("{:02X}\n", sum.wrapping_neg()));
}

/// Decode one record body (after the colon) and verify its checksum.
fn decode_record(body: &str) -> Result<Vec<u8>, String> {
    if body.len() % 2 != 0 {
        return Err("Odd number of hex characters".into());
    }
    let bytes = body.as_bytes()
        .chunks(2)
        .map(|pair| -> Result<u8, String> { Ok((hex_digit(pair[0])? << 4) | hex_digit(pair[1])?) })
        .collect::<Result<Vec<u8>, String>>()?;
    if bytes.len() < 5 {
        return Err("Record too short".into());
    }
    let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    if sum != 0 {
        return Err(format!("Checksum error: sum={:02X}", sum));
    }
    Ok(bytes)
}

fn hex_digit(c: u8) -> Result<u8, String> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(format!("Invalid hex character: {}", c as char)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_eep() {
        // avr-objcopy output for `uint8_t EEMEM x[4] = {1, 2, 3, 4};`
        let eep = ":0400000001020304F2\n:00000001FF\n";
        let mut image = vec![0xFFu8; 1024];
        assert_eq!(parse_hex(eep, &mut image).unwrap(), 4);
        assert_eq!(&image[..5], &[1, 2, 3, 4, 0xFF]);
    }

    #[test]
    fn test_checksum_error() {
        let eep = ":0400000001020304F3\n:00000001FF\n";
        let mut image = vec![0xFFu8; 1024];
        let err = parse_hex(eep, &mut image).unwrap_err();
        assert!(err.starts_with("Line 1: Checksum error"), "{}", err);
    }

    #[test]
    fn test_length_mismatch() {
        let eep = ":0500000001020304F1\n";
        let mut image = vec![0xFFu8; 16];
        assert!(parse_hex(eep, &mut image).is_err());
    }

    #[test]
    fn test_data_past_image_dropped() {
        let eep = ":02000E00AABB8B\n:00000001FF\n";
        let mut image = vec![0u8; 15];
        assert_eq!(parse_hex(eep, &mut image).unwrap(), 15);
        assert_eq!(image[14], 0xAA);
    }

    #[test]
    fn test_export_and_reload() {
        let mut image = vec![0xFFu8; 64];
        image[0] = 0x10;
        image[33] = 0x20;
        image[63] = 0x30;
        let text = to_hex(&image, true);
        // rows 0, 2 and 3 plus EOF; row 1 is erased
        assert_eq!(text.lines().count(), 4);
        assert!(text.ends_with(":00000001FF\n"));

        let mut back = vec![0xFFu8; 64];
        assert_eq!(parse_hex(&text, &mut back).unwrap(), 64);
        assert_eq!(back, image);

        assert_eq!(to_hex(&image, false).lines().count(), 5);
    }

    #[test]
    fn test_export_past_64k() {
        let mut image = vec![0xFFu8; 0x1_0020];
        image[0x0005] = 0x11;
        image[0x1_0010] = 0x22;
        let text = to_hex(&image, true);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], ":020000040001F9");
        assert!(lines[2].starts_with(":10001000"), "{}", lines[2]);

        let mut back = vec![0xFFu8; image.len()];
        assert_eq!(parse_hex(&text, &mut back).unwrap(), 0x1_0020);
        assert_eq!(back, image);
    }

    #[test]
    fn test_extended_linear_address() {
        let eep = ":020000040000FA\n:01001000559A\n";
        let mut image = vec![0u8; 32];
        parse_hex(eep, &mut image).unwrap();
        assert_eq!(image[0x10], 0x55);
    }
}
