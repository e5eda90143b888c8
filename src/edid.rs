//! EDID block parsing, just enough to recover a display's identity triple.
//!
//! Everything we need lives in the 128-byte base block: the packed
//! manufacturer id, and the product-name/serial-text display descriptors.
//! Extension blocks are ignored.

use crate::display::EdidInfo;

/// Size of the base block. Anything shorter is not an EDID.
const BASE_BLOCK_LEN: usize = 128;
/// The four 18-byte detailed descriptors start here.
const DESCRIPTOR_BASE: usize = 54;
const DESCRIPTOR_LEN: usize = 18;
/// Display-descriptor tag: monitor name, text payload.
const TAG_PRODUCT_NAME: u8 = 0xFC;
/// Display-descriptor tag: serial number, text payload.
const TAG_SERIAL_TEXT: u8 = 0xFF;

#[derive(thiserror::Error, Debug)]
pub enum EdidError {
    /// Fewer bytes than the 128-byte base block.
    #[error("EDID block too short ({0} bytes)")]
    TooShort(usize),
}

/// Recover the identity triple from a raw EDID block.
///
/// Fields the block does not carry come back empty - plenty of real
/// monitors omit the serial-text descriptor, and projectors tend to omit
/// everything. An incomplete triple is data, not an error.
///
/// # Errors
/// [`EdidError::TooShort`] if `bytes` can't even hold a base block.
pub fn parse(bytes: &[u8]) -> Result<EdidInfo, EdidError> {
    if bytes.len() < BASE_BLOCK_LEN {
        return Err(EdidError::TooShort(bytes.len()));
    }

    let mut info = EdidInfo::unset();
    if let Some(letters) = vendor_id(u16::from_be_bytes([bytes[8], bytes[9]])) {
        info.vendor = letters.iter().collect();
    }

    for block in bytes[DESCRIPTOR_BASE..BASE_BLOCK_LEN].chunks_exact(DESCRIPTOR_LEN) {
        // A zero pixel clock marks a display descriptor rather than a timing.
        if block[0] != 0 || block[1] != 0 {
            continue;
        }
        let text = descriptor_text(&block[5..DESCRIPTOR_LEN]);
        if text.is_empty() {
            continue;
        }
        match block[3] {
            TAG_PRODUCT_NAME => info.product = text,
            TAG_SERIAL_TEXT => info.serial = text,
            _ => (),
        }
    }

    Ok(info)
}

/// Decode the three-letter PNP vendor id, packed big-endian at five bits per
/// letter with `A = 1`. `None` if any letter falls outside `A..=Z`.
fn vendor_id(packed: u16) -> Option<[char; 3]> {
    let letter = |shift: u16| {
        let five = u8::try_from((packed >> shift) & 0x1F).ok()?;
        (1..=26).contains(&five).then(|| char::from(b'A' + five - 1))
    };
    Some([letter(10)?, letter(5)?, letter(0)?])
}

/// Text payload of a display descriptor: terminated by a linefeed, padded
/// with spaces.
fn descriptor_text(bytes: &[u8]) -> String {
    let text: Vec<u8> = bytes
        .iter()
        .copied()
        .take_while(|&b| b != 0x0A && b != 0x00)
        .collect();
    String::from_utf8_lossy(&text).trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Base block with vendor `DEL` and no descriptors.
    fn block() -> Vec<u8> {
        let mut bytes = vec![0_u8; BASE_BLOCK_LEN];
        // 'D' = 4, 'E' = 5, 'L' = 12, big-endian at 5 bits each.
        let packed = (4_u16 << 10) | (5 << 5) | 12;
        bytes[8..10].copy_from_slice(&packed.to_be_bytes());
        bytes
    }

    fn write_descriptor(bytes: &mut [u8], slot: usize, tag: u8, text: &str) {
        let base = DESCRIPTOR_BASE + slot * DESCRIPTOR_LEN;
        bytes[base + 3] = tag;
        let padded = format!("{text}\n");
        bytes[base + 5..base + 5 + padded.len()].copy_from_slice(padded.as_bytes());
    }

    #[test]
    fn parses_full_identity() {
        let mut bytes = block();
        write_descriptor(&mut bytes, 0, TAG_PRODUCT_NAME, "P2419H");
        write_descriptor(&mut bytes, 1, TAG_SERIAL_TEXT, "ABC123");
        let info = parse(&bytes).unwrap();
        assert_eq!(info.vendor, "DEL");
        assert_eq!(info.product, "P2419H");
        assert_eq!(info.serial, "ABC123");
        assert!(info.is_complete());
    }

    #[test]
    fn missing_descriptors_leave_fields_empty() {
        let info = parse(&block()).unwrap();
        assert_eq!(info.vendor, "DEL");
        assert!(info.product.is_empty());
        assert!(info.serial.is_empty());
        assert!(!info.is_complete());
    }

    #[test]
    fn trailing_space_padding_is_trimmed() {
        let mut bytes = block();
        write_descriptor(&mut bytes, 0, TAG_PRODUCT_NAME, "U2720Q  ");
        assert_eq!(parse(&bytes).unwrap().product, "U2720Q");
    }

    #[test]
    fn short_block_errors() {
        assert!(matches!(parse(&[0; 64]), Err(EdidError::TooShort(64))));
    }

    #[test]
    fn out_of_range_vendor_letters_are_dropped() {
        let mut bytes = block();
        // All-zero packed id decodes to letter 0, outside A..=Z.
        bytes[8..10].copy_from_slice(&[0, 0]);
        assert!(parse(&bytes).unwrap().vendor.is_empty());
    }

    #[test]
    fn timing_blocks_are_not_descriptors() {
        let mut bytes = block();
        // Nonzero pixel clock: a detailed timing, must not be read as text.
        bytes[DESCRIPTOR_BASE] = 0x12;
        bytes[DESCRIPTOR_BASE + 1] = 0x34;
        write_descriptor(&mut bytes, 1, TAG_PRODUCT_NAME, "REAL");
        assert_eq!(parse(&bytes).unwrap().product, "REAL");
    }
}
