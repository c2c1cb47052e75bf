//! Annex B NAL unit extraction, shared by the H.264 and H.265 payloaders.
//!
//! Annex B bitstreams delimit NAL units with start codes:
//! - 4-byte: `0x00 0x00 0x00 0x01`
//! - 3-byte: `0x00 0x00 0x01`
//!
//! Extraction returns borrowed views into the access unit; payloaders copy
//! only when building an outgoing payload.

const START_CODE_PREFIX: [u8; 3] = [0, 0, 1];

/// Locate the next start code at or after `from`.
///
/// Returns `(position, length)`. A `00 00 01` directly preceded by a zero
/// that lies inside the searched region is reported as the 4-byte form.
fn find_start_code(data: &[u8], from: usize) -> Option<(usize, usize)> {
    let rel = data[from..]
        .windows(START_CODE_PREFIX.len())
        .position(|w| w == START_CODE_PREFIX)?;
    let pos = from + rel;
    if pos > from && data[pos - 1] == 0 {
        Some((pos - 1, 4))
    } else {
        Some((pos, 3))
    }
}

/// Split an Annex B access unit into its NAL units, start codes removed.
///
/// - Empty input yields no NAL units.
/// - Input with no start code is returned as a single NAL unit.
/// - Zero-length spans (start code directly followed by another start
///   code, or a leading start code) are skipped.
pub fn extract_nal_units(data: &[u8]) -> Vec<&[u8]> {
    let mut nal_units = Vec::new();
    let mut start = 0usize;

    while start < data.len() {
        match find_start_code(data, start) {
            Some((pos, sc_len)) => {
                if pos > start {
                    nal_units.push(&data[start..pos]);
                }
                start = pos + sc_len;
            }
            None => {
                nal_units.push(&data[start..]);
                break;
            }
        }
    }

    nal_units
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_single_nal_4byte_sc() {
        let data = [0, 0, 0, 1, 0x26, 0x01, 0xAA];
        let nals = extract_nal_units(&data);
        assert_eq!(nals, vec![&[0x26, 0x01, 0xAA][..]]);
    }

    #[test]
    fn extract_single_nal_3byte_sc() {
        let data = [0, 0, 1, 0x40, 0x01, 0x0C];
        let nals = extract_nal_units(&data);
        assert_eq!(nals, vec![&[0x40, 0x01, 0x0C][..]]);
    }

    #[test]
    fn extract_mixed_start_codes() {
        let data = [0, 0, 0, 1, 0xAA, 0xBB, 0, 0, 1, 0xCC, 0xDD, 0xEE];
        let nals = extract_nal_units(&data);
        assert_eq!(nals.len(), 2);
        assert_eq!(nals[0], &[0xAA, 0xBB]);
        assert_eq!(nals[1], &[0xCC, 0xDD, 0xEE]);
    }

    #[test]
    fn extract_3byte_then_4byte() {
        let data = [0, 0, 1, 0x42, 0x01, 0, 0, 0, 1, 0x44, 0x01];
        let nals = extract_nal_units(&data);
        assert_eq!(nals, vec![&[0x42, 0x01][..], &[0x44, 0x01][..]]);
    }

    #[test]
    fn extract_empty_data() {
        assert!(extract_nal_units(&[]).is_empty());
    }

    #[test]
    fn no_start_code_is_one_nal() {
        let data = [0x02, 0x01, 0xFF, 0xFE];
        assert_eq!(extract_nal_units(&data), vec![&data[..]]);
    }

    #[test]
    fn back_to_back_start_codes_skipped() {
        let data = [0, 0, 0, 1, 0, 0, 0, 1, 0x02, 0x01, 0, 0, 1, 0, 0, 1, 0x26, 0x01];
        let nals = extract_nal_units(&data);
        assert_eq!(nals, vec![&[0x02, 0x01][..], &[0x26, 0x01][..]]);
    }

    #[test]
    fn trailing_start_code_adds_nothing() {
        let data = [0, 0, 1, 0x02, 0x01, 0, 0, 0, 1];
        assert_eq!(extract_nal_units(&data), vec![&[0x02, 0x01][..]]);
    }

    #[test]
    fn extraction_is_deterministic() {
        let data = [0, 0, 0, 1, 0x40, 0x01, 0, 0, 1, 0x42, 0x01, 0x99, 0, 0, 1, 0x02];
        assert_eq!(extract_nal_units(&data), extract_nal_units(&data));
    }
}
