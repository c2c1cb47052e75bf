//! Fragmentation Units (RFC 7798 §4.4.3).
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |    PayloadHdr (Type=49)       |   FU header   |               |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+               |
//! |                         FU payload                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//!
//! FU header: |S|E|  FuType   |
//! ```
//!
//! The fragmented NAL unit's own 2-byte header is not carried; its F,
//! LayerId and TID travel in the PayloadHdr and its type in FuType.

use super::header::{H265NalHeader, NAL_HEADER_SIZE, NalUnitType};

/// PayloadHdr (2 bytes) + FU header (1 byte).
pub const FU_HEADER_SIZE: usize = NAL_HEADER_SIZE + 1;

const FU_START_BIT: u8 = 0x80;
const FU_END_BIT: u8 = 0x40;
const FU_TYPE_MASK: u8 = 0x3F;

/// Split `nal` into FU payloads of at most `mtu` bytes each.
///
/// Intended for NAL units longer than `mtu`; shorter ones belong in a
/// single-NAL payload. Returns an empty vector when `mtu` leaves no room
/// for payload bytes after the 3-byte FU prefix, or when `nal` is shorter
/// than its own header.
pub fn fragment(nal: &[u8], mtu: usize) -> Vec<Vec<u8>> {
    let Ok(header) = H265NalHeader::parse(nal) else {
        return Vec::new();
    };
    let max_fragment_payload = mtu.saturating_sub(FU_HEADER_SIZE);
    if max_fragment_payload == 0 {
        return Vec::new();
    }

    let payload_hdr = header.with_type(NalUnitType::FU).bytes();
    let fu_type = header.nal_type() & FU_TYPE_MASK;
    let body = &nal[NAL_HEADER_SIZE..];
    let chunk_count = body.len().div_ceil(max_fragment_payload);

    body.chunks(max_fragment_payload)
        .enumerate()
        .map(|(i, chunk)| {
            let mut fu_header = fu_type;
            if i == 0 {
                fu_header |= FU_START_BIT;
            }
            if i + 1 == chunk_count {
                fu_header |= FU_END_BIT;
            }

            let mut packet = Vec::with_capacity(FU_HEADER_SIZE + chunk.len());
            packet.extend_from_slice(&payload_hdr);
            packet.push(fu_header);
            packet.extend_from_slice(chunk);
            packet
        })
        .collect()
}
