use base64::prelude::{BASE64_STANDARD, Engine as _};

use crate::config::{ParameterSetMode, PayloaderConfig};
use crate::diagnostics::{Diagnostics, PayloadEvent, PayloadObserver, PayloadStats};

use super::Payloader;
use super::nal::extract_nal_units;

const CODEC_NAME: &str = "H264";

const NAL_TYPE_SPS: u8 = 7;
const NAL_TYPE_PPS: u8 = 8;
const NAL_TYPE_STAP_A: u8 = 24;
const NAL_TYPE_FU_A: u8 = 28;

const NAL_TYPE_MASK: u8 = 0x1f;
const NRI_MASK: u8 = 0x60;

/// FU indicator + FU header.
const FU_A_HEADER_SIZE: usize = 2;
const STAP_A_LENGTH_SIZE: usize = 2;

/// H.264 RTP payloader (RFC 6184), the sibling of
/// [`H265Payloader`](super::h265::H265Payloader).
///
/// - **Single NAL Unit** (§5.6): NALs that fit within the MTU are sent
///   as-is.
///
/// - **FU-A Fragmentation** (§5.8): NALs exceeding the MTU are split.
///   Each fragment carries a 2-byte prefix before the NAL payload:
///
///   ```text
///   FU indicator:  [F|NRI|Type=28]     (1 byte)
///   FU header:     [S|E|R|NAL_Type]    (1 byte)
///   Fragment data: [...]               (up to MTU - 2 bytes)
///   ```
///
/// - **STAP-A** (§5.7.1), with [`ParameterSetMode::Aggregate`]: SPS and PPS
///   are held back and sent together ahead of the next other NAL unit.
///
/// SPS/PPS are retained for `profile-level-id` and `sprop-parameter-sets`
/// (RFC 6184 §8.1).
#[derive(Debug, Default)]
pub struct H264Payloader {
    mode: ParameterSetMode,
    sps: Option<Vec<u8>>,
    pps: Option<Vec<u8>>,
    pending_sps: bool,
    pending_pps: bool,
    diagnostics: Diagnostics,
}

impl H264Payloader {
    pub fn new(config: PayloaderConfig) -> Self {
        Self {
            mode: config.aggregation,
            ..Default::default()
        }
    }

    /// Derive profile-level-id from SPS NAL (RFC 6184 §8.1): bytes 1–3 are profile_idc, constraint_set, level_idc.
    fn profile_level_id(&self) -> Option<String> {
        let sps = self.sps.as_deref()?;
        if sps.len() < 4 {
            return None;
        }
        Some(format!("{:02x}{:02x}{:02x}", sps[1], sps[2], sps[3]))
    }

    fn sprop_parameter_sets(&self) -> Option<String> {
        let sps = self.sps.as_deref()?;
        let pps = self.pps.as_deref()?;
        Some(format!(
            "{},{}",
            BASE64_STANDARD.encode(sps),
            BASE64_STANDARD.encode(pps)
        ))
    }

    /// Single NAL unit if it fits, FU-A fragments otherwise.
    fn emit_nal(&mut self, nal_unit: &[u8], mtu: usize, out: &mut Vec<Vec<u8>>) {
        let nal_header = nal_unit[0];
        let nal_type = nal_header & NAL_TYPE_MASK;

        if nal_unit.len() <= mtu {
            out.push(nal_unit.to_vec());
            let len = nal_unit.len();
            let event = if matches!(nal_type, NAL_TYPE_SPS | NAL_TYPE_PPS) {
                PayloadEvent::ParameterSet { nal_type, len }
            } else {
                PayloadEvent::SingleNal { nal_type, len }
            };
            self.diagnostics.emit(CODEC_NAME, event);
            return;
        }

        let max_fragment = mtu.saturating_sub(FU_A_HEADER_SIZE);
        if max_fragment == 0 {
            self.diagnostics.emit(
                CODEC_NAME,
                PayloadEvent::MtuTooSmall {
                    nal_type,
                    nal_len: nal_unit.len(),
                    mtu,
                },
            );
            return;
        }

        // The NAL header byte is not carried; F and NRI move to the FU
        // indicator, the type to the FU header.
        let fu_indicator = (nal_header & (0x80 | NRI_MASK)) | NAL_TYPE_FU_A;
        let payload = &nal_unit[1..];
        let last = payload.len().div_ceil(max_fragment) - 1;

        let before = out.len();
        for (i, chunk) in payload.chunks(max_fragment).enumerate() {
            let start_bit = if i == 0 { 0x80 } else { 0x00 };
            let end_bit = if i == last { 0x40 } else { 0x00 };

            let mut packet = Vec::with_capacity(FU_A_HEADER_SIZE + chunk.len());
            packet.push(fu_indicator);
            packet.push(start_bit | end_bit | nal_type);
            packet.extend_from_slice(chunk);
            out.push(packet);
        }

        self.diagnostics.emit(
            CODEC_NAME,
            PayloadEvent::Fragmented {
                nal_type,
                nal_len: nal_unit.len(),
                fragments: out.len() - before,
            },
        );
    }

    /// STAP-A of the pending SPS and PPS, once both have arrived.
    fn resolve_pending_stap_a(&mut self, mtu: usize, out: &mut Vec<Vec<u8>>) {
        if !(self.pending_sps && self.pending_pps) {
            return;
        }
        self.pending_sps = false;
        self.pending_pps = false;
        let (Some(sps), Some(pps)) = (self.sps.as_deref(), self.pps.as_deref()) else {
            return;
        };

        let len = 1 + 2 * STAP_A_LENGTH_SIZE + sps.len() + pps.len();
        let fits = len <= mtu && sps.len() <= u16::MAX as usize && pps.len() <= u16::MAX as usize;
        if !fits {
            self.diagnostics
                .emit(CODEC_NAME, PayloadEvent::AggregationDropped { len, mtu });
            return;
        }

        // F is OR-ed, NRI is the maximum of the aggregated units (§5.7.1).
        let f = (sps[0] | pps[0]) & 0x80;
        let nri = (sps[0] & NRI_MASK).max(pps[0] & NRI_MASK);
        let mut packet = Vec::with_capacity(len);
        packet.push(f | nri | NAL_TYPE_STAP_A);
        for nal in [sps, pps] {
            packet.extend_from_slice(&(nal.len() as u16).to_be_bytes());
            packet.extend_from_slice(nal);
        }
        out.push(packet);
        self.diagnostics
            .emit(CODEC_NAME, PayloadEvent::AggregationEmitted { len });
    }
}

impl Payloader for H264Payloader {
    fn payload(&mut self, mtu: usize, access_unit: &[u8]) -> Vec<Vec<u8>> {
        let mut payloads = Vec::new();
        if access_unit.is_empty() {
            return payloads;
        }

        let nal_units = extract_nal_units(access_unit);
        for nal in &nal_units {
            let nal_type = nal[0] & NAL_TYPE_MASK;
            if matches!(nal_type, NAL_TYPE_SPS | NAL_TYPE_PPS) {
                if nal_type == NAL_TYPE_SPS {
                    self.sps = Some(nal.to_vec());
                    self.pending_sps = true;
                } else {
                    self.pps = Some(nal.to_vec());
                    self.pending_pps = true;
                }
                if self.mode == ParameterSetMode::Standalone {
                    self.emit_nal(nal, mtu, &mut payloads);
                }
                continue;
            }

            if self.mode == ParameterSetMode::Aggregate {
                self.resolve_pending_stap_a(mtu, &mut payloads);
            }
            self.emit_nal(nal, mtu, &mut payloads);
        }

        tracing::trace!(
            nal_count = nal_units.len(),
            payloads = payloads.len(),
            au_bytes = access_unit.len(),
            mtu,
            "H.264 access unit payloaded"
        );

        payloads
    }

    fn codec_name(&self) -> &'static str {
        CODEC_NAME
    }

    /// `packetization-mode=1[;profile-level-id=...][;sprop-parameter-sets=...]`
    fn fmtp_parameters(&self) -> Option<String> {
        let mut fmtp = String::from("packetization-mode=1");
        if let Some(pl) = self.profile_level_id() {
            fmtp.push_str(&format!(";profile-level-id={}", pl));
        }
        if let Some(sprop) = self.sprop_parameter_sets() {
            fmtp.push_str(&format!(";sprop-parameter-sets={}", sprop));
        }
        Some(fmtp)
    }

    fn stats(&self) -> PayloadStats {
        self.diagnostics.stats()
    }

    fn set_observer(&mut self, observer: Box<dyn PayloadObserver>) {
        self.diagnostics.set_observer(observer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPS: [u8; 4] = [0x67, 0x42, 0x00, 0x1e];
    const PPS: [u8; 4] = [0x68, 0xce, 0x38, 0x80];

    fn frame(nals: &[&[u8]]) -> Vec<u8> {
        nals.iter()
            .flat_map(|nal| [&[0u8, 0, 0, 1][..], *nal].concat())
            .collect()
    }

    #[test]
    fn small_nal_single_payload() {
        let mut p = H264Payloader::default();
        let nal = [0x65, 0xAA, 0xBB, 0xCC];
        let out = p.payload(1200, &frame(&[&nal]));
        assert_eq!(out, vec![nal.to_vec()]);
    }

    #[test]
    fn large_nal_fragmented() {
        let mut p = H264Payloader::default();
        let mut nal = vec![0x65];
        nal.extend(vec![0xAA; 1200 + 500]);
        let out = p.payload(1200, &frame(&[&nal]));
        assert_eq!(out.len(), 2);

        assert_eq!(out[0][0] & 0x1f, 28); // FU-A type
        assert_eq!(out[0][0] & 0x60, 0x60); // NRI kept
        assert_eq!(out[0][1], 0x80 | 5); // Start bit
        assert_eq!(out[1][1], 0x40 | 5); // End bit
        assert!(out.iter().all(|p| p.len() <= 1200));

        let body: Vec<u8> = out.iter().flat_map(|p| p[2..].iter().copied()).collect();
        assert_eq!(body, &nal[1..]);
    }

    #[test]
    fn tiny_mtu_drops_nal() {
        let mut p = H264Payloader::default();
        let out = p.payload(2, &frame(&[&[0x65, 1, 2, 3]]));
        assert!(out.is_empty());
        assert_eq!(p.stats().mtu_too_small, 1);
    }

    #[test]
    fn stap_a_aggregates_sps_pps() {
        let mut p = H264Payloader::new(PayloaderConfig {
            aggregation: ParameterSetMode::Aggregate,
        });
        let slice = [0x65, 0x88, 0x00];
        let out = p.payload(1200, &frame(&[&SPS, &PPS, &slice]));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0][0], 0x78); // F=0, NRI=3, type 24
        assert_eq!(&out[0][1..3], &[0, 4]);
        assert_eq!(&out[0][3..7], &SPS);
        assert_eq!(out[1], slice.to_vec());
    }

    #[test]
    fn fmtp_includes_parameter_sets() {
        let mut p = H264Payloader::default();
        assert_eq!(p.fmtp_parameters().as_deref(), Some("packetization-mode=1"));

        let out = p.payload(1200, &frame(&[&SPS, &PPS, &[0x65, 0x88, 0x00]]));
        assert_eq!(out.len(), 3);
        let fmtp = p.fmtp_parameters().unwrap();
        assert!(fmtp.contains("profile-level-id=42001e"));
        assert!(fmtp.contains("sprop-parameter-sets="));
    }
}
