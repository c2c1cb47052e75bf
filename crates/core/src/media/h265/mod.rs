//! H.265 (HEVC) RTP payloader — RFC 7798.
//!
//! Key differences from H.264 (RFC 6184):
//!
//! - **2-byte NAL unit header** (vs 1-byte in H.264).
//!   The NAL type is in bits 1..6 of the first byte.
//!
//! - **FU prefix**: a 2-byte PayloadHdr (type 49) followed by a 1-byte FU
//!   header carrying S/E bits and the 6-bit type of the fragmented NAL. See [`fragment`].
//!
//! - **Parameter sets**: VPS, SPS and PPS (types 32–34) are sent as
//!   standalone payloads, or optionally combined into one aggregation
//!   payload. See [`parameter_sets`].
//!
//! - **SDP attributes** (RFC 7798 §7.1):
//!   ```text
//!   a=rtpmap:96 H265/90000
//!   a=fmtp:96 sprop-vps=...;sprop-sps=...;sprop-pps=...
//!   ```

pub mod fragment;
pub mod header;
pub mod parameter_sets;

use base64::prelude::{BASE64_STANDARD, Engine as _};

use crate::config::PayloaderConfig;
use crate::diagnostics::{Diagnostics, PayloadEvent, PayloadObserver, PayloadStats};

use super::Payloader;
use super::nal::extract_nal_units;
use fragment::fragment;
use header::{is_parameter_set, nal_type};
use parameter_sets::{ParameterSetCache, PendingAggregate};

pub use fragment::FU_HEADER_SIZE;
pub use header::{H265NalHeader, NalUnitType};
pub use parameter_sets::AGGREGATION_HEADER;

const CODEC_NAME: &str = "H265";

/// H.265 RTP payloader (RFC 7798).
///
/// Turns one Annex B access unit into an ordered list of RTP payloads:
///
/// - **Single NAL Unit** (§4.4.1): NAL units no longer than the MTU are
///   copied verbatim into one payload.
/// - **Fragmentation Units** (§4.4.3): longer NAL units are split, see
///   [`fragment::fragment`].
/// - **Parameter sets**: routed through a [`ParameterSetCache`] that
///   persists across calls on the same instance.
///
/// One instance per outgoing stream. Calls must come from a single driver
/// in encoder order; the instance is `Send` but takes `&mut self`.
#[derive(Debug, Default)]
pub struct H265Payloader {
    parameter_sets: ParameterSetCache,
    diagnostics: Diagnostics,
}

impl H265Payloader {
    pub fn new(config: PayloaderConfig) -> Self {
        Self {
            parameter_sets: ParameterSetCache::new(config.aggregation),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Latest VPS/SPS/PPS seen on this stream.
    pub fn parameter_sets(&self) -> &ParameterSetCache {
        &self.parameter_sets
    }

    /// Clear the retained parameter sets, e.g. when the encoder restarts.
    pub fn reset(&mut self) {
        self.parameter_sets.reset();
    }

    /// Emit `nal` as one payload, or as fragmentation units if it exceeds
    /// `mtu`.
    fn emit_nal(&mut self, nal: &[u8], mtu: usize, parameter_set: bool, out: &mut Vec<Vec<u8>>) {
        let nal_type = nal_type(nal[0]);

        if nal.len() <= mtu {
            out.push(nal.to_vec());
            let event = if parameter_set {
                PayloadEvent::ParameterSet {
                    nal_type,
                    len: nal.len(),
                }
            } else {
                PayloadEvent::SingleNal {
                    nal_type,
                    len: nal.len(),
                }
            };
            self.diagnostics.emit(CODEC_NAME, event);
            return;
        }

        let fragments = fragment(nal, mtu);
        let event = if fragments.is_empty() {
            PayloadEvent::MtuTooSmall {
                nal_type,
                nal_len: nal.len(),
                mtu,
            }
        } else {
            PayloadEvent::Fragmented {
                nal_type,
                nal_len: nal.len(),
                fragments: fragments.len(),
            }
        };
        out.extend(fragments);
        self.diagnostics.emit(CODEC_NAME, event);
    }

    fn resolve_pending_aggregate(&mut self, mtu: usize, out: &mut Vec<Vec<u8>>) {
        match self.parameter_sets.take_pending(mtu) {
            Some(PendingAggregate::Ready(packet)) => {
                let len = packet.len();
                out.push(packet);
                self.diagnostics
                    .emit(CODEC_NAME, PayloadEvent::AggregationEmitted { len });
            }
            Some(PendingAggregate::Oversized { len }) => {
                self.diagnostics
                    .emit(CODEC_NAME, PayloadEvent::AggregationDropped { len, mtu });
            }
            None => {}
        }
    }
}

impl Payloader for H265Payloader {
    fn payload(&mut self, mtu: usize, access_unit: &[u8]) -> Vec<Vec<u8>> {
        let mut payloads = Vec::new();
        if access_unit.is_empty() {
            return payloads;
        }

        let nal_units = extract_nal_units(access_unit);
        for nal in &nal_units {
            if is_parameter_set(nal_type(nal[0])) {
                if let Some(standalone) = self.parameter_sets.observe(nal) {
                    self.emit_nal(&standalone, mtu, true, &mut payloads);
                }
                continue;
            }

            self.resolve_pending_aggregate(mtu, &mut payloads);
            self.emit_nal(nal, mtu, false, &mut payloads);
        }

        tracing::trace!(
            nal_count = nal_units.len(),
            payloads = payloads.len(),
            au_bytes = access_unit.len(),
            mtu,
            "H.265 access unit payloaded"
        );

        payloads
    }

    fn codec_name(&self) -> &'static str {
        CODEC_NAME
    }

    /// `sprop-vps`, `sprop-sps` and `sprop-pps` (RFC 7798 §7.1), available
    /// once all three parameter sets have been seen.
    fn fmtp_parameters(&self) -> Option<String> {
        let ps = &self.parameter_sets;
        let (vps, sps, pps) = (ps.vps()?, ps.sps()?, ps.pps()?);
        Some(format!(
            "sprop-vps={};sprop-sps={};sprop-pps={}",
            BASE64_STANDARD.encode(vps),
            BASE64_STANDARD.encode(sps),
            BASE64_STANDARD.encode(pps)
        ))
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
    use crate::config::ParameterSetMode;
    use base64::prelude::{BASE64_STANDARD, Engine as _};

    const VPS: [u8; 4] = [0x40, 0x01, 0x0C, 0x01];
    const SPS: [u8; 5] = [0x42, 0x01, 0x01, 0x01, 0x60];
    const PPS: [u8; 3] = [0x44, 0x01, 0xC1];

    fn annex_b(nals: &[&[u8]]) -> Vec<u8> {
        nals.iter()
            .flat_map(|nal| [&[0u8, 0, 0, 1][..], *nal].concat())
            .collect()
    }

    fn idr(len: usize) -> Vec<u8> {
        let mut nal = vec![0x26, 0x01];
        nal.resize(len, 0xAB);
        nal
    }

    #[test]
    fn empty_access_unit() {
        let mut p = H265Payloader::default();
        assert!(p.payload(1200, &[]).is_empty());
    }

    #[test]
    fn passthrough_is_verbatim() {
        let mut p = H265Payloader::default();
        let mut nal = vec![0x02, 0x01];
        nal.resize(50, 0x5A);
        let out = p.payload(1200, &annex_b(&[&nal]));
        assert_eq!(out, vec![nal]);
        assert_eq!(p.stats().single_nal, 1);
    }

    #[test]
    fn standalone_parameter_sets_in_order() {
        let mut p = H265Payloader::default();
        let slice = idr(20);
        let out = p.payload(1200, &annex_b(&[&VPS, &SPS, &PPS, &slice]));
        assert_eq!(
            out,
            vec![VPS.to_vec(), SPS.to_vec(), PPS.to_vec(), slice.clone()]
        );
        assert_eq!(p.stats().parameter_sets, 3);
    }

    #[test]
    fn aggregate_mode_precedes_first_slice() {
        let mut p = H265Payloader::new(PayloaderConfig {
            aggregation: ParameterSetMode::Aggregate,
        });
        let slice = idr(20);
        let out = p.payload(1200, &annex_b(&[&VPS, &SPS, &PPS, &slice, &slice]));
        assert_eq!(out.len(), 3);
        assert_eq!(out[0][0], AGGREGATION_HEADER);
        assert_eq!(out[0].len(), 1 + 6 + VPS.len() + SPS.len() + PPS.len());
        assert_eq!(out[1], slice);
        assert_eq!(out[2], slice);
        assert_eq!(p.stats().aggregates_emitted, 1);
    }

    #[test]
    fn aggregate_pending_carries_into_next_access_unit() {
        let mut p = H265Payloader::new(PayloaderConfig {
            aggregation: ParameterSetMode::Aggregate,
        });
        assert!(p.payload(1200, &annex_b(&[&VPS, &SPS, &PPS])).is_empty());
        let slice = idr(10);
        let out = p.payload(1200, &annex_b(&[&slice]));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0][0], AGGREGATION_HEADER);
    }

    #[test]
    fn oversized_aggregate_is_dropped() {
        let mut p = H265Payloader::new(PayloaderConfig {
            aggregation: ParameterSetMode::Aggregate,
        });
        let slice = idr(10);
        let out = p.payload(15, &annex_b(&[&VPS, &SPS, &PPS, &slice]));
        assert_eq!(out, vec![slice]);
        assert_eq!(p.stats().aggregates_dropped, 1);
    }

    #[test]
    fn oversized_nal_is_fragmented() {
        let mut p = H265Payloader::default();
        let nal = idr(3000);
        let out = p.payload(1200, &annex_b(&[&nal]));
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|b| b.len() <= 1200));
        assert_eq!(p.stats().fragments, 3);
    }

    #[test]
    fn tiny_mtu_drops_nal_and_counts_it() {
        let mut p = H265Payloader::default();
        let out = p.payload(3, &annex_b(&[&idr(10)]));
        assert!(out.is_empty());
        assert_eq!(p.stats().mtu_too_small, 1);
    }

    #[test]
    fn large_parameter_set_is_fragmented() {
        let mut p = H265Payloader::default();
        let mut sps = SPS.to_vec();
        sps.resize(300, 0x11);
        let out = p.payload(100, &annex_b(&[&sps]));
        assert!(out.len() > 1);
        assert_eq!(out[0][2] & 0x3F, NalUnitType::SPS);
    }

    #[test]
    fn fmtp_after_parameter_sets() {
        let mut p = H265Payloader::default();
        assert!(p.fmtp_parameters().is_none());
        p.payload(1200, &annex_b(&[&VPS, &SPS, &PPS]));
        let fmtp = p.fmtp_parameters().unwrap();
        assert_eq!(
            fmtp,
            format!(
                "sprop-vps={};sprop-sps={};sprop-pps={}",
                BASE64_STANDARD.encode(VPS),
                BASE64_STANDARD.encode(SPS),
                BASE64_STANDARD.encode(PPS)
            )
        );
        p.reset();
        assert!(p.fmtp_parameters().is_none());
    }

    #[test]
    fn outputs_do_not_alias_input() {
        let mut p = H265Payloader::default();
        let au = annex_b(&[&idr(40)]);
        let out = p.payload(1200, &au);
        let range = au.as_ptr_range();
        assert!(!range.contains(&out[0].as_ptr()));
    }
}
