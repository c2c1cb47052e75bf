//! Codec payloaders and RTP packetization.
//!
//! This module provides the [`Payloader`] trait and codec-specific
//! implementations that convert Annex B access units into RTP payloads.
//!
//! ## Payloading vs. packetization
//!
//! A payloader only decides the bytes carried after the RTP header. Every
//! returned buffer becomes the payload of exactly one RTP packet, in order.
//! [`rtp::RtpPacketizer`] adds the 12-byte fixed header (RFC 3550 §5.1)
//! and sets the marker bit on the last packet of an access unit.
//!
//! ## Supported codecs
//!
//! | Codec | Module | RFC |
//! |-------|--------|-----|
//! | H.265 | [`h265`] | [RFC 7798](https://tools.ietf.org/html/rfc7798) |
//! | H.264 | [`h264`] | [RFC 6184](https://tools.ietf.org/html/rfc6184) |

pub mod h264;
pub mod h265;
pub mod nal;
pub mod rtp;

use crate::config::PayloaderConfig;
use crate::diagnostics::{PayloadObserver, PayloadStats};

/// Codec-specific RTP payloader.
///
/// Each supported codec implements this trait. A payloader keeps per-stream
/// state (e.g. parameter sets), so one instance serves exactly one outgoing
/// stream and is driven by one caller in encoder order.
pub trait Payloader: Send {
    /// Split an Annex B access unit into RTP payloads no larger than `mtu`.
    ///
    /// Returned buffers are independently owned copies and must be sent in
    /// the order given. Input that cannot be carried (e.g. an MTU below the
    /// fragmentation header size) produces no buffers and is reported
    /// through [`stats`](Self::stats) and the observer.
    fn payload(&mut self, mtu: usize, access_unit: &[u8]) -> Vec<Vec<u8>>;

    /// Encoding name for the SDP `a=rtpmap` attribute (e.g. `"H265"`).
    fn codec_name(&self) -> &'static str;

    /// Codec parameters for `a=fmtp`, without the `a=fmtp:<pt> ` prefix.
    ///
    /// `None` until the stream has carried enough parameter sets.
    fn fmtp_parameters(&self) -> Option<String>;

    /// Counters accumulated since construction.
    fn stats(&self) -> PayloadStats;

    /// Install a sink for per-decision [`PayloadEvent`](crate::diagnostics::PayloadEvent)s.
    fn set_observer(&mut self, observer: Box<dyn PayloadObserver>);
}

/// Video codecs with a payloader, selected once per track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    H264,
    H265,
}

impl Codec {
    /// Build a fresh payloader for one outgoing stream.
    pub fn payloader(self, config: PayloaderConfig) -> Box<dyn Payloader> {
        match self {
            Codec::H264 => Box::new(h264::H264Payloader::new(config)),
            Codec::H265 => Box::new(h265::H265Payloader::new(config)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Codec::H264 => "H264",
            Codec::H265 => "H265",
        }
    }
}
