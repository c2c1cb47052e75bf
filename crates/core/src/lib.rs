//! RFC 7798 H.265 (HEVC) RTP payloading for real-time video senders.
//!
//! An encoder produces Annex B access units; a [`Payloader`] turns each one
//! into an ordered list of RTP payloads no larger than the MTU:
//!
//! ```
//! use hevc_rtp::{H265Payloader, Payloader};
//!
//! let mut payloader = H265Payloader::default();
//! let access_unit = [0, 0, 0, 1, 0x02, 0x01, 0xAA, 0xBB];
//! let payloads = payloader.payload(1200, &access_unit);
//! assert_eq!(payloads, vec![vec![0x02, 0x01, 0xAA, 0xBB]]);
//! ```
//!
//! [`RtpPacketizer`] adds RTP headers on top, and [`TrackRegistry`] keeps
//! one packetizer per outgoing stream.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod media;
pub mod track;

pub use config::{PacketizerConfig, ParameterSetMode, PayloaderConfig};
pub use diagnostics::{PayloadEvent, PayloadObserver, PayloadStats};
pub use error::{HevcRtpError, Result};
pub use media::h264::H264Payloader;
pub use media::h265::H265Payloader;
pub use media::rtp::RtpPacketizer;
pub use media::{Codec, Payloader};
pub use track::{LocalTrack, TrackRegistry};
