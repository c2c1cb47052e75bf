use crate::error::{HevcRtpError, Result};

/// Default payload size ceiling, leaving room for IP/UDP/RTP/SRTP overhead
/// inside a 1500-byte Ethernet frame.
pub const DEFAULT_MTU: usize = 1200;

/// Dynamic RTP payload type conventionally used for the first video codec.
pub const DEFAULT_PAYLOAD_TYPE: u8 = 96;

/// RTP clock rate for video (RFC 7798 §7.1, RFC 6184 §8.1).
pub const VIDEO_CLOCK_RATE: u32 = 90_000;

/// How VPS/SPS/PPS NAL units are carried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParameterSetMode {
    /// Every parameter set is sent as its own single-NAL payload when seen.
    #[default]
    Standalone,
    /// Parameter sets are held back; once every kind has been seen, one
    /// aggregation payload carrying them is emitted ahead of the next
    /// non-parameter-set NAL unit. An aggregate larger than the MTU is lost.
    Aggregate,
}

/// Payloader-level options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloaderConfig {
    pub aggregation: ParameterSetMode,
}

/// Options for a full RTP packetizer (payloader plus RTP header state).
#[derive(Debug, Clone)]
pub struct PacketizerConfig {
    /// RTP payload type (7-bit).
    pub payload_type: u8,
    /// SSRC. When `None`, one is chosen randomly (RFC 3550 §8.1).
    pub ssrc: Option<u32>,
    /// Maximum payload size handed to the payloader.
    pub mtu: usize,
    /// RTP clock rate in Hz.
    pub clock_rate: u32,
    pub payloader: PayloaderConfig,
}

impl Default for PacketizerConfig {
    fn default() -> Self {
        Self {
            payload_type: DEFAULT_PAYLOAD_TYPE,
            ssrc: None,
            mtu: DEFAULT_MTU,
            clock_rate: VIDEO_CLOCK_RATE,
            payloader: PayloaderConfig::default(),
        }
    }
}

impl PacketizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.mtu == 0 {
            return Err(HevcRtpError::InvalidMtu { mtu: self.mtu });
        }
        if self.payload_type > 127 {
            return Err(HevcRtpError::InvalidPayloadType(self.payload_type));
        }
        Ok(())
    }
}
