use crate::config::PacketizerConfig;
use crate::diagnostics::PayloadStats;
use crate::error::Result;

use super::{Codec, Payloader};

/// Size of the RTP fixed header without CSRCs or extensions.
pub const RTP_HEADER_SIZE: usize = 12;

/// RTP fixed header writer for one outgoing stream (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Version is always 2; padding, extension and CSRC count are always 0.
/// Sequence number and timestamp wrap.
#[derive(Debug)]
pub struct RtpSequencer {
    payload_type: u8,
    ssrc: u32,
    sequence: u16,
    timestamp: u32,
}

impl RtpSequencer {
    pub fn new(payload_type: u8, ssrc: u32) -> Self {
        tracing::debug!(
            payload_type,
            ssrc = format_args!("{:#010X}", ssrc),
            "RTP sequencer created"
        );
        Self {
            payload_type: payload_type & 0x7f,
            ssrc,
            sequence: 0,
            timestamp: 0,
        }
    }

    /// Random SSRC per RFC 3550 §8.1.
    pub fn with_random_ssrc(payload_type: u8) -> Self {
        Self::new(payload_type, rand::random::<u32>())
    }

    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Sequence number the next packet will carry.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Prepend a fixed header to `payload` and advance the sequence number.
    pub fn wrap(&mut self, payload: &[u8], marker: bool) -> Vec<u8> {
        let mut packet = Vec::with_capacity(RTP_HEADER_SIZE + payload.len());
        packet.push(2 << 6);
        packet.push(((marker as u8) << 7) | self.payload_type);
        packet.extend_from_slice(&self.sequence.to_be_bytes());
        packet.extend_from_slice(&self.timestamp.to_be_bytes());
        packet.extend_from_slice(&self.ssrc.to_be_bytes());
        packet.extend_from_slice(payload);

        self.sequence = self.sequence.wrapping_add(1);
        packet
    }

    /// For video at 90 kHz the increment per frame is `90000 / fps`.
    pub fn advance_timestamp(&mut self, increment: u32) {
        self.timestamp = self.timestamp.wrapping_add(increment);
    }
}

/// Codec payloader plus RTP header state: access unit in, RTP packets out.
pub struct RtpPacketizer {
    payloader: Box<dyn Payloader>,
    sequencer: RtpSequencer,
    mtu: usize,
    clock_rate: u32,
}

impl RtpPacketizer {
    pub fn new(codec: Codec, config: PacketizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_payloader(codec.payloader(config.payloader), &config))
    }

    /// Use an already-built payloader. `config` is assumed valid.
    pub fn with_payloader(payloader: Box<dyn Payloader>, config: &PacketizerConfig) -> Self {
        let sequencer = match config.ssrc {
            Some(ssrc) => RtpSequencer::new(config.payload_type, ssrc),
            None => RtpSequencer::with_random_ssrc(config.payload_type),
        };
        Self {
            payloader,
            sequencer,
            mtu: config.mtu,
            clock_rate: config.clock_rate,
        }
    }

    /// Payload one access unit and wrap each payload in an RTP packet.
    ///
    /// All packets share the current timestamp; the marker bit is set on
    /// the last one (RFC 7798 §4.1, RFC 6184 §5.1). The timestamp then
    /// advances by `timestamp_increment`.
    pub fn packetize(&mut self, access_unit: &[u8], timestamp_increment: u32) -> Vec<Vec<u8>> {
        let payloads = self.payloader.payload(self.mtu, access_unit);
        let last = payloads.len().saturating_sub(1);
        let packets: Vec<Vec<u8>> = payloads
            .iter()
            .enumerate()
            .map(|(i, payload)| self.sequencer.wrap(payload, i == last))
            .collect();

        self.sequencer.advance_timestamp(timestamp_increment);

        tracing::trace!(
            codec = self.payloader.codec_name(),
            rtp_packets = packets.len(),
            seq = self.sequencer.sequence(),
            ts = self.sequencer.timestamp(),
            "access unit packetized"
        );

        packets
    }

    pub fn codec_name(&self) -> &'static str {
        self.payloader.codec_name()
    }

    pub fn payload_type(&self) -> u8 {
        self.sequencer.payload_type()
    }

    pub fn clock_rate(&self) -> u32 {
        self.clock_rate
    }

    pub fn mtu(&self) -> usize {
        self.mtu
    }

    pub fn next_sequence(&self) -> u16 {
        self.sequencer.sequence()
    }

    pub fn next_rtp_timestamp(&self) -> u32 {
        self.sequencer.timestamp()
    }

    pub fn stats(&self) -> PayloadStats {
        self.payloader.stats()
    }

    pub fn payloader_mut(&mut self) -> &mut dyn Payloader {
        self.payloader.as_mut()
    }

    /// SDP media-level attributes.
    ///
    /// `a=rtpmap` defines the payload type and must precede `a=fmtp`,
    /// which is present only once the payloader knows its parameters.
    pub fn sdp_attributes(&self) -> Vec<String> {
        let pt = self.payload_type();
        let mut attrs = vec![format!(
            "a=rtpmap:{} {}/{}",
            pt,
            self.codec_name(),
            self.clock_rate
        )];
        if let Some(fmtp) = self.payloader.fmtp_parameters() {
            attrs.push(format!("a=fmtp:{} {}", pt, fmtp));
        }
        attrs
    }
}

impl std::fmt::Debug for RtpPacketizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtpPacketizer")
            .field("codec", &self.codec_name())
            .field("sequencer", &self.sequencer)
            .field("mtu", &self.mtu)
            .field("clock_rate", &self.clock_rate)
            .finish()
    }
}
