use crate::error::{HevcRtpError, NalHeaderErrorKind, Result};

/// Length of the H.265 NAL unit header (ITU-T H.265 §7.3.1.2).
pub const NAL_HEADER_SIZE: usize = 2;

/// H.265 NAL unit types referenced by the payloader.
pub struct NalUnitType;

impl NalUnitType {
    pub const TRAIL_R: u8 = 1;
    pub const IDR_W_RADL: u8 = 19;
    pub const IDR_N_LP: u8 = 20;
    pub const VPS: u8 = 32;
    pub const SPS: u8 = 33;
    pub const PPS: u8 = 34;
    pub const AUD: u8 = 35;
    /// Aggregation packet (RFC 7798 §4.4.2).
    pub const AP: u8 = 48;
    /// Fragmentation unit (RFC 7798 §4.4.3).
    pub const FU: u8 = 49;
}

/// Extract the 6-bit type from the first header byte.
#[inline]
pub fn nal_type(byte0: u8) -> u8 {
    (byte0 >> 1) & 0x3F
}

/// Whether `nal_type` is a VPS, SPS or PPS.
#[inline]
pub fn is_parameter_set(nal_type: u8) -> bool {
    matches!(
        nal_type,
        NalUnitType::VPS | NalUnitType::SPS | NalUnitType::PPS
    )
}

/// Two-byte H.265 NAL unit header.
///
/// ```text
/// +---------------+---------------+
/// |0|1|2|3|4|5|6|7|0|1|2|3|4|5|6|7|
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |F|   Type    |  LayerId  | TID |
/// +-------------+-----------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct H265NalHeader([u8; NAL_HEADER_SIZE]);

impl H265NalHeader {
    pub fn new(byte0: u8, byte1: u8) -> Self {
        Self([byte0, byte1])
    }

    /// Parse the header at the front of a NAL unit.
    pub fn parse(nal: &[u8]) -> Result<Self> {
        match nal {
            [] => Err(HevcRtpError::InvalidNalHeader {
                kind: NalHeaderErrorKind::Empty,
            }),
            [_] => Err(HevcRtpError::InvalidNalHeader {
                kind: NalHeaderErrorKind::Truncated {
                    expected: NAL_HEADER_SIZE,
                    actual: 1,
                },
            }),
            [b0, b1, ..] => Ok(Self::new(*b0, *b1)),
        }
    }

    pub fn bytes(&self) -> [u8; NAL_HEADER_SIZE] {
        self.0
    }

    pub fn nal_type(&self) -> u8 {
        nal_type(self.0[0])
    }

    /// Forbidden zero bit. Preserved, never interpreted.
    pub fn forbidden_zero(&self) -> bool {
        self.0[0] & 0x80 != 0
    }

    /// 6-bit nuh_layer_id, split across both bytes.
    pub fn layer_id(&self) -> u8 {
        ((self.0[0] & 0x01) << 5) | (self.0[1] >> 3)
    }

    /// nuh_temporal_id_plus1.
    pub fn tid(&self) -> u8 {
        self.0[1] & 0x07
    }

    pub fn is_parameter_set(&self) -> bool {
        is_parameter_set(self.nal_type())
    }

    /// VCL NAL units (coded slices) have types 0..=31.
    pub fn is_vcl(&self) -> bool {
        self.nal_type() < 32
    }

    /// Same header with the type field replaced; F, LayerId and TID kept.
    pub fn with_type(&self, nal_type: u8) -> Self {
        Self::new((self.0[0] & 0x81) | ((nal_type & 0x3F) << 1), self.0[1])
    }
}
