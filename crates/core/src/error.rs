//! Error types for the HEVC RTP payloading library.

use std::fmt;

/// Errors that can occur in the payloading library.
///
/// The packetization transform itself never fails: degenerate input and
/// undersized MTUs are reported through [`PayloadEvent`](crate::diagnostics::PayloadEvent)
/// instead. These variants cover construction, configuration and the
/// fallible helper APIs:
///
/// - **Configuration**: [`InvalidMtu`](Self::InvalidMtu),
///   [`InvalidPayloadType`](Self::InvalidPayloadType).
/// - **Bitstream**: [`InvalidNalHeader`](Self::InvalidNalHeader).
/// - **Tracks**: [`TrackNotFound`](Self::TrackNotFound).
/// - **I/O**: [`Io`](Self::Io), reading access units from disk.
#[derive(Debug, thiserror::Error)]
pub enum HevcRtpError {
    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// MTU must be a positive number of bytes.
    #[error("invalid MTU: {mtu}")]
    InvalidMtu { mtu: usize },

    /// NAL unit too short to carry its header.
    #[error("invalid NAL header: {kind}")]
    InvalidNalHeader { kind: NalHeaderErrorKind },

    /// RTP payload type is a 7-bit field (RFC 3550 §5.1).
    #[error("invalid RTP payload type: {0} (must be <= 127)")]
    InvalidPayloadType(u8),

    /// No track registered under the given id.
    #[error("track not found: {0}")]
    TrackNotFound(String),
}

/// Specific kind of NAL header failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalHeaderErrorKind {
    /// The NAL unit had no bytes at all.
    Empty,
    /// Fewer bytes than the codec's NAL header length.
    Truncated { expected: usize, actual: usize },
}

impl fmt::Display for NalHeaderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty NAL unit"),
            Self::Truncated { expected, actual } => {
                write!(f, "expected {expected} header bytes, got {actual}")
            }
        }
    }
}

/// Convenience alias for `Result<T, HevcRtpError>`.
pub type Result<T> = std::result::Result<T, HevcRtpError>;
