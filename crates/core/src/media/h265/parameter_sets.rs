//! VPS/SPS/PPS retention and the optional aggregation payload.
//!
//! Aggregation payload layout:
//!
//! ```text
//! [AP header (1)][len (2, BE)][VPS][len (2, BE)][SPS][len (2, BE)][PPS]
//! ```

use crate::config::ParameterSetMode;

use super::header::{NalUnitType, nal_type};

/// Single-byte header that opens an aggregation payload.
pub const AGGREGATION_HEADER: u8 = 0x78;

const AGGREGATION_LENGTH_SIZE: usize = 2;

const PENDING_VPS: u8 = 0b001;
const PENDING_SPS: u8 = 0b010;
const PENDING_PPS: u8 = 0b100;
const PENDING_ALL: u8 = PENDING_VPS | PENDING_SPS | PENDING_PPS;

/// Outcome of resolving a complete set of pending parameter sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAggregate {
    /// Aggregation payload that fits the MTU.
    Ready(Vec<u8>),
    /// The combined payload would be `len` bytes, above the MTU. Nothing
    /// is emitted for it.
    Oversized { len: usize },
}

/// Most recently seen VPS, SPS and PPS for one outgoing stream.
///
/// The latest copy of each kind is always retained (newer overwrites
/// older). Separately, a pending mask records which kinds arrived since the
/// last aggregation was resolved.
#[derive(Debug, Default)]
pub struct ParameterSetCache {
    mode: ParameterSetMode,
    vps: Option<Vec<u8>>,
    sps: Option<Vec<u8>>,
    pps: Option<Vec<u8>>,
    pending: u8,
}

impl ParameterSetCache {
    pub fn new(mode: ParameterSetMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> ParameterSetMode {
        self.mode
    }

    /// Record a VPS/SPS/PPS NAL unit.
    ///
    /// In [`ParameterSetMode::Standalone`] the verbatim copy to send as a
    /// single-NAL payload is returned. In [`ParameterSetMode::Aggregate`]
    /// the unit is held for [`take_pending`](Self::take_pending) and nothing
    /// is returned. Other NAL types are ignored.
    pub fn observe(&mut self, nal: &[u8]) -> Option<Vec<u8>> {
        let &first = nal.first()?;
        let (slot, bit) = match nal_type(first) {
            NalUnitType::VPS => (&mut self.vps, PENDING_VPS),
            NalUnitType::SPS => (&mut self.sps, PENDING_SPS),
            NalUnitType::PPS => (&mut self.pps, PENDING_PPS),
            _ => return None,
        };
        *slot = Some(nal.to_vec());

        match self.mode {
            ParameterSetMode::Standalone => Some(nal.to_vec()),
            ParameterSetMode::Aggregate => {
                self.pending |= bit;
                None
            }
        }
    }

    /// Whether all three kinds are pending aggregation.
    pub fn has_pending(&self) -> bool {
        self.mode == ParameterSetMode::Aggregate && self.pending == PENDING_ALL
    }

    /// Resolve a complete pending set into an aggregation payload.
    ///
    /// Returns `None` unless aggregation is enabled and VPS, SPS and PPS
    /// have all arrived since the last resolution. Either outcome clears
    /// the pending mask.
    pub fn take_pending(&mut self, mtu: usize) -> Option<PendingAggregate> {
        if !self.has_pending() {
            return None;
        }
        let (vps, sps, pps) = (self.vps.as_deref()?, self.sps.as_deref()?, self.pps.as_deref()?);

        let len = 1 + 3 * AGGREGATION_LENGTH_SIZE + vps.len() + sps.len() + pps.len();
        let fits_length_fields = [vps, sps, pps]
            .iter()
            .all(|nal| u16::try_from(nal.len()).is_ok());

        let outcome = if len <= mtu && fits_length_fields {
            let mut packet = Vec::with_capacity(len);
            packet.push(AGGREGATION_HEADER);
            for nal in [vps, sps, pps] {
                packet.extend_from_slice(&(nal.len() as u16).to_be_bytes());
                packet.extend_from_slice(nal);
            }
            PendingAggregate::Ready(packet)
        } else {
            PendingAggregate::Oversized { len }
        };

        self.reset_pending();
        Some(outcome)
    }

    /// Forget which kinds are pending; the retained copies stay.
    pub fn reset_pending(&mut self) {
        self.pending = 0;
    }

    /// Drop all retained parameter sets.
    pub fn reset(&mut self) {
        self.vps = None;
        self.sps = None;
        self.pps = None;
        self.pending = 0;
    }

    pub fn vps(&self) -> Option<&[u8]> {
        self.vps.as_deref()
    }

    pub fn sps(&self) -> Option<&[u8]> {
        self.sps.as_deref()
    }

    pub fn pps(&self) -> Option<&[u8]> {
        self.pps.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VPS: [u8; 4] = [0x40, 0x01, 0x0C, 0x01];
    const SPS: [u8; 5] = [0x42, 0x01, 0x01, 0x01, 0x60];
    const PPS: [u8; 3] = [0x44, 0x01, 0xC1];

    fn observe_all(cache: &mut ParameterSetCache) {
        cache.observe(&VPS);
        cache.observe(&SPS);
        cache.observe(&PPS);
    }

    #[test]
    fn standalone_returns_verbatim_copy() {
        let mut cache = ParameterSetCache::new(ParameterSetMode::Standalone);
        assert_eq!(cache.observe(&VPS), Some(VPS.to_vec()));
        assert_eq!(cache.observe(&SPS), Some(SPS.to_vec()));
        assert_eq!(cache.observe(&PPS), Some(PPS.to_vec()));
        assert!(!cache.has_pending());
        assert_eq!(cache.take_pending(1500), None);
        assert_eq!(cache.sps(), Some(&SPS[..]));
    }

    #[test]
    fn latest_overwrites() {
        let mut cache = ParameterSetCache::default();
        cache.observe(&SPS);
        let newer = [0x42, 0x01, 0x02];
        cache.observe(&newer);
        assert_eq!(cache.sps(), Some(&newer[..]));
    }

    #[test]
    fn non_parameter_set_ignored() {
        let mut cache = ParameterSetCache::new(ParameterSetMode::Aggregate);
        assert_eq!(cache.observe(&[0x26, 0x01, 0xAA]), None);
        assert_eq!(cache.observe(&[]), None);
        assert!(cache.vps().is_none());
    }

    #[test]
    fn aggregate_layout() {
        let mut cache = ParameterSetCache::new(ParameterSetMode::Aggregate);
        observe_all(&mut cache);
        assert!(cache.has_pending());

        let Some(PendingAggregate::Ready(ap)) = cache.take_pending(1500) else {
            panic!("expected aggregation payload");
        };
        let mut expected = vec![AGGREGATION_HEADER, 0, 4];
        expected.extend_from_slice(&VPS);
        expected.extend_from_slice(&[0, 5]);
        expected.extend_from_slice(&SPS);
        expected.extend_from_slice(&[0, 3]);
        expected.extend_from_slice(&PPS);
        assert_eq!(ap, expected);
    }

    #[test]
    fn aggregate_does_not_repeat_until_all_seen_again() {
        let mut cache = ParameterSetCache::new(ParameterSetMode::Aggregate);
        observe_all(&mut cache);
        assert!(cache.take_pending(1500).is_some());
        assert!(cache.take_pending(1500).is_none());

        cache.observe(&SPS);
        cache.observe(&PPS);
        assert!(cache.take_pending(1500).is_none());
        cache.observe(&VPS);
        assert!(cache.take_pending(1500).is_some());
    }

    #[test]
    fn oversized_aggregate_dropped_and_cleared() {
        let mut cache = ParameterSetCache::new(ParameterSetMode::Aggregate);
        observe_all(&mut cache);
        // 1 + 6 + 4 + 5 + 3 = 19
        assert_eq!(
            cache.take_pending(18),
            Some(PendingAggregate::Oversized { len: 19 })
        );
        assert!(!cache.has_pending());
        assert_eq!(cache.pps(), Some(&PPS[..]));
    }

    #[test]
    fn reset_clears_everything() {
        let mut cache = ParameterSetCache::new(ParameterSetMode::Aggregate);
        observe_all(&mut cache);
        cache.reset();
        assert!(!cache.has_pending());
        assert!(cache.vps().is_none() && cache.sps().is_none() && cache.pps().is_none());
    }
}
