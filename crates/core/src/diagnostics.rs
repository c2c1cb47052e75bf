//! Observability hook for the payloaders.
//!
//! The packetization transform has no side effects of its own. Each notable
//! decision is described by a [`PayloadEvent`]; the payloader folds it into
//! its [`PayloadStats`], emits a `tracing` event and forwards it to an
//! optional caller-supplied [`PayloadObserver`].

/// One decision taken while payloading an access unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadEvent {
    /// A NAL unit fit in the MTU and was copied into one payload.
    SingleNal { nal_type: u8, len: usize },
    /// A parameter set was emitted as its own payload.
    ParameterSet { nal_type: u8, len: usize },
    /// A NAL unit was split into fragmentation units.
    Fragmented {
        nal_type: u8,
        nal_len: usize,
        fragments: usize,
    },
    /// The MTU cannot carry a fragment header plus one byte; the NAL unit
    /// produced no output.
    MtuTooSmall {
        nal_type: u8,
        nal_len: usize,
        mtu: usize,
    },
    /// VPS/SPS/PPS were combined into one aggregation payload.
    AggregationEmitted { len: usize },
    /// The aggregation payload exceeded the MTU and was discarded.
    AggregationDropped { len: usize, mtu: usize },
}

/// Caller-supplied sink for [`PayloadEvent`]s.
pub trait PayloadObserver: Send {
    fn on_event(&mut self, event: &PayloadEvent);
}

/// Running counters kept by each payloader instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadStats {
    pub single_nal: u64,
    pub parameter_sets: u64,
    pub fragmented_nals: u64,
    pub fragments: u64,
    pub mtu_too_small: u64,
    pub aggregates_emitted: u64,
    pub aggregates_dropped: u64,
}

impl PayloadStats {
    pub fn record(&mut self, event: &PayloadEvent) {
        match *event {
            PayloadEvent::SingleNal { .. } => self.single_nal += 1,
            PayloadEvent::ParameterSet { .. } => self.parameter_sets += 1,
            PayloadEvent::Fragmented { fragments, .. } => {
                self.fragmented_nals += 1;
                self.fragments += fragments as u64;
            }
            PayloadEvent::MtuTooSmall { .. } => self.mtu_too_small += 1,
            PayloadEvent::AggregationEmitted { .. } => self.aggregates_emitted += 1,
            PayloadEvent::AggregationDropped { .. } => self.aggregates_dropped += 1,
        }
    }
}

/// Event plumbing shared by the codec payloaders.
#[derive(Default)]
pub(crate) struct Diagnostics {
    stats: PayloadStats,
    observer: Option<Box<dyn PayloadObserver>>,
}

impl Diagnostics {
    pub(crate) fn set_observer(&mut self, observer: Box<dyn PayloadObserver>) {
        self.observer = Some(observer);
    }

    pub(crate) fn stats(&self) -> PayloadStats {
        self.stats
    }

    pub(crate) fn emit(&mut self, codec: &'static str, event: PayloadEvent) {
        match &event {
            PayloadEvent::MtuTooSmall {
                nal_type,
                nal_len,
                mtu,
            } => tracing::warn!(
                codec,
                nal_type,
                nal_len,
                mtu,
                "MTU too small for fragmentation header, NAL unit dropped"
            ),
            PayloadEvent::AggregationDropped { len, mtu } => tracing::warn!(
                codec,
                len,
                mtu,
                "parameter set aggregation exceeds MTU, dropped"
            ),
            other => tracing::trace!(codec, event = ?other, "payload event"),
        }
        self.stats.record(&event);
        if let Some(observer) = self.observer.as_mut() {
            observer.on_event(&event);
        }
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("stats", &self.stats)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
