use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::PacketizerConfig;
use crate::error::{HevcRtpError, Result};
use crate::media::Codec;
use crate::media::rtp::RtpPacketizer;

/// One outgoing video stream (e.g. `video0`).
///
/// Owns the packetizer for its codec. The packetizer's payloader keeps
/// per-stream state and must see access units in encoder order, so every
/// call goes through one lock.
pub struct LocalTrack {
    id: String,
    packetizer: Mutex<RtpPacketizer>,
}

impl LocalTrack {
    pub fn new(id: &str, packetizer: RtpPacketizer) -> Self {
        Self {
            id: id.to_string(),
            packetizer: Mutex::new(packetizer),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Packetize one access unit into RTP packets using this track's codec.
    pub fn packetize(&self, access_unit: &[u8], timestamp_increment: u32) -> Vec<Vec<u8>> {
        self.packetizer
            .lock()
            .packetize(access_unit, timestamp_increment)
    }

    pub fn codec_name(&self) -> &'static str {
        self.packetizer.lock().codec_name()
    }

    /// SDP media-level attributes (delegated to the packetizer).
    pub fn sdp_attributes(&self) -> Vec<String> {
        self.packetizer.lock().sdp_attributes()
    }

    pub fn next_sequence(&self) -> u16 {
        self.packetizer.lock().next_sequence()
    }

    pub fn next_rtp_timestamp(&self) -> u32 {
        self.packetizer.lock().next_rtp_timestamp()
    }

    pub fn stats(&self) -> crate::diagnostics::PayloadStats {
        self.packetizer.lock().stats()
    }
}

impl std::fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTrack").field("id", &self.id).finish()
    }
}

/// Registry of outgoing tracks, keyed by id.
///
/// Each track has its own packetizer; tracks share no payloader state.
#[derive(Clone, Default)]
pub struct TrackRegistry {
    tracks: Arc<RwLock<HashMap<String, Arc<LocalTrack>>>>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a track. Replaces any existing track with the same id.
    pub fn add(&self, id: &str, codec: Codec, config: PacketizerConfig) -> Result<Arc<LocalTrack>> {
        let track = Arc::new(LocalTrack::new(id, RtpPacketizer::new(codec, config)?));
        self.tracks.write().insert(id.to_string(), track.clone());
        tracing::info!(id, codec = codec.name(), "track registered");
        Ok(track)
    }

    pub fn get(&self, id: &str) -> Result<Arc<LocalTrack>> {
        self.tracks
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| HevcRtpError::TrackNotFound(id.to_string()))
    }

    pub fn remove(&self, id: &str) -> Option<Arc<LocalTrack>> {
        let removed = self.tracks.write().remove(id);
        if removed.is_some() {
            tracing::info!(id, "track removed");
        }
        removed
    }

    /// Registered track ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tracks.read().keys().cloned().collect();
        ids.sort();
        ids
    }
}
