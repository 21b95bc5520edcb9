//! Working set of candidate tracks for a tempo-filtered playlist

use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::models::Track;
use crate::services::tempo_resolver::{TempoResolver, TempoService};

pub const DEFAULT_TEMPO: u32 = 120;
pub const DEFAULT_FIT_PERCENT: u32 = 25;

pub struct PlaylistConstructor {
    service: Arc<TempoService>,
    resolvers: Vec<TempoResolver>,
    pub playlist_title: String,
    pub tempo: u32,
    pub fit: u32,
}

impl PlaylistConstructor {
    pub fn new(service: Arc<TempoService>) -> Self {
        Self {
            service,
            resolvers: Vec::new(),
            playlist_title: String::new(),
            tempo: DEFAULT_TEMPO,
            fit: DEFAULT_FIT_PERCENT,
        }
    }

    /// Accepted tempos: `tempo` plus or minus `fit` percent
    pub fn tempo_range(&self) -> RangeInclusive<f64> {
        let fit = f64::from(self.fit) / 100.0;
        let tempo = f64::from(self.tempo);
        (tempo * (1.0 - fit))..=(tempo * (1.0 + fit))
    }

    pub fn resolvers(&self) -> &[TempoResolver] {
        &self.resolvers
    }

    pub fn contains(&self, track: &Track) -> bool {
        self.resolvers.iter().any(|r| r.track().is_same_track(track))
    }

    /// Add `track` and start resolving its tempo; already-present tracks are skipped
    pub fn add_track(&mut self, track: Track) -> bool {
        if self.contains(&track) {
            tracing::debug!(track_id = %track.id, "Track already in working set");
            return false;
        }
        let resolver = self.service.resolve(track);
        self.resolvers.push(resolver);
        true
    }

    /// Returns how many tracks were newly added
    pub fn add_tracks(&mut self, tracks: impl IntoIterator<Item = Track>) -> usize {
        tracks
            .into_iter()
            .filter(|track| self.add_track(track.clone()))
            .count()
    }

    /// Remove the first entry for `track`; its pending result is discarded
    pub fn remove_track(&mut self, track: &Track) -> bool {
        match self
            .resolvers
            .iter()
            .position(|r| r.track().is_same_track(track))
        {
            Some(index) => {
                self.resolvers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn remove_tracks<'a>(&mut self, tracks: impl IntoIterator<Item = &'a Track>) -> usize {
        tracks
            .into_iter()
            .filter(|track| self.remove_track(track))
            .count()
    }

    pub fn total_count(&self) -> usize {
        self.resolvers.len()
    }

    /// Tracks with a resolved tempo inside [`Self::tempo_range`]
    pub fn matching_count(&self) -> usize {
        let range = self.tempo_range();
        self.resolvers
            .iter()
            .filter(|r| r.tempo().is_some_and(|tempo| range.contains(&tempo)))
            .count()
    }
}
