//! Counting in-memory collaborators for resolver and export tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use pace_tempo::error::{ExportError, LookupError, TempoError};
use pace_tempo::models::{CatalogSong, LookupRecord, Track, TrackKey};
use pace_tempo::db::TempoCache;
use pace_tempo::services::{CatalogMetadata, LookupService, PlaylistHandle, PlaylistLibrary};

/// Tempo cache that counts calls and can be told to fail inserts
#[derive(Default)]
pub struct MockCache {
    entries: Mutex<HashMap<TrackKey, f64>>,
    failing_inserts: Mutex<HashSet<TrackKey>>,
    pub lookups: AtomicUsize,
    pub inserts: AtomicUsize,
    pub flushes: AtomicUsize,
}

impl MockCache {
    pub fn with_entries(entries: &[(&str, f64)]) -> Self {
        let cache = Self::default();
        {
            let mut map = cache.entries.lock().unwrap();
            for (key, tempo) in entries {
                map.insert(TrackKey::new(*key), *tempo);
            }
        }
        cache
    }

    pub fn fail_insert_for(&self, key: &str) {
        self.failing_inserts.lock().unwrap().insert(TrackKey::new(key));
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.lock().unwrap().get(&TrackKey::new(key)).copied()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TempoCache for MockCache {
    async fn lookup(&self, key: &TrackKey) -> pace_common::Result<Option<f64>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.lock().unwrap().get(key).copied())
    }

    async fn insert(&self, key: &TrackKey, tempo: f64) -> pace_common::Result<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.failing_inserts.lock().unwrap().contains(key) {
            return Err(pace_common::Error::Internal(format!("insert failed for {}", key)));
        }
        self.entries.lock().unwrap().entry(key.clone()).or_insert(tempo);
        Ok(())
    }

    async fn flush(&self) -> pace_common::Result<usize> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }
}

/// Catalog with per-track ISRCs and failures
#[derive(Default)]
pub struct MockCatalog {
    isrcs: Mutex<HashMap<TrackKey, String>>,
    failing: Mutex<HashSet<TrackKey>>,
    pub searches: AtomicUsize,
}

impl MockCatalog {
    pub fn with_isrc(self, key: &str, isrc: &str) -> Self {
        self.isrcs.lock().unwrap().insert(TrackKey::new(key), isrc.to_string());
        self
    }

    pub fn failing_for(self, key: &str) -> Self {
        self.failing.lock().unwrap().insert(TrackKey::new(key));
        self
    }
}

#[async_trait]
impl CatalogMetadata for MockCatalog {
    async fn fetch_isrc(&self, track: &Track) -> Result<Option<String>, TempoError> {
        if self.failing.lock().unwrap().contains(&track.id) {
            return Err(TempoError::Metadata(format!("catalog unavailable for {}", track.id)));
        }
        Ok(self.isrcs.lock().unwrap().get(&track.id).cloned())
    }

    async fn search_top_songs(&self, _term: &str) -> Result<Vec<CatalogSong>, TempoError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Lookup service that replays scripted responses and records every request
#[derive(Default)]
pub struct MockLookup {
    responses: Mutex<VecDeque<Result<Vec<LookupRecord>, LookupError>>>,
    requests: Mutex<Vec<Vec<LookupRecord>>>,
}

impl MockLookup {
    pub fn replying(responses: Vec<Result<Vec<LookupRecord>, LookupError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Vec<LookupRecord>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LookupService for MockLookup {
    async fn run_lookup(&self, records: &[LookupRecord]) -> Result<Vec<LookupRecord>, LookupError> {
        self.requests.lock().unwrap().push(records.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Lookup service that answers every record with a fixed tempo
pub struct EchoLookup {
    pub tempo: f64,
    pub calls: AtomicUsize,
}

impl EchoLookup {
    pub fn new(tempo: f64) -> Self {
        Self {
            tempo,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LookupService for EchoLookup {
    async fn run_lookup(&self, records: &[LookupRecord]) -> Result<Vec<LookupRecord>, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(records
            .iter()
            .map(|r| LookupRecord {
                tempo: Some(self.tempo),
                ..r.clone()
            })
            .collect())
    }
}

/// Result record as the service would return it
pub fn result_record(artist: &str, album: Option<&str>, title: &str, tempo: f64) -> LookupRecord {
    LookupRecord {
        tempo: Some(tempo),
        isrc: None,
        artist: artist.to_string(),
        album: album.map(str::to_string),
        title: title.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LibraryCall {
    Find(String),
    Create {
        name: String,
        description: String,
        tracks: Vec<TrackKey>,
    },
    Edit {
        id: String,
        name: String,
        description: String,
        tracks: Vec<TrackKey>,
    },
}

/// Playlist library recording every call
#[derive(Default)]
pub struct MockLibrary {
    existing: Mutex<Vec<PlaylistHandle>>,
    fail_writes: bool,
    calls: Mutex<Vec<LibraryCall>>,
}

impl MockLibrary {
    pub fn with_playlist(id: &str, name: &str) -> Self {
        let library = Self::default();
        library.existing.lock().unwrap().push(PlaylistHandle {
            id: id.to_string(),
            name: name.to_string(),
        });
        library
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<LibraryCall> {
        self.calls.lock().unwrap().clone()
    }
}

fn keys(tracks: &[Track]) -> Vec<TrackKey> {
    tracks.iter().map(|t| t.id.clone()).collect()
}

#[async_trait]
impl PlaylistLibrary for MockLibrary {
    async fn find_playlist(&self, name: &str) -> Result<Option<PlaylistHandle>, ExportError> {
        self.calls.lock().unwrap().push(LibraryCall::Find(name.to_string()));
        Ok(self
            .existing
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn create_playlist(
        &self,
        name: &str,
        description: &str,
        tracks: &[Track],
    ) -> Result<PlaylistHandle, ExportError> {
        self.calls.lock().unwrap().push(LibraryCall::Create {
            name: name.to_string(),
            description: description.to_string(),
            tracks: keys(tracks),
        });
        if self.fail_writes {
            return Err(ExportError::Library("library is read-only".to_string()));
        }
        Ok(PlaylistHandle {
            id: "new".to_string(),
            name: name.to_string(),
        })
    }

    async fn edit_playlist(
        &self,
        playlist: &PlaylistHandle,
        name: &str,
        description: &str,
        tracks: &[Track],
    ) -> Result<(), ExportError> {
        self.calls.lock().unwrap().push(LibraryCall::Edit {
            id: playlist.id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            tracks: keys(tracks),
        });
        if self.fail_writes {
            return Err(ExportError::Library("library is read-only".to_string()));
        }
        Ok(())
    }
}
