//! Export of the working set as a tempo-filtered playlist
//!
//! Progress is published on a watch channel: the first 70% tracks tempo
//! resolution, the remainder the library steps.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::watch;

use crate::error::ExportError;
use crate::models::Track;
use crate::services::playlist_constructor::PlaylistConstructor;

const LOADING_SHARE: f64 = 0.7;

/// A playlist in the user's library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistHandle {
    pub id: String,
    pub name: String,
}

/// The user's playlist library
#[async_trait]
pub trait PlaylistLibrary: Send + Sync {
    /// First playlist named exactly `name`
    async fn find_playlist(&self, name: &str) -> Result<Option<PlaylistHandle>, ExportError>;

    async fn create_playlist(
        &self,
        name: &str,
        description: &str,
        tracks: &[Track],
    ) -> Result<PlaylistHandle, ExportError>;

    async fn edit_playlist(
        &self,
        playlist: &PlaylistHandle,
        name: &str,
        description: &str,
        tracks: &[Track],
    ) -> Result<(), ExportError>;
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExportProgress {
    /// Fraction complete, 0.0 to 1.0
    pub progress: f64,
    pub step: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub total: usize,
    pub matched: usize,
    /// `false` when an existing playlist was edited instead
    pub created: bool,
}

pub struct PlaylistExporter {
    progress: watch::Sender<ExportProgress>,
}

impl Default for PlaylistExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaylistExporter {
    pub fn new() -> Self {
        let (progress, _) = watch::channel(ExportProgress::default());
        Self { progress }
    }

    pub fn subscribe(&self) -> watch::Receiver<ExportProgress> {
        self.progress.subscribe()
    }

    pub fn current(&self) -> ExportProgress {
        self.progress.borrow().clone()
    }

    fn report(&self, step: impl Into<String>, progress: Option<f64>) {
        let step = step.into();
        tracing::debug!(step = %step, progress = ?progress, "Export progress");
        self.progress.send_modify(|current| {
            current.step = step;
            if let Some(progress) = progress {
                current.progress = progress;
            }
        });
    }

    fn set_progress(&self, progress: f64) {
        self.progress.send_modify(|current| current.progress = progress);
    }

    /// Wait for every tempo, then create or update the playlist named
    /// `constructor.playlist_title` with the tracks inside the tempo range
    pub async fn export(
        &self,
        constructor: &PlaylistConstructor,
        library: &dyn PlaylistLibrary,
    ) -> Result<ExportSummary, ExportError> {
        let resolvers = constructor.resolvers();
        let total = resolvers.len();
        self.report("Loading track tempos...", Some(0.0));

        let mut loading: FuturesUnordered<_> = resolvers.iter().map(|r| r.wait()).collect();
        let mut done = 0usize;
        while loading.next().await.is_some() {
            done += 1;
            self.set_progress((done as f64 / total as f64 * LOADING_SHARE).min(1.0));
        }

        self.report("Scanning songs for ones that fit...", None);
        let range = constructor.tempo_range();
        let matching: Vec<Track> = resolvers
            .iter()
            .filter(|r| r.tempo().is_some_and(|tempo| range.contains(&tempo)))
            .map(|r| r.track().clone())
            .collect();

        let title = constructor.playlist_title.as_str();
        let description = format!(
            "Tempo range of {} to {} bpm",
            range.start().round() as i64,
            range.end().round() as i64
        );

        self.report("Searching for existing playlist...", Some(0.8));
        let result = self.save(library, title, &description, &matching).await;

        match result {
            Ok(created) => {
                tracing::info!(
                    playlist = title,
                    total,
                    matched = matching.len(),
                    created,
                    "Playlist exported"
                );
                Ok(ExportSummary {
                    total,
                    matched: matching.len(),
                    created,
                })
            }
            Err(err) => {
                self.report("Failed to create playlist, Rolling back...", Some(1.0));
                tracing::error!(playlist = title, error = %err, "Failed to save playlist");
                Err(err)
            }
        }
    }

    async fn save(
        &self,
        library: &dyn PlaylistLibrary,
        title: &str,
        description: &str,
        tracks: &[Track],
    ) -> Result<bool, ExportError> {
        match library.find_playlist(title).await? {
            Some(playlist) => {
                self.report("Editing existing playlist...", Some(0.9));
                library
                    .edit_playlist(&playlist, title, description, tracks)
                    .await?;
                self.report(format!("Updated playlist \"{}\"", title), Some(1.0));
                Ok(false)
            }
            None => {
                self.report(format!("Creating playlist \"{}\"...", title), Some(0.9));
                library.create_playlist(title, description, tracks).await?;
                self.report(format!("Finalizing playlist \"{}\"...", title), Some(1.0));
                Ok(true)
            }
        }
    }
}
