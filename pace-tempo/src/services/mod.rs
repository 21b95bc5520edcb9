//! Tempo resolution services
//!
//! Leaf collaborators (lookup client, catalog) up to the per-track resolver
//! and the playlist flow built on top of it.

pub mod batch_scheduler;
pub mod bpm_lookup_client;
pub mod catalog;
pub mod playlist_constructor;
pub mod playlist_exporter;
pub mod tempo_resolver;

pub use batch_scheduler::{BatchScheduler, ScheduleError};
pub use bpm_lookup_client::{BpmLookupClient, LookupService};
pub use catalog::{resolve_isrc, CatalogMetadata, NullCatalog};
pub use playlist_constructor::PlaylistConstructor;
pub use playlist_exporter::{
    ExportProgress, ExportSummary, PlaylistExporter, PlaylistHandle, PlaylistLibrary,
};
pub use tempo_resolver::{
    handle_batch, PendingTempo, Promise, ResolutionState, TempoResolver, TempoService,
};
