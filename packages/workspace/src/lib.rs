//! # Studio Workspace
//!
//! Runtime around the editor core: the builder and canvas realms, the
//! timer service, the sync queue that ships patches to a persistence
//! endpoint, and the reference persistence server.
//!
//! ```rust,ignore
//! let config = StudioConfig::load(std::env::current_dir()?)?;
//! let persistence = Arc::new(HttpPersistence::new(&config.endpoint));
//! let studio = Studio::start(config, persistence).await?;
//!
//! studio.builder().select(root_id)?;
//! studio.flush().await;
//! ```

pub mod config;
mod errors;
pub mod persistence;
pub mod project_store;
pub mod realm;
pub mod server;
mod studio;
pub mod sync;
pub mod timer;

pub use config::StudioConfig;
pub use errors::{ProjectStoreError, StudioError, SyncError};
pub use persistence::{HttpPersistence, MemoryPersistence, Persistence, SharedProjectStore};
pub use project_store::{ApplyOutcome, PersistResponse, ProjectStore, StoredDocument, SyncBatch, TreeDocument};
pub use realm::{BuilderRealm, BuilderState, CanvasOptions, CanvasRealm, RectKind};
pub use studio::Studio;
pub use sync::{harvest, spawn_harvester, SyncJob, SyncQueue};
pub use timer::{Debouncer, TimerHandle, TimerService};
