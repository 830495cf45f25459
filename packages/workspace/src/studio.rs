//! # Studio
//!
//! Wires one editing session together:
//!
//! ```text
//!   BuilderRealm ──bus──▶ CanvasRealm ──▶ EditSession / DocumentStore
//!        ▲                    │                     │
//!        └────── view ────────┘                 PatchLog
//!                                                   │ harvester (timer)
//!                                                   ▼
//!                                   SyncQueue ──▶ Persistence
//! ```

use crate::config::StudioConfig;
use crate::errors::StudioError;
use crate::persistence::Persistence;
use crate::project_store::TreeDocument;
use crate::realm::{BuilderRealm, CanvasOptions, CanvasRealm};
use crate::sync::{harvest, spawn_harvester, SyncQueue};
use crate::timer::{TimerHandle, TimerService};
use std::sync::Arc;
use studio_bus::MessageBus;
use studio_canvas::DropOptions;
use studio_editor::{EditSession, PatchLog};
use studio_model::IdGenerator;

pub struct Studio {
    config: StudioConfig,
    builder: BuilderRealm,
    canvas: CanvasRealm,
    queue: SyncQueue,
    timers: TimerService,
    persistence: Arc<dyn Persistence>,
    log: PatchLog,
    harvester: TimerHandle,
}

impl Studio {
    /// Load the configured tree, seeding a default one when the server has
    /// none, and bring both realms up.
    pub async fn start(
        config: StudioConfig,
        persistence: Arc<dyn Persistence>,
    ) -> Result<Self, StudioError> {
        let mut ids = IdGenerator::for_tree(&config.tree_id);

        let document = match persistence.fetch(&config.project_id, &config.tree_id).await? {
            Some(document) => document,
            None => {
                let document = TreeDocument::new_default(&mut ids)?;
                persistence
                    .seed(&config.project_id, &config.tree_id, document.clone())
                    .await?;
                tracing::info!(
                    project_id = %config.project_id,
                    tree_id = %config.tree_id,
                    "Seeded new tree"
                );
                document
            }
        };

        let store = document.into_store().with_undo_levels(config.undo_levels);
        let log = store.patch_log();
        let session = EditSession::with_ids(config.tree_id.clone(), store, ids);

        let timers = TimerService::new();
        let queue = SyncQueue::new();

        let (builder_endpoint, canvas_endpoint) = MessageBus::new();
        let builder = BuilderRealm::mount(builder_endpoint)?;
        let mut canvas = CanvasRealm::mount(
            canvas_endpoint,
            session,
            &timers,
            CanvasOptions {
                drop: DropOptions {
                    edge_threshold: config.drop_edge_threshold,
                },
                snapshot_debounce: config.snapshot_debounce(),
            },
        )?;
        canvas.forward_sync_status(queue.status());
        canvas.publish_snapshot();

        let harvester = spawn_harvester(
            &timers,
            config.sync_interval(),
            log.clone(),
            queue.clone(),
            persistence.clone(),
            config.project_id.clone(),
            config.tree_id.clone(),
        );

        tracing::debug!(tree_id = %config.tree_id, "Studio started");

        Ok(Self {
            config,
            builder,
            canvas,
            queue,
            timers,
            persistence,
            log,
            harvester,
        })
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn builder(&self) -> &BuilderRealm {
        &self.builder
    }

    pub fn canvas(&self) -> &CanvasRealm {
        &self.canvas
    }

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    /// Send pending patches now and wait until the queue is idle
    pub async fn flush(&self) {
        harvest(
            &self.log,
            &self.queue,
            &self.persistence,
            &self.config.project_id,
            &self.config.tree_id,
        );
        self.queue.wait_idle().await;
    }

    /// Stop the harvester, flush what is left and cancel every timer
    pub async fn shutdown(self) {
        self.harvester.cancel();
        self.flush().await;
        self.timers.shutdown();
    }
}
