//! Reference persistence server.
//!
//! ```text
//! POST /rest/patch                          apply a SyncBatch
//! GET  /rest/tree/:project_id/:tree_id      current document
//! PUT  /rest/tree/:project_id/:tree_id      seed a document
//! ```

use crate::persistence::{lock_store, SharedProjectStore};
use crate::project_store::{ApplyOutcome, PersistResponse, SyncBatch, TreeDocument};
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

pub fn router(store: SharedProjectStore) -> Router {
    Router::new()
        .route("/rest/patch", post(patch_handler))
        .route("/rest/tree/:project_id/:tree_id", get(get_tree_handler).put(put_tree_handler))
        .with_state(store)
        .layer(CorsLayer::permissive())
}

async fn patch_handler(
    State(store): State<SharedProjectStore>,
    Json(batch): Json<SyncBatch>,
) -> (StatusCode, Json<PersistResponse>) {
    let result = lock_store(&store).apply(&batch);
    match result {
        Ok(ApplyOutcome::Applied) => {
            tracing::info!(
                batch_id = %batch.batch_id,
                project_id = %batch.project_id,
                tree_id = %batch.tree_id,
                transactions = batch.transactions.len(),
                "Applied batch"
            );
            (StatusCode::OK, Json(PersistResponse::ok()))
        }
        Ok(ApplyOutcome::Duplicate) => {
            tracing::info!(batch_id = %batch.batch_id, "Batch already applied");
            (StatusCode::OK, Json(PersistResponse::ok()))
        }
        Err(e) => {
            tracing::warn!(batch_id = %batch.batch_id, error = %e, "Rejected batch");
            (StatusCode::OK, Json(PersistResponse::error(e.to_string())))
        }
    }
}

async fn get_tree_handler(
    State(store): State<SharedProjectStore>,
    Path((project_id, tree_id)): Path<(String, String)>,
) -> Response {
    match lock_store(&store).get(&project_id, &tree_id) {
        Some(document) => Json(document).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn put_tree_handler(
    State(store): State<SharedProjectStore>,
    Path((project_id, tree_id)): Path<(String, String)>,
    Json(document): Json<TreeDocument>,
) -> Response {
    match lock_store(&store).seed(&project_id, &tree_id, &document) {
        Ok(()) => {
            tracing::info!(%project_id, %tree_id, "Seeded tree");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => (StatusCode::BAD_REQUEST, Json(PersistResponse::error(e.to_string()))).into_response(),
    }
}
