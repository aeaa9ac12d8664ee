//! Annex HTTP - routers for the ratings and comments services
//!
//! Each service is one axum [`Router`] over a shared [`Store`]. Store calls
//! are synchronous and run on the blocking pool; handlers only await them.

pub mod comments;
pub mod error;
pub mod ratings;
pub mod server;
pub mod state;

use annex_store::Store;
use axum::Router;
use axum::routing::get;
use state::AppState;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult, Message};
pub use server::{serve, shutdown_signal};

/// GET /status
pub async fn status() -> &'static str {
    "OK"
}

/// Build the ratings service router.
pub fn ratings_router(store: Arc<Store>) -> Router {
    let state = Arc::new(AppState::new(store));

    Router::new()
        .route("/status", get(status))
        .route(
            "/{kind}/{key}/ratings",
            get(ratings::get_ratings).put(ratings::put_ratings),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the comments service router.
pub fn comments_router(store: Arc<Store>) -> Router {
    let state = Arc::new(AppState::new(store));

    Router::new()
        .route("/status", get(status))
        .route(
            "/{kind}/{key}/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route(
            "/{kind}/{key}/comments/{id}",
            get(comments::get_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
