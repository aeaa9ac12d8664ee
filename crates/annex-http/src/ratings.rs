//! Ratings handlers
//!
//! ```text
//! GET /{type}/{key}/ratings   current aggregate
//! PUT /{type}/{key}/ratings   merge a delta, returns the new aggregate
//! ```

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, blocking};
use annex_common::RatingAggregate;
use annex_store::Rateable;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use std::sync::Arc;
use tracing::error;

const RATEABLE: &str = "rateable";

const RATING_INVALID: &str = "rating could not be parsed";
const RATING_FETCH_ERR: &str = "could not load ratings";
const RATING_SAVE_ERR: &str = "rating could not be saved";

/// GET /{type}/{key}/ratings
///
/// # Errors
/// 406 for an unknown type, 400 if the ratings cannot be loaded.
pub async fn get_ratings(
    State(state): State<Arc<AppState>>,
    Path((kind, key)): Path<(String, String)>,
) -> ApiResult<Json<RatingAggregate>> {
    state.require_type(RATEABLE, &kind).await?;

    let rateable = Rateable::new(state.store.clone(), kind, key);
    let handle = rateable.clone();
    match blocking(move || handle.fetch()).await? {
        Ok(rating) => Ok(Json(rating)),
        Err(e) => {
            error!(kind = %rateable.kind(), key = %rateable.key(), "{}: {}", RATING_FETCH_ERR, e);
            Err(ApiError::bad_request(RATING_FETCH_ERR))
        }
    }
}

/// PUT /{type}/{key}/ratings
///
/// The body holds any subset of the five counters; missing counters are
/// zero. The type is checked before the body is parsed.
///
/// # Errors
/// 406 for an unknown type, 400 for an unparsable body, 500 if the merge
/// fails.
pub async fn put_ratings(
    State(state): State<Arc<AppState>>,
    Path((kind, key)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<RatingAggregate>> {
    state.require_type(RATEABLE, &kind).await?;

    let delta: RatingAggregate = serde_json::from_slice(&body).map_err(|e| {
        error!(kind = %kind, key = %key, "{}: {}", RATING_INVALID, e);
        ApiError::bad_request(RATING_INVALID)
    })?;

    let rateable = Rateable::new(state.store.clone(), kind, key);
    let handle = rateable.clone();
    match blocking(move || handle.merge(delta)).await? {
        Ok(rating) => Ok(Json(rating)),
        Err(e) => {
            error!(
                kind = %rateable.kind(),
                key = %rateable.key(),
                rating = ?delta,
                "{}: {}", RATING_SAVE_ERR, e
            );
            Err(ApiError::internal(RATING_SAVE_ERR))
        }
    }
}
