//! Comments handlers
//!
//! ```text
//! POST   /{type}/{key}/comments        add a comment, creating the instance
//! GET    /{type}/{key}/comments        list comments
//! GET    /{type}/{key}/comments/{id}   fetch one comment
//! PATCH  /{type}/{key}/comments/{id}   replace the comment text
//! DELETE /{type}/{key}/comments/{id}   delete one comment
//! ```
//!
//! Every route first checks the resource type (406). All routes except
//! POST then require the resource instance to exist (404).

use crate::error::{ApiError, ApiResult, Message};
use crate::state::{AppState, blocking};
use annex_common::{Comment, CommentId};
use annex_store::Commentable;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

const COMMENTABLE: &str = "commentable";

const COMMENT_INVALID: &str = "comment could not be parsed";
const COMMENT_NOT_FOUND: &str = "comment not found";
const COMMENT_LIST_ERR: &str = "could not load comments";
const COMMENT_DELETE_ERR: &str = "comment could not be deleted";
const COMMENT_SAVE_ERR: &str = "comment could not be saved";
const COMMENTABLE_SAVE_ERR: &str = "could not provision comments";

/// Response body of the list route
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentList {
    pub comments: Vec<Comment>,
}

/// Type check followed by the instance check
async fn resolve(state: &AppState, kind: String, key: String) -> ApiResult<Commentable> {
    state.require_type(COMMENTABLE, &kind).await?;

    let commentable = Commentable::new(state.store.clone(), kind, key);
    let handle = commentable.clone();
    if blocking(move || handle.instance_exists()).await? {
        return Ok(commentable);
    }
    warn!(
        kind = %commentable.kind(),
        key = %commentable.key(),
        "Commentable validation failed"
    );
    Err(ApiError::not_found(format!(
        "{} not found with key {}",
        commentable.kind(),
        commentable.key()
    )))
}

/// Parse a comment body. Only the text is taken from the client.
fn parse_text(body: &[u8]) -> ApiResult<String> {
    match serde_json::from_slice::<Comment>(body) {
        Ok(comment) if !comment.is_empty() => Ok(comment.value),
        Ok(_) => {
            error!("{}: empty value", COMMENT_INVALID);
            Err(ApiError::bad_request(COMMENT_INVALID))
        }
        Err(e) => {
            error!("{}: {}", COMMENT_INVALID, e);
            Err(ApiError::bad_request(COMMENT_INVALID))
        }
    }
}

/// Fetch a comment, mapping every failure to 400
async fn existing(commentable: &Commentable, id: CommentId) -> ApiResult<Comment> {
    let handle = commentable.clone();
    let lookup = id.clone();
    blocking(move || handle.fetch(&lookup)).await?.map_err(|e| {
        error!(
            kind = %commentable.kind(),
            key = %commentable.key(),
            id = %id,
            "{}: {}", COMMENT_NOT_FOUND, e
        );
        ApiError::bad_request(COMMENT_NOT_FOUND)
    })
}

async fn save(commentable: &Commentable, comment: Comment) -> ApiResult<Comment> {
    let handle = commentable.clone();
    let value = comment.value.clone();
    blocking(move || handle.replace(comment)).await?.map_err(|e| {
        error!(
            kind = %commentable.kind(),
            key = %commentable.key(),
            comment = %value,
            "{}: {}", COMMENT_SAVE_ERR, e
        );
        ApiError::internal(COMMENT_SAVE_ERR)
    })
}

/// POST /{type}/{key}/comments
///
/// # Errors
/// 406 for an unknown type or if the instance cannot be created, 400 for an
/// unparsable or empty body, 500 if the comment cannot be stored.
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Path((kind, key)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<Comment>> {
    state.require_type(COMMENTABLE, &kind).await?;

    let creator = Commentable::new(state.store.clone(), kind.clone(), key.clone());
    if let Err(e) = blocking(move || creator.ensure_instance()).await? {
        error!(kind = %kind, key = %key, "{}: {}", COMMENTABLE_SAVE_ERR, e);
        return Err(ApiError::not_acceptable(COMMENTABLE_SAVE_ERR));
    }

    let commentable = resolve(&state, kind, key).await?;
    let text = parse_text(&body)?;
    Ok(Json(save(&commentable, Comment::new(text)).await?))
}

/// GET /{type}/{key}/comments
///
/// # Errors
/// 406 for an unknown type, 404 for an unknown instance, 500 if the
/// comments cannot be read.
pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path((kind, key)): Path<(String, String)>,
) -> ApiResult<Json<CommentList>> {
    let commentable = resolve(&state, kind, key).await?;

    let handle = commentable.clone();
    match blocking(move || handle.list()).await? {
        Ok(comments) => Ok(Json(CommentList { comments })),
        Err(e) => {
            error!(
                kind = %commentable.kind(),
                key = %commentable.key(),
                "{}: {}", COMMENT_LIST_ERR, e
            );
            Err(ApiError::internal(COMMENT_LIST_ERR))
        }
    }
}

/// GET /{type}/{key}/comments/{id}
///
/// # Errors
/// 406 for an unknown type, 404 for an unknown instance, 400 for an
/// unknown comment.
pub async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path((kind, key, id)): Path<(String, String, String)>,
) -> ApiResult<Json<Comment>> {
    let commentable = resolve(&state, kind, key).await?;
    Ok(Json(existing(&commentable, CommentId::from_client(id)).await?))
}

/// PATCH /{type}/{key}/comments/{id}
///
/// # Errors
/// As for GET, plus 400 for an unparsable body and 500 if the comment
/// cannot be stored.
pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    Path((kind, key, id)): Path<(String, String, String)>,
    body: Bytes,
) -> ApiResult<Json<Comment>> {
    let commentable = resolve(&state, kind, key).await?;
    let text = parse_text(&body)?;

    let mut comment = existing(&commentable, CommentId::from_client(id)).await?;
    comment.value = text;
    Ok(Json(save(&commentable, comment).await?))
}

/// DELETE /{type}/{key}/comments/{id}
///
/// # Errors
/// As for GET, plus 500 if the comment cannot be deleted.
pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Path((kind, key, id)): Path<(String, String, String)>,
) -> ApiResult<Json<Message>> {
    let commentable = resolve(&state, kind, key).await?;
    let comment = existing(&commentable, CommentId::from_client(id)).await?;

    let handle = commentable.clone();
    let id = comment.id.clone();
    if let Err(e) = blocking(move || handle.remove(&id)).await? {
        error!(
            kind = %commentable.kind(),
            key = %commentable.key(),
            id = %comment.id,
            "{}: {}", COMMENT_DELETE_ERR, e
        );
        return Err(ApiError::internal(COMMENT_DELETE_ERR));
    }

    Ok(Json(Message::new(format!(
        "successfully deleted {} comment with id: {}",
        commentable.kind(),
        comment.id
    ))))
}

#[cfg(test)]
mod tests {
    use crate::testutil::{TestApp, json};
    use axum::http::{Method, StatusCode};

    async fn add(app: &TestApp, uri: &str, body: &str) -> serde_json::Value {
        let (status, body) = app.send(Method::POST, uri, Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        json(&body)
    }

    #[tokio::test]
    async fn test_comment_lifecycle() {
        let app = TestApp::comments(&["books"]);

        let created = add(&app, "/books/b1/comments", r#"{"value":"great read"}"#).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert!(!id.is_empty());
        assert_eq!(created["value"], "great read");

        let (status, body) = app.send(Method::GET, "/books/b1/comments", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["comments"], serde_json::json!([created]));

        let uri = format!("/books/b1/comments/{id}");
        let (status, body) = app
            .send(Method::PATCH, &uri, Some(r#"{"value":"edited"}"#))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["id"], id.as_str());
        assert_eq!(json(&body)["value"], "edited");

        let (status, body) = app.send(Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["value"], "edited");

        let (status, body) = app.send(Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json(&body)["message"],
            format!("successfully deleted books comment with id: {id}")
        );

        let (status, body) = app.send(Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["message"], "comment not found");
    }

    #[tokio::test]
    async fn test_client_id_is_ignored() {
        let app = TestApp::comments(&["books"]);
        let created = add(
            &app,
            "/books/b1/comments",
            r#"{"id":"chosen-by-client","value":"hello"}"#,
        )
        .await;
        assert_ne!(created["id"], "chosen-by-client");
    }

    #[tokio::test]
    async fn test_unknown_type() {
        let app = TestApp::comments(&["books"]);
        for (method, uri) in [
            (Method::POST, "/posts/p1/comments"),
            (Method::GET, "/posts/p1/comments"),
            (Method::GET, "/posts/p1/comments/c1"),
            (Method::DELETE, "/posts/p1/comments/c1"),
        ] {
            let (status, body) = app.send(method, uri, Some(r#"{"value":"x"}"#)).await;
            assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
            assert_eq!(json(&body)["message"], "commentable type, posts, not found");
        }
    }

    #[tokio::test]
    async fn test_unknown_instance() {
        let app = TestApp::comments(&["books"]);

        let (status, body) = app.send(Method::GET, "/books/b9/comments", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(&body)["message"], "books not found with key b9");

        let (status, _) = app
            .send(Method::PATCH, "/books/b9/comments/c1", Some(r#"{"value":"x"}"#))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_invalid_body() {
        let app = TestApp::comments(&["books"]);
        for body in ["not json", r#"{"value":""}"#, "{}"] {
            let (status, resp) = app.send(Method::POST, "/books/b1/comments", Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json(&resp)["message"], "comment could not be parsed");
        }

        // The instance is provisioned even when the body is rejected
        let (status, body) = app.send(Method::GET, "/books/b1/comments", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["comments"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_missing_comment() {
        let app = TestApp::comments(&["books"]);
        add(&app, "/books/b1/comments", r#"{"value":"first"}"#).await;

        for method in [Method::GET, Method::DELETE] {
            let (status, body) = app.send(method, "/books/b1/comments/nope", None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json(&body)["message"], "comment not found");
        }
        let (status, _) = app
            .send(Method::PATCH, "/books/b1/comments/nope", Some(r#"{"value":"x"}"#))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_in_creation_order() {
        let app = TestApp::comments(&["authors", "books"]);
        let first = add(&app, "/authors/a1/comments", r#"{"value":"one"}"#).await;
        let second = add(&app, "/authors/a1/comments", r#"{"value":"two"}"#).await;
        add(&app, "/books/b1/comments", r#"{"value":"elsewhere"}"#).await;

        let (_, body) = app.send(Method::GET, "/authors/a1/comments", None).await;
        assert_eq!(json(&body)["comments"], serde_json::json!([first, second]));
    }
}
