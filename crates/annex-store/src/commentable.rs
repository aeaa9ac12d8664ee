//! Comment collections attached to resource instances.

use crate::bucket::Bucket;
use crate::error::{AttachError, AttachResult};
use crate::store::{BucketReader, Store};
use annex_common::{Comment, CommentId};
use std::sync::Arc;
use tracing::{debug, error};

/// Name of the sub-bucket holding the comments of a resource instance
pub const COMMENTS_BUCKET: &[u8] = b"comments";

/// Handle to the comments of one resource instance
#[derive(Clone)]
pub struct Commentable {
    store: Arc<Store>,
    kind: String,
    key: String,
}

impl Commentable {
    pub fn new(store: Arc<Store>, kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            store,
            kind: kind.into(),
            key: key.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Create the resource instance bucket if it is missing. The resource
    /// type must already be provisioned.
    pub fn ensure_instance(&self) -> AttachResult<()> {
        self.store.run_read_write(|tx| {
            let kind_bucket = tx
                .bucket(self.kind.as_bytes())?
                .ok_or_else(|| self.type_not_found())?;
            tx.create_nested_if_absent(&kind_bucket, self.key.as_bytes())?;
            Ok(())
        })
    }

    /// True if both the type and the instance bucket exist. Store failures
    /// are logged and reported as absent.
    #[must_use]
    pub fn instance_exists(&self) -> bool {
        match self.store.run_read_only(|tx| self.resolve(tx).map(|_| ())) {
            Ok(()) => true,
            Err(AttachError::Store(e)) => {
                error!(
                    kind = %self.kind,
                    key = %self.key,
                    "Failed to look up resource instance: {}", e
                );
                false
            }
            Err(_) => false,
        }
    }

    /// Store a new comment under a freshly generated id.
    pub fn create(&self, text: &str) -> AttachResult<Comment> {
        if text.is_empty() {
            return Err(AttachError::EmptyComment);
        }
        self.replace(Comment::new(text))
    }

    /// Store `comment` under its id, overwriting any previous value.
    pub fn replace(&self, comment: Comment) -> AttachResult<Comment> {
        if comment.is_empty() {
            return Err(AttachError::EmptyComment);
        }
        self.store.run_read_write(|tx| {
            let instance = self.resolve(tx)?;
            let comments = tx.create_nested_if_absent(&instance, COMMENTS_BUCKET)?;
            let data = serde_json::to_vec(&comment)?;
            tx.put(&comments, comment.id.as_bytes(), &data)?;
            Ok::<_, AttachError>(())
        })?;
        debug!(kind = %self.kind, key = %self.key, id = %comment.id, "Stored comment");
        Ok(comment)
    }

    pub fn fetch(&self, id: &CommentId) -> AttachResult<Comment> {
        self.store.run_read_only(|tx| {
            let comments = self.comments(tx, id)?;
            let data = tx
                .get(&comments, id.as_bytes())?
                .ok_or_else(|| self.comment_not_found(id))?;
            Ok(serde_json::from_slice(&data)?)
        })
    }

    /// Delete the comment `id`. Deleting an id that was never stored is not
    /// an error once the collection itself exists.
    pub fn remove(&self, id: &CommentId) -> AttachResult<()> {
        self.store.run_read_write(|tx| {
            let comments = self.comments(tx, id)?;
            tx.delete(&comments, id.as_bytes())?;
            Ok::<_, AttachError>(())
        })?;
        debug!(kind = %self.kind, key = %self.key, id = %id, "Removed comment");
        Ok(())
    }

    /// Every comment of the instance, in id order
    pub fn list(&self) -> AttachResult<Vec<Comment>> {
        self.store.run_read_only(|tx| {
            let instance = self.resolve(tx)?;
            let mut out = Vec::new();
            let Some(comments) = tx.nested(&instance, COMMENTS_BUCKET)? else {
                return Ok(out);
            };
            tx.for_each(&comments, |_, value| {
                out.push(serde_json::from_slice::<Comment>(value)?);
                Ok::<_, AttachError>(())
            })?;
            Ok(out)
        })
    }

    fn resolve<'tx, R: BucketReader>(&self, tx: &'tx R) -> AttachResult<Bucket<'tx>> {
        let kind_bucket = tx
            .bucket(self.kind.as_bytes())?
            .ok_or_else(|| self.type_not_found())?;
        tx.nested(&kind_bucket, self.key.as_bytes())?
            .ok_or_else(|| AttachError::ResourceInstanceNotFound {
                kind: self.kind.clone(),
                key: self.key.clone(),
            })
    }

    fn comments<'tx, R: BucketReader>(
        &self,
        tx: &'tx R,
        id: &CommentId,
    ) -> AttachResult<Bucket<'tx>> {
        let instance = self.resolve(tx)?;
        tx.nested(&instance, COMMENTS_BUCKET)?
            .ok_or_else(|| self.comment_not_found(id))
    }

    fn type_not_found(&self) -> AttachError {
        AttachError::ResourceTypeNotFound {
            kind: self.kind.clone(),
        }
    }

    fn comment_not_found(&self, id: &CommentId) -> AttachError {
        AttachError::CommentNotFound {
            kind: self.kind.clone(),
            key: self.key.clone(),
            id: id.clone(),
        }
    }
}
