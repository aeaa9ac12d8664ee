//! Rating aggregates attached to resource instances.
//!
//! Each resource instance bucket holds at most one aggregate record under the
//! `ratings` key. Merges run inside the store's exclusive write transaction,
//! so concurrent merges serialize and none is lost.

use crate::error::{AttachError, AttachResult};
use crate::store::{BucketReader, Store};
use annex_common::RatingAggregate;
use std::sync::Arc;
use tracing::debug;

/// Key of the aggregate record inside a resource instance bucket
pub const RATINGS_KEY: &[u8] = b"ratings";

/// Handle to the ratings of one resource instance
#[derive(Clone)]
pub struct Rateable {
    store: Arc<Store>,
    kind: String,
    key: String,
}

impl Rateable {
    pub fn new(store: Arc<Store>, kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            store,
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Resource type, e.g. "books"
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Resource key within its type
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Add `delta` to the stored aggregate and return the new total.
    ///
    /// The resource instance is created on first touch. Every counter of the
    /// result is clamped to zero, so negative deltas can retract votes but
    /// never drive a counter below zero.
    pub fn merge(&self, delta: RatingAggregate) -> AttachResult<RatingAggregate> {
        self.store.run_read_write(|tx| {
            let kind_bucket = tx
                .bucket(self.kind.as_bytes())?
                .ok_or_else(|| self.type_not_found())?;
            let instance = tx.create_nested_if_absent(&kind_bucket, self.key.as_bytes())?;

            let current = match tx.get(&instance, RATINGS_KEY)? {
                Some(data) => serde_json::from_slice(&data)?,
                None => RatingAggregate::zero(),
            };

            let updated = current.apply(delta);
            let data = serde_json::to_vec(&updated)?;
            tx.put(&instance, RATINGS_KEY, &data)?;
            debug!(
                "Merged rating for {}/{}: {:?} -> {:?}",
                self.kind, self.key, current, updated
            );
            Ok(updated)
        })
    }

    /// Read the stored aggregate. An instance without a record reads as zero.
    pub fn fetch(&self) -> AttachResult<RatingAggregate> {
        self.store.run_read_only(|tx| {
            let kind_bucket = tx
                .bucket(self.kind.as_bytes())?
                .ok_or_else(|| self.type_not_found())?;
            let instance = tx
                .nested(&kind_bucket, self.key.as_bytes())?
                .ok_or_else(|| AttachError::ResourceInstanceNotFound {
                    kind: self.kind.clone(),
                    key: self.key.clone(),
                })?;

            match tx.get(&instance, RATINGS_KEY)? {
                Some(data) => Ok(serde_json::from_slice(&data)?),
                None => Ok(RatingAggregate::zero()),
            }
        })
    }

    fn type_not_found(&self) -> AttachError {
        AttachError::ResourceTypeNotFound {
            kind: self.kind.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::testutil::{open_store, seed};
    use std::thread;

    const KIND: &str = "posts";
    const KEY: &str = "my-key";

    fn write_record(store: &Store, rating: &RatingAggregate) {
        store
            .run_read_write(|tx| {
                let kind = tx.ensure_bucket(KIND.as_bytes())?;
                let instance = tx.create_nested_if_absent(&kind, KEY.as_bytes())?;
                tx.put(&instance, RATINGS_KEY, &serde_json::to_vec(rating)?)?;
                Ok::<_, AttachError>(())
            })
            .unwrap();
    }

    #[test]
    fn test_merge_unknown_type() {
        let (_dir, store) = open_store();
        let rateable = Rateable::new(store, "unknown", KEY);

        let result = rateable.merge(RatingAggregate::new(1, 0, 0, 0, 0));
        assert!(matches!(
            result,
            Err(AttachError::ResourceTypeNotFound { ref kind }) if kind == "unknown"
        ));
    }

    #[test]
    fn test_merge_creates_instance_on_first_touch() {
        let (_dir, store) = open_store();
        seed(&store, KIND, None);
        let rateable = Rateable::new(store, KIND, "another-key");

        let merged = rateable.merge(RatingAggregate::new(4, 0, 0, 0, 0)).unwrap();
        assert_eq!(merged, RatingAggregate::new(4, 0, 0, 0, 0));
        assert_eq!(rateable.fetch().unwrap(), merged);
    }

    #[test]
    fn test_merge_rejects_empty_key() {
        let (_dir, store) = open_store();
        seed(&store, KIND, None);
        let rateable = Rateable::new(store, KIND, "");

        let result = rateable.merge(RatingAggregate::new(1, 0, 0, 0, 0));
        assert!(matches!(
            result,
            Err(AttachError::Store(StoreError::InvalidName))
        ));
    }

    #[test]
    fn test_merge_adds_to_existing_record() {
        let (_dir, store) = open_store();
        write_record(&store, &RatingAggregate::new(1, 2, 3, 4, 5));
        let rateable = Rateable::new(store, KIND, KEY);

        let merged = rateable
            .merge(RatingAggregate::new(2, 1, 1000, 976, 12))
            .unwrap();
        assert_eq!(merged, RatingAggregate::new(3, 3, 1003, 980, 17));
    }

    #[test]
    fn test_merge_clamps_each_counter() {
        let (_dir, store) = open_store();
        write_record(&store, &RatingAggregate::new(1, 2, 3, 4, 5));
        let rateable = Rateable::new(store, KIND, KEY);

        let merged = rateable
            .merge(RatingAggregate::new(-2, 1, 10, -6, 0))
            .unwrap();
        assert_eq!(merged, RatingAggregate::new(0, 3, 13, 0, 5));
        assert_eq!(rateable.fetch().unwrap(), merged);
    }

    #[test]
    fn test_merge_floor_applies_every_time() {
        let (_dir, store) = open_store();
        seed(&store, KIND, None);
        let rateable = Rateable::new(store, KIND, KEY);

        rateable.merge(RatingAggregate::new(-10, 0, 0, 0, 0)).unwrap();
        let merged = rateable.merge(RatingAggregate::new(3, 0, 0, 0, 0)).unwrap();
        assert_eq!(merged.five_stars, 3);

        let deltas = [
            RatingAggregate::new(5, -3, 2, 0, -1),
            RatingAggregate::new(-7, 4, -9, 1, 2),
            RatingAggregate::new(1, -10, 3, -4, 0),
        ];
        for delta in deltas {
            assert!(rateable.merge(delta).unwrap().is_non_negative());
        }
    }

    #[test]
    fn test_fetch_unknown_type() {
        let (_dir, store) = open_store();
        let rateable = Rateable::new(store, "unknown", KEY);
        assert!(matches!(
            rateable.fetch(),
            Err(AttachError::ResourceTypeNotFound { .. })
        ));
    }

    #[test]
    fn test_fetch_unknown_instance() {
        let (_dir, store) = open_store();
        seed(&store, KIND, None);
        let rateable = Rateable::new(store, KIND, "another-key");
        assert!(matches!(
            rateable.fetch(),
            Err(AttachError::ResourceInstanceNotFound { ref kind, ref key })
                if kind == KIND && key == "another-key"
        ));
    }

    #[test]
    fn test_fetch_without_record_is_zero() {
        let (_dir, store) = open_store();
        seed(&store, KIND, Some(KEY));
        let rateable = Rateable::new(store, KIND, KEY);
        assert_eq!(rateable.fetch().unwrap(), RatingAggregate::zero());
    }

    #[test]
    fn test_fetch_returns_record() {
        let (_dir, store) = open_store();
        let stored = RatingAggregate::new(1, 2, 3, 4, 5);
        write_record(&store, &stored);
        assert_eq!(Rateable::new(store, KIND, KEY).fetch().unwrap(), stored);
    }

    #[test]
    fn test_fetch_corrupt_record() {
        let (_dir, store) = open_store();
        seed(&store, KIND, Some(KEY));
        store
            .run_read_write(|tx| {
                let kind = tx.bucket(KIND.as_bytes())?.unwrap();
                let instance = tx.nested(&kind, KEY.as_bytes())?.unwrap();
                tx.put(&instance, RATINGS_KEY, b"not json")
            })
            .unwrap();

        let result = Rateable::new(store, KIND, KEY).fetch();
        assert!(matches!(result, Err(AttachError::Store(StoreError::Codec(_)))));
    }

    #[test]
    fn test_concurrent_merges_are_not_lost() {
        let (_dir, store) = open_store();
        seed(&store, KIND, None);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rateable = Rateable::new(store.clone(), KIND, KEY);
                thread::spawn(move || {
                    for _ in 0..25 {
                        rateable.merge(RatingAggregate::new(1, 0, 0, 0, 2)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let total = Rateable::new(store, KIND, KEY).fetch().unwrap();
        assert_eq!(total, RatingAggregate::new(200, 0, 0, 0, 400));
    }
}
