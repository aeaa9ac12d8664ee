//! Core type definitions for Annex
//!
//! The rating aggregate and comment entity defined here are both the stored
//! record format and the HTTP wire format, so field names must not change.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use uuid::Uuid;

/// Star tally for one resource instance.
///
/// Counters are signed so that a client can retract earlier votes by sending
/// negative deltas. Stored aggregates are always clamped with
/// [`RatingAggregate::clamped`], so persisted counters are never negative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingAggregate {
    pub five_stars: i64,
    pub four_stars: i64,
    pub three_stars: i64,
    pub two_stars: i64,
    pub one_stars: i64,
}

impl RatingAggregate {
    /// Build an aggregate from counters ordered five stars down to one star.
    #[must_use]
    pub const fn new(five: i64, four: i64, three: i64, two: i64, one: i64) -> Self {
        Self {
            five_stars: five,
            four_stars: four,
            three_stars: three,
            two_stars: two,
            one_stars: one,
        }
    }

    /// Aggregate with every counter at zero
    #[must_use]
    pub const fn zero() -> Self {
        Self::new(0, 0, 0, 0, 0)
    }

    /// Component-wise sum. Saturates instead of overflowing.
    #[must_use]
    pub const fn merged(self, delta: Self) -> Self {
        Self {
            five_stars: self.five_stars.saturating_add(delta.five_stars),
            four_stars: self.four_stars.saturating_add(delta.four_stars),
            three_stars: self.three_stars.saturating_add(delta.three_stars),
            two_stars: self.two_stars.saturating_add(delta.two_stars),
            one_stars: self.one_stars.saturating_add(delta.one_stars),
        }
    }

    /// Raise every negative counter to zero.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            five_stars: self.five_stars.max(0),
            four_stars: self.four_stars.max(0),
            three_stars: self.three_stars.max(0),
            two_stars: self.two_stars.max(0),
            one_stars: self.one_stars.max(0),
        }
    }

    /// Merge `delta` and immediately clamp the result.
    ///
    /// Stored aggregates are only ever updated this way, so the floor holds
    /// after every merge and no deficit carries over to the next one.
    #[must_use]
    pub fn apply(self, delta: Self) -> Self {
        self.merged(delta).clamped()
    }

    /// True if no counter is negative
    #[must_use]
    pub const fn is_non_negative(&self) -> bool {
        self.five_stars >= 0
            && self.four_stars >= 0
            && self.three_stars >= 0
            && self.two_stars >= 0
            && self.one_stars >= 0
    }
}

impl Add for RatingAggregate {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.merged(rhs)
    }
}

/// Server-generated comment identifier.
///
/// Identifiers are UUIDv7 strings: unique, and lexicographically ordered by
/// creation time, so a comment collection iterates oldest first.
#[derive(
    Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
#[display("{_0}")]
pub struct CommentId(String);

impl CommentId {
    /// Generate a fresh identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Wrap an identifier received from a client (path segment, stored record)
    #[must_use]
    pub fn from_client(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as the raw bytes used for the storage key
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// True for the empty identifier
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommentId({:?})", self.0)
    }
}

/// A single comment attached to a resource instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Immutable identifier, unique within its collection
    #[serde(default)]
    pub id: CommentId,
    /// Comment text
    #[serde(default)]
    pub value: String,
}

impl Comment {
    /// Create a comment with a freshly generated identifier
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: CommentId::generate(),
            value: value.into(),
        }
    }

    /// Create a comment with a known identifier
    #[must_use]
    pub fn with_id(id: CommentId, value: impl Into<String>) -> Self {
        Self {
            id,
            value: value.into(),
        }
    }

    /// True if the comment text is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const START: RatingAggregate = RatingAggregate::new(1, 2, 3, 4, 5);

    #[test]
    fn test_merge_adds_component_wise() {
        let delta = RatingAggregate::new(2, 1, 1000, 976, 12);
        assert_eq!(START.merged(delta), RatingAggregate::new(3, 3, 1003, 980, 17));
        assert_eq!(START + delta, RatingAggregate::new(3, 3, 1003, 980, 17));
    }

    #[test]
    fn test_merge_keeps_negative_until_clamped() {
        let delta = RatingAggregate::new(-2, 1, 10, -6, 0);
        assert_eq!(START.merged(delta), RatingAggregate::new(-1, 3, 13, -2, 5));
        assert_eq!(START.apply(delta), RatingAggregate::new(0, 3, 13, 0, 5));
    }

    #[test]
    fn test_clamp_resets_negatives() {
        let all_negative = RatingAggregate::new(-2, -1, -1000, -976, -12);
        assert_eq!(all_negative.clamped(), RatingAggregate::zero());

        let mixed = RatingAggregate::new(-2, 1, 10, -6, 0);
        assert_eq!(mixed.clamped(), RatingAggregate::new(0, 1, 10, 0, 0));
    }

    #[test]
    fn test_apply_never_banks_deficit() {
        let after = RatingAggregate::zero()
            .apply(RatingAggregate::new(-10, 0, 0, 0, 0))
            .apply(RatingAggregate::new(3, 0, 0, 0, 0));
        assert_eq!(after.five_stars, 3);
        assert!(after.is_non_negative());
    }

    #[test]
    fn test_merge_saturates() {
        let big = RatingAggregate::new(i64::MAX, 0, 0, 0, 0);
        assert_eq!(big.merged(big).five_stars, i64::MAX);
    }

    #[test]
    fn test_rating_json_field_names() {
        let json = serde_json::to_string(&START).unwrap();
        assert_eq!(
            json,
            r#"{"five_stars":1,"four_stars":2,"three_stars":3,"two_stars":4,"one_stars":5}"#
        );

        // Missing counters decode as zero
        let partial: RatingAggregate = serde_json::from_str(r#"{"five_stars": 4}"#).unwrap();
        assert_eq!(partial, RatingAggregate::new(4, 0, 0, 0, 0));
    }

    #[test]
    fn test_comment_ids_unique_and_ordered() {
        let ids: Vec<CommentId> = (0..1000).map(|_| CommentId::generate()).collect();
        let unique: HashSet<&CommentId> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(sorted, ids);
    }

    #[test]
    fn test_comment_json() {
        let c = Comment::with_id(CommentId::from_client("12345"), "something");
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"id":"12345","value":"something"}"#);

        let body: Comment = serde_json::from_str(r#"{"value":"hi"}"#).unwrap();
        assert!(body.id.is_empty());
        assert_eq!(body.id, CommentId::default());
        assert!(!body.is_empty());
    }
}
