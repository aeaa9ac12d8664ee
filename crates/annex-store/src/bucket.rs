//! Bucket addressing
//!
//! A bucket is identified by the chain of names leading to it from the root.
//! The chain is encoded as a sequence of length-prefixed segments so that
//! every path has exactly one encoding and no path's encoding is ambiguous
//! with a sibling's.

use std::fmt;
use std::marker::PhantomData;

/// Encoded path from the root to a bucket
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BucketPath {
    encoded: Vec<u8>,
    depth: usize,
}

impl BucketPath {
    /// The implicit root that holds the top-level buckets
    #[must_use]
    pub const fn root() -> Self {
        Self {
            encoded: Vec::new(),
            depth: 0,
        }
    }

    /// Path of the child bucket `name` below this one
    #[must_use]
    pub fn child(&self, name: &[u8]) -> Self {
        let len = u32::try_from(name.len()).unwrap_or(u32::MAX);
        let mut encoded = Vec::with_capacity(self.encoded.len() + 4 + name.len());
        encoded.extend_from_slice(&self.encoded);
        encoded.extend_from_slice(&len.to_be_bytes());
        encoded.extend_from_slice(name);
        Self {
            encoded,
            depth: self.depth + 1,
        }
    }

    /// Encoded form used as the storage key
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.encoded
    }

    /// Number of segments (0 for the root)
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// True for the root path
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Decoded name segments, outermost first
    #[must_use]
    pub fn segments(&self) -> Vec<&[u8]> {
        let mut out = Vec::with_capacity(self.depth);
        let mut rest = self.encoded.as_slice();
        while rest.len() >= 4 {
            let (len, tail) = rest.split_at(4);
            let len = u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize;
            let (name, tail) = tail.split_at(len.min(tail.len()));
            out.push(name);
            rest = tail;
        }
        out
    }

    /// Last segment, the bucket's own name
    #[must_use]
    pub fn name(&self) -> Option<&[u8]> {
        self.segments().pop()
    }
}

impl fmt::Display for BucketPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .segments()
            .into_iter()
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect();
        write!(f, "/{}", names.join("/"))
    }
}

impl fmt::Debug for BucketPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketPath({self})")
    }
}

/// Handle to an existing bucket.
///
/// Handles are only valid inside the transaction that produced them; the
/// `'tx` lifetime keeps them from escaping it.
#[derive(Clone, PartialEq, Eq)]
pub struct Bucket<'tx> {
    path: BucketPath,
    _tx: PhantomData<&'tx ()>,
}

impl Bucket<'_> {
    pub(crate) const fn new(path: BucketPath) -> Self {
        Self {
            path,
            _tx: PhantomData,
        }
    }

    /// Path from the root to this bucket
    #[must_use]
    pub const fn path(&self) -> &BucketPath {
        &self.path
    }
}

impl fmt::Debug for Bucket<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bucket({})", self.path)
    }
}
