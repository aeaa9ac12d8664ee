//! Annex Store - transactional bucket storage for resource attachments
//!
//! Resource types, resource instances and their attachments are laid out as
//! nested buckets inside a single redb database:
//!
//! ```text
//! <resource type>/                 top-level bucket, provisioned at startup
//!   <resource key>/                one bucket per resource instance
//!     "ratings"  -> JSON aggregate  (ratings service)
//!     comments/                    (comments service)
//!       <comment id> -> JSON comment
//! ```

pub mod bucket;
pub mod commentable;
pub mod error;
pub mod namespace;
pub mod rateable;
pub mod store;
mod tables;

// Re-exports
pub use bucket::{Bucket, BucketPath};
pub use commentable::Commentable;
pub use error::{AttachError, AttachResult, StoreError, StoreResult};
pub use namespace::ResourceNamespace;
pub use rateable::Rateable;
pub use store::{BucketReader, ReadTx, Store, WriteTx};
