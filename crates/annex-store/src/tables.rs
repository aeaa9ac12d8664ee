//! Redb table definitions backing the bucket hierarchy.

use redb::TableDefinition;

// Key: encoded bucket path (see `BucketPath`), Value: unit marker
pub const BUCKETS: TableDefinition<&[u8], ()> = TableDefinition::new("buckets");

// Key: (encoded parent bucket path, entry key), Value: raw entry bytes
pub const ENTRIES: TableDefinition<(&[u8], &[u8]), &[u8]> = TableDefinition::new("entries");
