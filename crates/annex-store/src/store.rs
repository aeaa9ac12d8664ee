//! Persistent bucket store backed by redb.
//!
//! All access goes through [`Store::run_read_only`] or
//! [`Store::run_read_write`]. Read transactions see a consistent snapshot and
//! may run concurrently with each other and with the single active writer.
//! Write transactions are exclusive: redb admits one writer at a time and
//! `begin_write` blocks until the previous writer has finished. A write
//! transaction commits only when the closure returns `Ok`; any error aborts
//! it and discards every change made inside.

use crate::bucket::{Bucket, BucketPath};
use crate::error::{StoreError, StoreResult};
use crate::tables;
use redb::{Database, ReadTransaction, ReadableTable, WriteTransaction};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Read access shared by read-only and read-write transactions.
pub trait BucketReader {
    #[doc(hidden)]
    fn buckets_table(&self) -> StoreResult<impl ReadableTable<&'static [u8], ()>>;

    #[doc(hidden)]
    fn entries_table(
        &self,
    ) -> StoreResult<impl ReadableTable<(&'static [u8], &'static [u8]), &'static [u8]>>;

    /// Look up a top-level bucket
    fn bucket(&self, name: &[u8]) -> StoreResult<Option<Bucket<'_>>> {
        lookup(self, &BucketPath::root(), name)
    }

    /// Look up the bucket `name` nested directly below `parent`
    fn nested<'tx>(
        &'tx self,
        parent: &Bucket<'tx>,
        name: &[u8],
    ) -> StoreResult<Option<Bucket<'tx>>> {
        lookup(self, parent.path(), name)
    }

    /// Read the value stored under `key`. Keys naming a nested bucket read
    /// as absent.
    fn get(&self, bucket: &Bucket<'_>, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let table = self.entries_table()?;
        let value = table.get((bucket.path().as_bytes(), key))?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    /// Visit every key/value pair of `bucket` in key order. Nested buckets
    /// are not visited. The first error returned by `visit` stops the walk.
    fn for_each<E, F>(&self, bucket: &Bucket<'_>, mut visit: F) -> Result<(), E>
    where
        E: From<StoreError>,
        F: FnMut(&[u8], &[u8]) -> Result<(), E>,
    {
        let table = self.entries_table()?;
        let prefix = bucket.path().as_bytes();
        let start: (&[u8], &[u8]) = (prefix, &[]);
        for entry in table.range(start..).map_err(StoreError::from)? {
            let (key, value) = entry.map_err(StoreError::from)?;
            let (parent, key) = key.value();
            if parent != prefix {
                break;
            }
            visit(key, value.value())?;
        }
        Ok(())
    }
}

fn lookup<'tx, R: BucketReader + ?Sized>(
    reader: &'tx R,
    parent: &BucketPath,
    name: &[u8],
) -> StoreResult<Option<Bucket<'tx>>> {
    if name.is_empty() {
        return Ok(None);
    }
    let path = parent.child(name);
    let table = reader.buckets_table()?;
    let found = table.get(path.as_bytes())?.is_some();
    Ok(found.then(|| Bucket::new(path)))
}

/// Read-only snapshot transaction
pub struct ReadTx {
    txn: ReadTransaction,
}

impl BucketReader for ReadTx {
    fn buckets_table(&self) -> StoreResult<impl ReadableTable<&'static [u8], ()>> {
        Ok(self.txn.open_table(tables::BUCKETS)?)
    }

    fn entries_table(
        &self,
    ) -> StoreResult<impl ReadableTable<(&'static [u8], &'static [u8]), &'static [u8]>> {
        Ok(self.txn.open_table(tables::ENTRIES)?)
    }
}

/// Exclusive read-write transaction
pub struct WriteTx {
    txn: WriteTransaction,
}

impl BucketReader for WriteTx {
    fn buckets_table(&self) -> StoreResult<impl ReadableTable<&'static [u8], ()>> {
        Ok(self.txn.open_table(tables::BUCKETS)?)
    }

    fn entries_table(
        &self,
    ) -> StoreResult<impl ReadableTable<(&'static [u8], &'static [u8]), &'static [u8]>> {
        Ok(self.txn.open_table(tables::ENTRIES)?)
    }
}

impl WriteTx {
    /// Create the top-level bucket `name` unless it already exists
    pub fn ensure_bucket(&self, name: &[u8]) -> StoreResult<Bucket<'_>> {
        self.create_if_absent(&BucketPath::root(), name)
    }

    /// Create the bucket `name` below `parent` unless it already exists
    pub fn create_nested_if_absent<'tx>(
        &'tx self,
        parent: &Bucket<'tx>,
        name: &[u8],
    ) -> StoreResult<Bucket<'tx>> {
        self.create_if_absent(parent.path(), name)
    }

    /// Store `value` under `key`, replacing any previous value
    pub fn put(&self, bucket: &Bucket<'_>, key: &[u8], value: &[u8]) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::KeyRequired);
        }
        self.ensure_not_bucket(bucket.path(), key)?;
        let mut table = self.txn.open_table(tables::ENTRIES)?;
        table.insert((bucket.path().as_bytes(), key), value)?;
        Ok(())
    }

    /// Remove `key`. Removing an absent key is not an error.
    pub fn delete(&self, bucket: &Bucket<'_>, key: &[u8]) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::KeyRequired);
        }
        self.ensure_not_bucket(bucket.path(), key)?;
        let mut table = self.txn.open_table(tables::ENTRIES)?;
        table.remove((bucket.path().as_bytes(), key))?;
        Ok(())
    }

    fn create_if_absent(&self, parent: &BucketPath, name: &[u8]) -> StoreResult<Bucket<'_>> {
        if name.is_empty() {
            return Err(StoreError::InvalidName);
        }
        let path = parent.child(name);

        let mut buckets = self.txn.open_table(tables::BUCKETS)?;
        if buckets.get(path.as_bytes())?.is_some() {
            return Ok(Bucket::new(path));
        }

        let entries = self.txn.open_table(tables::ENTRIES)?;
        if entries.get((parent.as_bytes(), name))?.is_some() {
            return Err(StoreError::IncompatibleValue(path.to_string()));
        }

        buckets.insert(path.as_bytes(), ())?;
        debug!("Created bucket {}", path);
        Ok(Bucket::new(path))
    }

    fn ensure_not_bucket(&self, parent: &BucketPath, key: &[u8]) -> StoreResult<()> {
        let path = parent.child(key);
        let buckets = self.txn.open_table(tables::BUCKETS)?;
        if buckets.get(path.as_bytes())?.is_some() {
            return Err(StoreError::IncompatibleValue(path.to_string()));
        }
        Ok(())
    }
}

/// Persistent bucket store backed by redb.
pub struct Store {
    db: Database,
    path: PathBuf,
    closed: AtomicBool,
}

impl Store {
    /// Open (or create) the redb database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Create both tables eagerly so later read txns don't fail
        let write_txn = db.begin_write()?;
        {
            let _t = write_txn.open_table(tables::BUCKETS)?;
            let _t = write_txn.open_table(tables::ENTRIES)?;
        }
        write_txn.commit()?;

        info!("Opened store at {}", path.display());
        Ok(Self {
            db,
            path: path.to_path_buf(),
            closed: AtomicBool::new(false),
        })
    }

    /// Location of the database file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` inside a read-only snapshot transaction.
    pub fn run_read_only<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&ReadTx) -> Result<T, E>,
    {
        self.ensure_open()?;
        let tx = ReadTx {
            txn: self.db.begin_read().map_err(StoreError::from)?,
        };
        f(&tx)
    }

    /// Run `f` inside the exclusive read-write transaction. Changes are
    /// committed if `f` succeeds and discarded otherwise.
    pub fn run_read_write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&WriteTx) -> Result<T, E>,
    {
        self.ensure_open()?;
        let tx = WriteTx {
            txn: self.db.begin_write().map_err(StoreError::from)?,
        };
        match f(&tx) {
            Ok(value) => {
                tx.txn.commit().map_err(StoreError::from)?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = tx.txn.abort() {
                    warn!("Failed to abort write transaction: {}", abort_err);
                }
                Err(e)
            }
        }
    }

    /// Refuse new transactions. Transactions already running complete.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("Closed store at {}", self.path.display());
        }
    }

    /// True once [`Store::close`] has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}
