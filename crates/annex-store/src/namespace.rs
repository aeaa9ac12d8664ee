//! Resource type provisioning
//!
//! Every resource type served by a service is a top-level bucket. Buckets are
//! created once at startup; requests only ever check for their presence.

use crate::error::{StoreError, StoreResult};
use crate::store::{BucketReader, Store};
use std::sync::Arc;
use tracing::{error, info};

/// Manages the top-level bucket of each resource type
#[derive(Clone)]
pub struct ResourceNamespace {
    store: Arc<Store>,
}

impl ResourceNamespace {
    pub const fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Ensure a top-level bucket exists for every name.
    ///
    /// Each name is created in its own transaction, so a failure part way
    /// through leaves the earlier names in place.
    pub fn provision<I, S>(&self, names: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            self.store
                .run_read_write(|tx| tx.ensure_bucket(name.as_bytes()).map(|_| ()))?;
            info!("Provisioned resource type '{}'", name);
        }
        Ok(())
    }

    /// True if a top-level bucket exists for `name`. Store failures are
    /// logged and reported as absent.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        let found = self
            .store
            .run_read_only(|tx| Ok::<_, StoreError>(tx.bucket(name.as_bytes())?.is_some()));
        match found {
            Ok(found) => found,
            Err(e) => {
                error!("Failed to look up resource type '{}': {}", name, e);
                false
            }
        }
    }
}
