//! Metastore client contract
//!
//! A tap never keeps a client around: every operation asks the factory for a
//! fresh one and wraps it in a [`ScopedClient`], which closes it when the
//! operation returns, fails validation or errors out.

pub mod embedded;
pub mod factory;
#[cfg(feature = "thrift")]
pub mod thrift;

use async_trait::async_trait;
use std::ops::{Deref, DerefMut};
use tracing::trace;

use crate::error::HmsResult;
use crate::types::{Database, Partition, Table, ValidTxnList};

/// Operations the tap consumes from a Hive Metastore
#[async_trait]
pub trait MetastoreClient: Send + Sync {
    async fn get_database(&self, name: &str) -> HmsResult<Database>;

    async fn create_database(&self, database: Database) -> HmsResult<()>;

    async fn get_table(&self, database: &str, table: &str) -> HmsResult<Table>;

    async fn create_table(&self, table: Table) -> HmsResult<()>;

    /// Drop a table; `ignore_unknown` turns a missing table into success
    async fn drop_table(
        &self,
        database: &str,
        table: &str,
        delete_data: bool,
        ignore_unknown: bool,
    ) -> HmsResult<()>;

    async fn add_partition(&self, partition: Partition) -> HmsResult<Partition>;

    /// Snapshot of the transactions currently valid for readers
    async fn get_valid_txns(&self) -> HmsResult<ValidTxnList>;

    /// Release the connection; called exactly once by [`ScopedClient`]
    fn close(&mut self);
}

/// Owns a client for the duration of one operation and closes it on drop
pub struct ScopedClient {
    inner: Box<dyn MetastoreClient>,
}

impl ScopedClient {
    pub fn new(inner: Box<dyn MetastoreClient>) -> Self {
        Self { inner }
    }
}

impl Deref for ScopedClient {
    type Target = dyn MetastoreClient;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for ScopedClient {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for ScopedClient {
    fn drop(&mut self) {
        trace!("Closing metastore client");
        self.inner.close();
    }
}

impl std::fmt::Debug for ScopedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedClient").finish_non_exhaustive()
    }
}
