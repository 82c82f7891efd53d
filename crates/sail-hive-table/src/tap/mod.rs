//! Hive table as a pipeline resource
//!
//! [`HiveTap`] keeps a table in the Hive Metastore in line with the table a
//! job declares through its [`HiveTableDescriptor`]. The table's location and
//! transactional flag are resolved once when the tap is built: a table that
//! already exists wins over the descriptor, a missing one falls back to it.

mod validation;

use async_trait::async_trait;
use object_store::buffered::BufWriter;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::factory::{DefaultClientFactory, MetastoreClientFactory};
use crate::client::ScopedClient;
use crate::config::{JobConf, BUCKET_COUNT, VALID_TXNS_KEY};
use crate::descriptor::HiveTableDescriptor;
use crate::error::{TapError, TapResult};
use crate::filesystem::FileTap;
use crate::framework::{self, FRAMEWORK_NAME};
use crate::partition::HivePartition;
use crate::resource::Tap;
use crate::types::{Database, Partition, Table};

/// Pipeline resource backed by a Hive Metastore table
pub struct HiveTap {
    descriptor: HiveTableDescriptor,
    strict: bool,
    transactional: bool,
    file: FileTap,
    modified_time: AtomicI64,
    factory: Arc<dyn MetastoreClientFactory>,
}

impl HiveTap {
    /// Tap using the default client factory
    pub async fn new(
        descriptor: HiveTableDescriptor,
        strict: bool,
        conf: &JobConf,
    ) -> TapResult<Self> {
        Self::with_factory(descriptor, strict, conf, Arc::new(DefaultClientFactory)).await
    }

    /// Tap creating its metastore clients through `factory`
    ///
    /// Probes the metastore once for the table; any failure other than the
    /// table not existing aborts construction.
    pub async fn with_factory(
        descriptor: HiveTableDescriptor,
        strict: bool,
        conf: &JobConf,
        factory: Arc<dyn MetastoreClientFactory>,
    ) -> TapResult<Self> {
        framework::register();

        let client = connect(factory.as_ref(), conf).await?;
        let (location, transactional) = match client
            .get_table(descriptor.database_name(), descriptor.table_name())
            .await
        {
            Ok(table) => {
                debug!(
                    "Found table {}.{} at {}",
                    descriptor.database_name(),
                    descriptor.table_name(),
                    table.sd.location
                );
                let transactional = table.is_transactional();
                (table.sd.location, transactional)
            }
            Err(e) if e.is_not_found() => (
                descriptor.location(conf.warehouse_dir()),
                descriptor.is_transactional(),
            ),
            Err(e) => return Err(TapError::metastore("resolving table location", e)),
        };
        drop(client);

        Ok(Self {
            descriptor,
            strict,
            transactional,
            file: FileTap::new(location),
            modified_time: AtomicI64::new(0),
            factory,
        })
    }

    pub fn descriptor(&self) -> &HiveTableDescriptor {
        &self.descriptor
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Whether the table is transactional, as resolved when the tap was built
    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    /// Table location, as resolved when the tap was built
    pub fn location(&self) -> &str {
        self.file.location()
    }

    /// Last modification time recorded by this tap, in milliseconds
    pub fn last_modified(&self) -> i64 {
        self.modified_time.load(Ordering::Relaxed)
    }

    /// Add `partition` to the table, creating the table first when needed
    ///
    /// Does nothing for unpartitioned tables. A partition that is already
    /// registered counts as success.
    pub async fn register_partition(&self, conf: &JobConf, partition: Partition) -> TapResult<()> {
        if !self.descriptor.is_partitioned() {
            return Ok(());
        }
        if !conf.has_central_metastore() && !conf.is_local() {
            return Err(TapError::MissingCentralMetastore);
        }

        self.ensure_table(conf).await?;

        let client = self.client(conf).await?;
        info!(
            "Registering partition {:?} of {}.{}",
            partition.values, partition.db_name, partition.table_name
        );
        match client.add_partition(partition).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_already_exists() => {
                warn!("Partition already registered: {}", e);
                Ok(())
            }
            Err(e) => Err(TapError::metastore("adding partition", e)),
        }
    }

    /// Register the partition stored under `partition_path`, e.g. `ds=2024-01-01`
    pub async fn register_partition_path(
        &self,
        conf: &JobConf,
        partition_path: &str,
    ) -> TapResult<()> {
        if !self.descriptor.is_partitioned() {
            return Ok(());
        }
        let partition = HivePartition::new(&self.descriptor)
            .to_partition(partition_path, self.location())
            .map_err(|e| TapError::metastore("building partition", e))?;
        self.register_partition(conf, partition).await
    }

    async fn client(&self, conf: &JobConf) -> TapResult<ScopedClient> {
        connect(self.factory.as_ref(), conf).await
    }

    fn ensure_writable(&self) -> TapResult<()> {
        if self.transactional {
            return Err(TapError::TransactionalWrite);
        }
        Ok(())
    }

    fn touch(&self, time: i64) {
        self.modified_time.store(time, Ordering::Relaxed);
    }

    /// Create the table when the metastore does not know it yet
    async fn ensure_table(&self, conf: &JobConf) -> TapResult<bool> {
        if self.resource_exists(conf).await? {
            return Ok(true);
        }
        self.create_hive_table(conf).await
    }

    async fn create_hive_table(&self, conf: &JobConf) -> TapResult<bool> {
        self.ensure_writable()?;
        let client = self.client(conf).await?;
        let db_name = self.descriptor.database_name();

        match client.get_database(db_name).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                info!("Creating database: {}", db_name);
                let database = Database {
                    name: db_name.to_string(),
                    description: Some(format!("created by {}", FRAMEWORK_NAME)),
                    location_uri: parent_location(self.location()).to_string(),
                    ..Default::default()
                };
                client
                    .create_database(database)
                    .await
                    .map_err(|e| TapError::metastore("creating database", e))?;
            }
            Err(e) => return Err(TapError::metastore("fetching database", e)),
        }

        info!("Creating table: {}.{}", db_name, self.descriptor.table_name());
        client
            .create_table(self.descriptor.to_hive_table(self.location()))
            .await
            .map_err(|e| TapError::metastore("creating table", e))?;

        self.touch(chrono::Utc::now().timestamp_millis());
        Ok(true)
    }
}

/// Parent directory of a table location, the default location of its database
fn parent_location(location: &str) -> &str {
    let location = location.trim_end_matches('/');
    match location.rfind('/') {
        Some(0) => "/",
        Some(index) if location[..index].ends_with('/') => &location[..=index],
        Some(index) => &location[..index],
        None => "",
    }
}

async fn connect(factory: &dyn MetastoreClientFactory, conf: &JobConf) -> TapResult<ScopedClient> {
    let client = factory
        .new_client(conf)
        .await
        .map_err(|e| TapError::metastore("connecting to metastore", e))?;
    Ok(ScopedClient::new(client))
}

fn modified_millis(table: &Table) -> i64 {
    let seconds = if table.last_access_time > 0 {
        table.last_access_time
    } else {
        table.create_time
    };
    i64::from(seconds) * 1000
}

#[async_trait]
impl Tap for HiveTap {
    fn identifier(&self) -> &str {
        self.file.location()
    }

    /// Create the table unless it exists; transactional tables are rejected
    async fn create_resource(&self, conf: &JobConf) -> TapResult<bool> {
        self.ensure_writable()?;
        self.ensure_table(conf).await
    }

    async fn resource_exists(&self, conf: &JobConf) -> TapResult<bool> {
        let client = self.client(conf).await?;
        let db_name = self.descriptor.database_name();
        let table_name = self.descriptor.table_name();
        debug!("Getting table: {}.{}", db_name, table_name);

        let table = match client.get_table(db_name, table_name).await {
            Ok(table) => table,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(TapError::metastore("fetching table", e)),
        };
        self.touch(modified_millis(&table));

        if self.strict {
            let expected_location = self.descriptor.location(conf.warehouse_dir());
            validation::validate_table(&self.descriptor, &expected_location, &table, conf)?;
        }
        Ok(true)
    }

    /// Delete the table's files, then drop the table
    async fn delete_resource(&self, conf: &JobConf) -> TapResult<bool> {
        self.ensure_writable()?;
        self.file.delete_resource(conf).await?;

        let client = self.client(conf).await?;
        let db_name = self.descriptor.database_name();
        let table_name = self.descriptor.table_name();
        info!("Dropping table: {}.{}", db_name, table_name);
        client
            .drop_table(db_name, table_name, true, true)
            .await
            .map_err(|e| TapError::metastore("dropping table", e))?;
        Ok(true)
    }

    async fn commit_resource(&self, conf: &JobConf) -> TapResult<bool> {
        let ensured = self
            .ensure_table(conf)
            .await
            .map_err(|e| TapError::Resource(Box::new(e)))?;

        Ok(self.file.commit_resource(conf).await? && ensured)
    }

    async fn modified_time(&self, _conf: &JobConf) -> TapResult<i64> {
        Ok(self.last_modified())
    }

    async fn sink_conf_init(&self, conf: &mut JobConf) -> TapResult<()> {
        self.ensure_writable()?;
        self.file.sink_conf_init(conf).await
    }

    /// Also stamps the valid transaction snapshot and bucket count for ACID reads
    async fn source_conf_init(&self, conf: &mut JobConf) -> TapResult<()> {
        if self.transactional {
            let client = self.client(conf).await?;
            let txns = client
                .get_valid_txns()
                .await
                .map_err(TapError::TransactionList)?;
            drop(client);

            debug!("Reading transactional table with valid txns {}", txns);
            conf.set(VALID_TXNS_KEY, txns.to_string());
            conf.set_int(BUCKET_COUNT, i64::from(self.descriptor.bucket_count()));
        }
        self.file.source_conf_init(conf).await
    }

    async fn open_for_write(&self, conf: &JobConf, file_name: &str) -> TapResult<BufWriter> {
        self.ensure_writable()?;
        self.file.open_for_write(conf, file_name).await
    }
}

impl fmt::Debug for HiveTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HiveTap")
            .field("database", &self.descriptor.database_name())
            .field("table", &self.descriptor.table_name())
            .field("location", &self.location())
            .field("strict", &self.strict)
            .field("transactional", &self.transactional)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
