//! In-process metastore
//!
//! Stands in for a central Hive Metastore when a job runs locally without
//! `hive.metastore.uris`, the way Hive falls back to its embedded metastore.
//! All handles created from one [`EmbeddedMetastore`] share its catalog.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};
use tracing::debug;

use super::factory::MetastoreClientFactory;
use super::MetastoreClient;
use crate::config::JobConf;
use crate::error::{HmsError, HmsResult};
use crate::types::{Database, Partition, Table, ValidTxnList};

type TableKey = (String, String);

/// Counters of the calls served by an embedded metastore
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetastoreStats {
    pub opened: u64,
    pub closed: u64,
    pub get_database: u64,
    pub create_database: u64,
    pub get_table: u64,
    pub create_table: u64,
    pub drop_table: u64,
    pub add_partition: u64,
    pub get_valid_txns: u64,
}

impl MetastoreStats {
    /// Handles handed out and not yet closed
    pub fn open_clients(&self) -> u64 {
        self.opened - self.closed
    }
}

#[derive(Debug, Default)]
struct Transactions {
    high_watermark: i64,
    open: BTreeSet<i64>,
    aborted: BTreeSet<i64>,
}

#[derive(Debug, Default)]
struct CatalogState {
    databases: HashMap<String, Database>,
    tables: HashMap<TableKey, Table>,
    partitions: HashMap<TableKey, BTreeMap<Vec<String>, Partition>>,
    txns: Transactions,
    stats: MetastoreStats,
}

/// Shared in-memory catalog of databases, tables, partitions and transactions
#[derive(Debug, Clone, Default)]
pub struct EmbeddedMetastore {
    state: Arc<Mutex<CatalogState>>,
}

fn key(database: &str, table: &str) -> TableKey {
    (database.to_lowercase(), table.to_lowercase())
}

fn now_seconds() -> i32 {
    epoch_seconds(chrono::Utc::now().timestamp())
}

/// Metastore times are 32-bit; out-of-range instants saturate
fn epoch_seconds(timestamp: i64) -> i32 {
    i32::try_from(timestamp).unwrap_or(if timestamp < 0 { 0 } else { i32::MAX })
}

impl EmbeddedMetastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance used by the default factory in local mode
    pub fn global() -> &'static EmbeddedMetastore {
        static GLOBAL: OnceLock<EmbeddedMetastore> = OnceLock::new();
        GLOBAL.get_or_init(EmbeddedMetastore::new)
    }

    /// A new client handle sharing this catalog
    pub fn connect(&self) -> Box<dyn MetastoreClient> {
        self.state.lock().stats.opened += 1;
        Box::new(EmbeddedClient {
            state: Arc::clone(&self.state),
            closed: false,
        })
    }

    pub fn stats(&self) -> MetastoreStats {
        self.state.lock().stats.clone()
    }

    pub fn table(&self, database: &str, table: &str) -> Option<Table> {
        self.state.lock().tables.get(&key(database, table)).cloned()
    }

    pub fn database(&self, name: &str) -> Option<Database> {
        self.state.lock().databases.get(&name.to_lowercase()).cloned()
    }

    /// Registered partitions of a table, ordered by their values
    pub fn partitions(&self, database: &str, table: &str) -> Vec<Partition> {
        self.state
            .lock()
            .partitions
            .get(&key(database, table))
            .map(|partitions| partitions.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Store a table as-is, creating its database when needed
    ///
    /// Bypasses the checks of `create_table`; used to model tables created by
    /// other writers.
    pub fn put_table(&self, table: Table) {
        let mut state = self.state.lock();
        let database = table.db_name.to_lowercase();
        state
            .databases
            .entry(database.clone())
            .or_insert_with(|| Database {
                name: database,
                ..Default::default()
            });
        state
            .tables
            .insert(key(&table.db_name, &table.table_name), table);
    }

    pub fn open_transaction(&self) -> i64 {
        let mut state = self.state.lock();
        state.txns.high_watermark += 1;
        let txn_id = state.txns.high_watermark;
        state.txns.open.insert(txn_id);
        debug!("Opened transaction {}", txn_id);
        txn_id
    }

    pub fn commit_transaction(&self, txn_id: i64) -> HmsResult<()> {
        let mut state = self.state.lock();
        if !state.txns.open.remove(&txn_id) {
            return Err(HmsError::Meta(format!("no open transaction {}", txn_id)));
        }
        debug!("Committed transaction {}", txn_id);
        Ok(())
    }

    pub fn abort_transaction(&self, txn_id: i64) -> HmsResult<()> {
        let mut state = self.state.lock();
        if !state.txns.open.remove(&txn_id) {
            return Err(HmsError::Meta(format!("no open transaction {}", txn_id)));
        }
        state.txns.aborted.insert(txn_id);
        debug!("Aborted transaction {}", txn_id);
        Ok(())
    }
}

#[async_trait]
impl MetastoreClientFactory for EmbeddedMetastore {
    async fn new_client(&self, _conf: &JobConf) -> HmsResult<Box<dyn MetastoreClient>> {
        Ok(self.connect())
    }
}

/// Client handle onto an [`EmbeddedMetastore`]
struct EmbeddedClient {
    state: Arc<Mutex<CatalogState>>,
    closed: bool,
}

impl EmbeddedClient {
    fn ensure_open(&self) -> HmsResult<()> {
        if self.closed {
            return Err(HmsError::ThriftTransport("client is closed".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetastoreClient for EmbeddedClient {
    async fn get_database(&self, name: &str) -> HmsResult<Database> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.stats.get_database += 1;
        state
            .databases
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| HmsError::DatabaseNotFound(name.to_string()))
    }

    async fn create_database(&self, database: Database) -> HmsResult<()> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.stats.create_database += 1;
        let name = database.name.to_lowercase();
        if name.is_empty() {
            return Err(HmsError::InvalidObject("database name is empty".to_string()));
        }
        if state.databases.contains_key(&name) {
            return Err(HmsError::DatabaseAlreadyExists(database.name));
        }
        state.databases.insert(name, database);
        Ok(())
    }

    async fn get_table(&self, database: &str, table: &str) -> HmsResult<Table> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.stats.get_table += 1;
        state
            .tables
            .get(&key(database, table))
            .cloned()
            .ok_or_else(|| HmsError::TableNotFound {
                database: database.to_string(),
                table: table.to_string(),
            })
    }

    async fn create_table(&self, mut table: Table) -> HmsResult<()> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.stats.create_table += 1;
        if !state.databases.contains_key(&table.db_name.to_lowercase()) {
            return Err(HmsError::InvalidObject(format!(
                "database {} does not exist",
                table.db_name
            )));
        }
        let table_key = key(&table.db_name, &table.table_name);
        if state.tables.contains_key(&table_key) {
            return Err(HmsError::TableAlreadyExists {
                database: table.db_name,
                table: table.table_name,
            });
        }
        if table.create_time == 0 {
            table.create_time = now_seconds();
        }
        state.tables.insert(table_key, table);
        Ok(())
    }

    async fn drop_table(
        &self,
        database: &str,
        table: &str,
        _delete_data: bool,
        ignore_unknown: bool,
    ) -> HmsResult<()> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.stats.drop_table += 1;
        let table_key = key(database, table);
        if state.tables.remove(&table_key).is_none() && !ignore_unknown {
            return Err(HmsError::TableNotFound {
                database: database.to_string(),
                table: table.to_string(),
            });
        }
        state.partitions.remove(&table_key);
        Ok(())
    }

    async fn add_partition(&self, mut partition: Partition) -> HmsResult<Partition> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.stats.add_partition += 1;
        let table_key = key(&partition.db_name, &partition.table_name);
        let Some(table) = state.tables.get(&table_key) else {
            return Err(HmsError::InvalidObject(format!(
                "table {}.{} does not exist",
                partition.db_name, partition.table_name
            )));
        };
        if table.partition_keys.len() != partition.values.len() {
            return Err(HmsError::Meta(format!(
                "table {}.{} has {} partition keys but the partition has {} values",
                partition.db_name,
                partition.table_name,
                table.partition_keys.len(),
                partition.values.len()
            )));
        }

        let partitions = state.partitions.entry(table_key).or_default();
        if partitions.contains_key(&partition.values) {
            return Err(HmsError::PartitionAlreadyExists {
                database: partition.db_name,
                table: partition.table_name,
                values: partition.values,
            });
        }
        if partition.create_time == 0 {
            partition.create_time = now_seconds();
        }
        partitions.insert(partition.values.clone(), partition.clone());
        Ok(partition)
    }

    async fn get_valid_txns(&self) -> HmsResult<ValidTxnList> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        state.stats.get_valid_txns += 1;
        let txns = &state.txns;
        Ok(ValidTxnList::new(
            txns.high_watermark,
            txns.open.iter().copied(),
            txns.aborted.iter().copied(),
        ))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.lock().stats.closed += 1;
        }
    }
}
