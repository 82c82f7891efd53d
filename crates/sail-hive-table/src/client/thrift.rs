//! Thrift client for a remote Hive Metastore

use ahash::AHashMap;
use async_trait::async_trait;
use faststr::FastStr;
use hive_metastore::{ThriftHiveMetastoreClient, ThriftHiveMetastoreClientBuilder, TxnState};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};
use volo_thrift::MaybeException;

use super::MetastoreClient;
use crate::config::HmsConfig;
use crate::error::{HmsError, HmsResult};
use crate::types::{
    Database, FieldSchema, Partition, SerDeInfo, StorageDescriptor, Table, ValidTxnList,
};

/// One connection to a Hive Metastore over Thrift
pub struct ThriftMetastoreClient {
    client: Option<ThriftHiveMetastoreClient>,
    uri: String,
}

impl ThriftMetastoreClient {
    pub async fn connect(config: &HmsConfig) -> HmsResult<Self> {
        let (host, port) = config.host_and_port()?;
        let address = tokio::net::lookup_host((host.as_str(), port))
            .await
            .map_err(|e| HmsError::ThriftTransport(format!("cannot resolve {}: {}", host, e)))?
            .next()
            .ok_or_else(|| HmsError::ThriftTransport(format!("no address for {}", host)))?;

        debug!("Connecting to Hive Metastore at {}", address);
        let client = ThriftHiveMetastoreClientBuilder::new(config.name.clone())
            .address(address)
            .build();

        info!("Connected to Hive Metastore: {}", config.uri);
        Ok(Self {
            client: Some(client),
            uri: config.uri.clone(),
        })
    }

    fn client(&self) -> HmsResult<&ThriftHiveMetastoreClient> {
        self.client
            .as_ref()
            .ok_or_else(|| HmsError::ThriftTransport(format!("client for {} is closed", self.uri)))
    }
}

/// Map a thrift reply into the crate's error classes
///
/// Declared exceptions are recognised by the HMS exception type they carry.
fn classify<T, E, C>(
    result: Result<MaybeException<T, E>, C>,
    not_found: impl FnOnce() -> HmsError,
    already_exists: impl FnOnce() -> HmsError,
) -> HmsResult<T>
where
    E: fmt::Debug,
    C: fmt::Display,
{
    match result {
        Ok(MaybeException::Ok(value)) => Ok(value),
        Ok(MaybeException::Exception(e)) => {
            let description = format!("{:?}", e);
            if description.contains("NoSuchObjectException") {
                Err(not_found())
            } else if description.contains("AlreadyExistsException") {
                Err(already_exists())
            } else if description.contains("InvalidObjectException") {
                Err(HmsError::InvalidObject(description))
            } else {
                Err(HmsError::Meta(description))
            }
        }
        Err(e) => Err(HmsError::ThriftTransport(e.to_string())),
    }
}

fn to_string(value: Option<FastStr>) -> String {
    value.map(|s| s.to_string()).unwrap_or_default()
}

fn to_map(map: Option<AHashMap<FastStr, FastStr>>) -> HashMap<String, String> {
    map.map(|m| {
        m.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    })
    .unwrap_or_default()
}

fn from_map(map: HashMap<String, String>) -> Option<AHashMap<FastStr, FastStr>> {
    Some(
        map.into_iter()
            .map(|(k, v)| (FastStr::from(k), FastStr::from(v)))
            .collect(),
    )
}

fn to_fields(fields: Option<Vec<hive_metastore::FieldSchema>>) -> Vec<FieldSchema> {
    fields
        .unwrap_or_default()
        .into_iter()
        .map(|f| FieldSchema {
            name: to_string(f.name),
            field_type: to_string(f.r#type),
            comment: f.comment.map(|c| c.to_string()),
        })
        .collect()
}

fn from_fields(fields: Vec<FieldSchema>) -> Vec<hive_metastore::FieldSchema> {
    fields
        .into_iter()
        .map(|f| hive_metastore::FieldSchema {
            name: Some(f.name.into()),
            r#type: Some(f.field_type.into()),
            comment: f.comment.map(FastStr::from),
            ..Default::default()
        })
        .collect()
}

fn to_sd(sd: Option<hive_metastore::StorageDescriptor>) -> StorageDescriptor {
    let Some(sd) = sd else {
        return StorageDescriptor::default();
    };
    let serde_info = sd.serde_info.unwrap_or_default();
    StorageDescriptor {
        cols: to_fields(sd.cols),
        location: to_string(sd.location),
        input_format: to_string(sd.input_format),
        output_format: to_string(sd.output_format),
        compressed: sd.compressed.unwrap_or(false),
        num_buckets: sd.num_buckets.unwrap_or(-1),
        serde_info: SerDeInfo {
            name: serde_info.name.map(|n| n.to_string()),
            serialization_lib: to_string(serde_info.serialization_lib),
            parameters: to_map(serde_info.parameters),
        },
        bucket_cols: sd
            .bucket_cols
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.to_string())
            .collect(),
        parameters: to_map(sd.parameters),
    }
}

fn from_sd(sd: StorageDescriptor) -> hive_metastore::StorageDescriptor {
    hive_metastore::StorageDescriptor {
        cols: Some(from_fields(sd.cols)),
        location: Some(sd.location.into()),
        input_format: Some(sd.input_format.into()),
        output_format: Some(sd.output_format.into()),
        compressed: Some(sd.compressed),
        num_buckets: Some(sd.num_buckets),
        serde_info: Some(hive_metastore::SerDeInfo {
            name: sd.serde_info.name.map(FastStr::from),
            serialization_lib: Some(sd.serde_info.serialization_lib.into()),
            parameters: from_map(sd.serde_info.parameters),
            ..Default::default()
        }),
        bucket_cols: Some(sd.bucket_cols.into_iter().map(FastStr::from).collect()),
        parameters: from_map(sd.parameters),
        stored_as_sub_directories: Some(false),
        ..Default::default()
    }
}

/// Snapshot from the metastore's open transactions, aborted ones set apart
fn valid_txns(
    high_watermark: i64,
    txns: impl IntoIterator<Item = (i64, TxnState)>,
) -> ValidTxnList {
    let (aborted, open): (Vec<_>, Vec<_>) = txns
        .into_iter()
        .partition(|(_, state)| *state == TxnState::Aborted);
    ValidTxnList::new(
        high_watermark,
        open.into_iter().map(|(id, _)| id),
        aborted.into_iter().map(|(id, _)| id),
    )
}

#[async_trait]
impl MetastoreClient for ThriftMetastoreClient {
    async fn get_database(&self, name: &str) -> HmsResult<Database> {
        let result = self.client()?.get_database(name.to_string().into()).await;
        let database = classify(
            result,
            || HmsError::DatabaseNotFound(name.to_string()),
            || HmsError::Meta(format!("unexpected reply for database {}", name)),
        )?;
        Ok(Database {
            name: to_string(database.name),
            description: database.description.map(|d| d.to_string()),
            location_uri: to_string(database.location_uri),
            parameters: to_map(database.parameters),
        })
    }

    async fn create_database(&self, database: Database) -> HmsResult<()> {
        let name = database.name.clone();
        let database = hive_metastore::Database {
            name: Some(database.name.into()),
            description: database.description.map(FastStr::from),
            location_uri: Some(database.location_uri.into()),
            parameters: from_map(database.parameters),
            ..Default::default()
        };
        let result = self.client()?.create_database(database).await;
        classify(
            result,
            || HmsError::InvalidObject(format!("cannot create database {}", name)),
            || HmsError::DatabaseAlreadyExists(name.clone()),
        )
    }

    async fn get_table(&self, database: &str, table: &str) -> HmsResult<Table> {
        let result = self
            .client()?
            .get_table(database.to_string().into(), table.to_string().into())
            .await;
        let not_found = || HmsError::TableNotFound {
            database: database.to_string(),
            table: table.to_string(),
        };
        let hive_table = classify(result, not_found, || {
            HmsError::Meta(format!("unexpected reply for table {}.{}", database, table))
        })?;
        Ok(Table {
            db_name: to_string(hive_table.db_name),
            table_name: to_string(hive_table.table_name),
            owner: hive_table.owner.map(|o| o.to_string()),
            create_time: hive_table.create_time.unwrap_or(0),
            last_access_time: hive_table.last_access_time.unwrap_or(0),
            sd: to_sd(hive_table.sd),
            partition_keys: to_fields(hive_table.partition_keys),
            parameters: to_map(hive_table.parameters),
            table_type: to_string(hive_table.table_type),
        })
    }

    async fn create_table(&self, table: Table) -> HmsResult<()> {
        let (database, name) = (table.db_name.clone(), table.table_name.clone());
        let hive_table = hive_metastore::Table {
            table_name: Some(table.table_name.into()),
            db_name: Some(table.db_name.into()),
            owner: table.owner.map(FastStr::from),
            create_time: Some(table.create_time),
            last_access_time: Some(table.last_access_time),
            retention: Some(0),
            sd: Some(from_sd(table.sd)),
            partition_keys: Some(from_fields(table.partition_keys)),
            parameters: from_map(table.parameters),
            table_type: Some(table.table_type.into()),
            temporary: Some(false),
            ..Default::default()
        };
        let result = self.client()?.create_table(hive_table).await;
        classify(
            result,
            || HmsError::InvalidObject(format!("database {} does not exist", database)),
            || HmsError::TableAlreadyExists {
                database: database.clone(),
                table: name.clone(),
            },
        )
    }

    async fn drop_table(
        &self,
        database: &str,
        table: &str,
        delete_data: bool,
        ignore_unknown: bool,
    ) -> HmsResult<()> {
        let result = self
            .client()?
            .drop_table(
                database.to_string().into(),
                table.to_string().into(),
                delete_data,
            )
            .await;
        match classify(
            result,
            || HmsError::TableNotFound {
                database: database.to_string(),
                table: table.to_string(),
            },
            || HmsError::Meta(format!("unexpected reply dropping {}.{}", database, table)),
        ) {
            Err(e) if ignore_unknown && e.is_not_found() => Ok(()),
            other => other.map(|_| ()),
        }
    }

    async fn add_partition(&self, partition: Partition) -> HmsResult<Partition> {
        let (database, table, values) = (
            partition.db_name.clone(),
            partition.table_name.clone(),
            partition.values.clone(),
        );
        let hive_partition = hive_metastore::Partition {
            values: Some(partition.values.into_iter().map(FastStr::from).collect()),
            db_name: Some(partition.db_name.into()),
            table_name: Some(partition.table_name.into()),
            create_time: Some(partition.create_time),
            last_access_time: Some(0),
            sd: Some(from_sd(partition.sd)),
            parameters: from_map(partition.parameters),
            ..Default::default()
        };
        let result = self.client()?.add_partition(hive_partition).await;
        let added = classify(
            result,
            || HmsError::InvalidObject(format!("table {}.{} does not exist", database, table)),
            || HmsError::PartitionAlreadyExists {
                database: database.clone(),
                table: table.clone(),
                values: values.clone(),
            },
        )?;
        Ok(Partition {
            db_name: to_string(added.db_name),
            table_name: to_string(added.table_name),
            values: added
                .values
                .unwrap_or_default()
                .into_iter()
                .map(|v| v.to_string())
                .collect(),
            create_time: added.create_time.unwrap_or(0),
            sd: to_sd(added.sd),
            parameters: to_map(added.parameters),
        })
    }

    async fn get_valid_txns(&self) -> HmsResult<ValidTxnList> {
        let response = self
            .client()?
            .get_open_txns_info()
            .await
            .map_err(|e| HmsError::ThriftTransport(e.to_string()))?;
        Ok(valid_txns(
            response.txn_high_water_mark,
            response
                .open_txns
                .into_iter()
                .map(|info| (info.id, info.state)),
        ))
    }

    fn close(&mut self) {
        if self.client.take().is_some() {
            debug!("Closed Hive Metastore client for {}", self.uri);
        }
    }
}
