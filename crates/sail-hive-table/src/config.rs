//! Job configuration and metastore connection settings

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{HmsError, HmsResult};

/// Comma-separated list of central metastore URIs
pub const HIVE_METASTORE_URIS: &str = "hive.metastore.uris";

/// Root directory of managed tables
pub const HIVE_METASTORE_WAREHOUSE: &str = "hive.metastore.warehouse.dir";

/// Default filesystem used to qualify scheme-less paths
pub const FS_DEFAULT_FS: &str = "fs.defaultFS";

/// Execution framework; `local` means the job runs in-process
pub const MAPREDUCE_FRAMEWORK_NAME: &str = "mapreduce.framework.name";

/// Legacy job tracker address; `local` means the job runs in-process
pub const MAPRED_JOB_TRACKER: &str = "mapred.job.tracker";

/// Serialized snapshot of valid transactions for ACID reads
pub const VALID_TXNS_KEY: &str = "hive.txn.valid.txns";

/// Bucket count of the ACID table being read
pub const BUCKET_COUNT: &str = "bucket_count";

/// Input directories of a job, comma separated
pub const INPUT_DIR: &str = "mapreduce.input.fileinputformat.inputdir";

/// Output directory of a job
pub const OUTPUT_DIR: &str = "mapreduce.output.fileoutputformat.outputdir";

pub const DEFAULT_WAREHOUSE_DIR: &str = "/user/hive/warehouse";
pub const DEFAULT_FS: &str = "file:///";
const LOCAL: &str = "local";

/// Key/value configuration of a pipeline job
///
/// Mirrors the flat string properties a Hadoop-style job carries around. The
/// tap reads the metastore and warehouse settings from it and writes the
/// settings a reader or writer needs back into it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobConf {
    properties: BTreeMap<String, String>,
}

impl JobConf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from a flat JSON object of string properties
    pub fn from_json(json: &str) -> HmsResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| HmsError::InvalidConfig(format!("invalid job configuration: {}", e)))
    }

    pub fn to_json(&self) -> HmsResult<String> {
        serde_json::to_string(self)
            .map_err(|e| HmsError::InvalidConfig(format!("cannot serialize job configuration: {}", e)))
    }

    /// Builder-style setter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Integer property; unparsable values are reported, not defaulted
    pub fn get_int(&self, key: &str) -> HmsResult<Option<i64>> {
        self.get(key)
            .map(|value| {
                value.trim().parse::<i64>().map_err(|_| {
                    HmsError::InvalidConfig(format!("'{}' is not an integer: {}", key, value))
                })
            })
            .transpose()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        self.set(key, value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.properties.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Configured metastore URIs, empty when running against an embedded metastore
    pub fn metastore_uris(&self) -> Vec<&str> {
        self.get(HIVE_METASTORE_URIS)
            .map(|uris| {
                uris.split(',')
                    .map(str::trim)
                    .filter(|uri| !uri.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_central_metastore(&self) -> bool {
        !self.metastore_uris().is_empty()
    }

    pub fn warehouse_dir(&self) -> &str {
        self.get_or(HIVE_METASTORE_WAREHOUSE, DEFAULT_WAREHOUSE_DIR)
    }

    pub fn default_fs(&self) -> &str {
        self.get_or(FS_DEFAULT_FS, DEFAULT_FS)
    }

    /// Whether the job runs fully in-process
    pub fn is_local(&self) -> bool {
        self.get(MAPRED_JOB_TRACKER) == Some(LOCAL)
            || self.get_or(MAPREDUCE_FRAMEWORK_NAME, LOCAL) == LOCAL
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for JobConf {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Connection settings for a remote Hive Metastore
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmsConfig {
    /// Client name reported to the metastore
    pub name: String,

    /// HMS Thrift URI (e.g., "thrift://localhost:9083")
    pub uri: String,
}

impl Default for HmsConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            uri: "thrift://localhost:9083".to_string(),
        }
    }
}

impl HmsConfig {
    /// Settings for the first configured metastore, `None` when no central metastore is set
    pub fn from_job_conf(conf: &JobConf) -> HmsResult<Option<Self>> {
        let Some(uri) = conf.metastore_uris().first().map(|uri| uri.to_string()) else {
            return Ok(None);
        };
        let config = Self {
            uri,
            ..Default::default()
        };
        config.validate()?;
        Ok(Some(config))
    }

    /// Check that the URI has the `thrift://host:port` shape
    pub fn validate(&self) -> HmsResult<()> {
        self.host_and_port().map(|_| ())
    }

    pub fn host_and_port(&self) -> HmsResult<(String, u16)> {
        let uri = url::Url::parse(&self.uri)?;

        if uri.scheme() != "thrift" {
            return Err(HmsError::InvalidUri(format!(
                "Expected thrift:// scheme, got: {}",
                uri.scheme()
            )));
        }

        let host = uri
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| HmsError::InvalidUri("Missing host in URI".to_string()))?;

        let port = uri
            .port()
            .ok_or_else(|| HmsError::InvalidUri(format!("Missing port in URI: {}", self.uri)))?;

        Ok((host.to_string(), port))
    }
}
