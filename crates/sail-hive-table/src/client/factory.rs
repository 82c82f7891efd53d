//! Factories producing one metastore client per call

use async_trait::async_trait;
use tracing::debug;

use super::embedded::EmbeddedMetastore;
use super::MetastoreClient;
use crate::config::{HmsConfig, JobConf};
use crate::error::HmsResult;

/// Produces a new, caller-owned metastore client for each invocation
///
/// Clients are never pooled or reused across calls; the caller releases each
/// one when its operation ends.
#[async_trait]
pub trait MetastoreClientFactory: Send + Sync {
    async fn new_client(&self, conf: &JobConf) -> HmsResult<Box<dyn MetastoreClient>>;
}

/// Connects to the central metastore named by `hive.metastore.uris`, or to
/// the process-wide embedded metastore when none is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultClientFactory;

#[async_trait]
impl MetastoreClientFactory for DefaultClientFactory {
    async fn new_client(&self, conf: &JobConf) -> HmsResult<Box<dyn MetastoreClient>> {
        match HmsConfig::from_job_conf(conf)? {
            Some(config) => connect_remote(config).await,
            None => {
                debug!("No central metastore configured, using embedded metastore");
                Ok(EmbeddedMetastore::global().connect())
            }
        }
    }
}

#[cfg(feature = "thrift")]
async fn connect_remote(config: HmsConfig) -> HmsResult<Box<dyn MetastoreClient>> {
    let client = super::thrift::ThriftMetastoreClient::connect(&config).await?;
    Ok(Box::new(client))
}

#[cfg(not(feature = "thrift"))]
async fn connect_remote(config: HmsConfig) -> HmsResult<Box<dyn MetastoreClient>> {
    Err(crate::error::HmsError::InvalidConfig(format!(
        "cannot connect to {}: built without the `thrift` feature",
        config.uri
    )))
}
