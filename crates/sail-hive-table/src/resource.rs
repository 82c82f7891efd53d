//! Lifecycle hooks a pipeline calls on the resources it reads and writes

use async_trait::async_trait;
use object_store::buffered::BufWriter;

use crate::config::JobConf;
use crate::error::TapResult;

/// A source or sink resource of a pipeline job
///
/// The pipeline calls `resource_exists` and `create_resource` while planning,
/// the conf-init hooks when it configures readers and writers, and
/// `commit_resource` once after the job succeeded.
#[async_trait]
pub trait Tap: Send + Sync {
    /// Location or name identifying the resource
    fn identifier(&self) -> &str;

    async fn create_resource(&self, conf: &JobConf) -> TapResult<bool>;

    async fn resource_exists(&self, conf: &JobConf) -> TapResult<bool>;

    async fn delete_resource(&self, conf: &JobConf) -> TapResult<bool>;

    async fn commit_resource(&self, conf: &JobConf) -> TapResult<bool>;

    /// Last modification time in milliseconds since the epoch
    async fn modified_time(&self, conf: &JobConf) -> TapResult<i64>;

    async fn sink_conf_init(&self, conf: &mut JobConf) -> TapResult<()>;

    async fn source_conf_init(&self, conf: &mut JobConf) -> TapResult<()>;

    /// Writer for a new file `file_name` inside the resource
    async fn open_for_write(&self, conf: &JobConf, file_name: &str) -> TapResult<BufWriter>;
}
