//! Hive Metastore backed table resources for Sail pipelines
//!
//! This crate lets a pipeline read from and write to tables managed by an
//! Apache Hive Metastore (HMS). A [`HiveTap`] binds a declared table to the
//! pipeline's resource lifecycle: it checks whether the table exists (and, in
//! strict mode, whether it still looks like the declared one), creates it on
//! demand, drops it, registers partitions and prepares job configuration for
//! readers of transactional tables.
//!
//! # Features
//!
//! - **One client per call**: metastore clients are created by a factory and
//!   closed when the operation ends, on every path
//! - **Embedded metastore**: local jobs without `hive.metastore.uris` use an
//!   in-process catalog
//! - **Thrift**: the `thrift` feature connects to a remote HMS
//!
//! # Example
//!
//! ```no_run
//! use sail_hive_table::{HiveTableDescriptor, HiveTap, JobConf, Tap};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let descriptor = HiveTableDescriptor::builder("orders")
//!         .database("sales")
//!         .columns(&["id", "amount", "ds"], &["int", "double", "string"])
//!         .partition_keys(&["ds"])
//!         .build()?;
//!
//!     let conf = JobConf::new().with("hive.metastore.warehouse.dir", "/tmp/warehouse");
//!     let tap = HiveTap::new(descriptor, true, &conf).await?;
//!
//!     tap.create_resource(&conf).await?;
//!     tap.register_partition_path(&conf, "ds=2024-01-01").await?;
//!     Ok(())
//! }
//! ```

// Re-export commonly used types
pub use client::factory::{DefaultClientFactory, MetastoreClientFactory};
pub use client::{MetastoreClient, ScopedClient};
pub use config::{HmsConfig, JobConf};
pub use descriptor::{HiveTableDescriptor, HiveTableDescriptorBuilder};
pub use error::{DescriptorError, HmsError, HmsResult, TapError, TapResult, ValidationError};
pub use filesystem::FileTap;
pub use partition::HivePartition;
pub use resource::Tap;
pub use tap::HiveTap;
pub use types::ValidTxnList;

// Public modules
pub mod client;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod filesystem;
pub mod framework;
pub mod partition;
pub mod resource;
pub mod tap;
pub mod types;
