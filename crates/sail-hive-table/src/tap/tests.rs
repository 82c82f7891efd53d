use std::sync::atomic::AtomicBool;

use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

use super::*;
use crate::client::embedded::EmbeddedMetastore;
use crate::client::MetastoreClient;
use crate::config::{
    HIVE_METASTORE_URIS, HIVE_METASTORE_WAREHOUSE, INPUT_DIR, MAPREDUCE_FRAMEWORK_NAME,
    OUTPUT_DIR,
};
use crate::descriptor::HiveTableDescriptorBuilder;
use crate::error::{HmsError, HmsResult, ValidationError};
use crate::types::{FieldSchema, ValidTxnList};

struct Fixture {
    metastore: EmbeddedMetastore,
    warehouse: TempDir,
    conf: JobConf,
}

impl Fixture {
    fn new() -> Self {
        let warehouse = tempfile::tempdir().unwrap();
        let conf = JobConf::new().with(
            HIVE_METASTORE_WAREHOUSE,
            warehouse.path().to_str().unwrap(),
        );
        Self {
            metastore: EmbeddedMetastore::new(),
            warehouse,
            conf,
        }
    }

    async fn tap(&self, descriptor: HiveTableDescriptor, strict: bool) -> HiveTap {
        HiveTap::with_factory(
            descriptor,
            strict,
            &self.conf,
            Arc::new(self.metastore.clone()),
        )
        .await
        .unwrap()
    }

    fn orders_location(&self) -> String {
        orders().location(self.conf.warehouse_dir())
    }
}

fn orders_builder() -> HiveTableDescriptorBuilder {
    HiveTableDescriptor::builder("orders")
        .database("sales")
        .columns(&["id", "amount", "ds"], &["int", "double", "string"])
        .partition_keys(&["ds"])
}

fn orders() -> HiveTableDescriptor {
    orders_builder().build().unwrap()
}

fn transactional_orders() -> HiveTableDescriptor {
    orders_builder()
        .transactional(true)
        .bucket_count(4)
        .build()
        .unwrap()
}

/// Client factory whose clients fail every call while `failing` is set
struct FlakyFactory {
    metastore: EmbeddedMetastore,
    failing: AtomicBool,
}

impl FlakyFactory {
    fn new(metastore: EmbeddedMetastore) -> Self {
        Self {
            metastore,
            failing: AtomicBool::new(false),
        }
    }

    fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MetastoreClientFactory for FlakyFactory {
    async fn new_client(&self, _conf: &JobConf) -> HmsResult<Box<dyn MetastoreClient>> {
        Ok(Box::new(FlakyClient {
            inner: self.metastore.connect(),
            failing: self.failing.load(Ordering::SeqCst),
        }))
    }
}

struct FlakyClient {
    inner: Box<dyn MetastoreClient>,
    failing: bool,
}

impl FlakyClient {
    fn check(&self) -> HmsResult<()> {
        if self.failing {
            return Err(HmsError::ThriftTransport("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetastoreClient for FlakyClient {
    async fn get_database(&self, name: &str) -> HmsResult<Database> {
        self.check()?;
        self.inner.get_database(name).await
    }

    async fn create_database(&self, database: Database) -> HmsResult<()> {
        self.check()?;
        self.inner.create_database(database).await
    }

    async fn get_table(&self, database: &str, table: &str) -> HmsResult<Table> {
        self.check()?;
        self.inner.get_table(database, table).await
    }

    async fn create_table(&self, table: Table) -> HmsResult<()> {
        self.check()?;
        self.inner.create_table(table).await
    }

    async fn drop_table(
        &self,
        database: &str,
        table: &str,
        delete_data: bool,
        ignore_unknown: bool,
    ) -> HmsResult<()> {
        self.check()?;
        self.inner
            .drop_table(database, table, delete_data, ignore_unknown)
            .await
    }

    async fn add_partition(&self, partition: Partition) -> HmsResult<Partition> {
        self.check()?;
        self.inner.add_partition(partition).await
    }

    async fn get_valid_txns(&self) -> HmsResult<ValidTxnList> {
        self.check()?;
        self.inner.get_valid_txns().await
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

#[tokio::test]
async fn test_missing_table_does_not_exist() {
    let fixture = Fixture::new();
    for strict in [false, true] {
        let tap = fixture.tap(orders(), strict).await;
        assert!(!tap.resource_exists(&fixture.conf).await.unwrap());
        assert_eq!(tap.last_modified(), 0);
    }
    assert_eq!(fixture.metastore.stats().open_clients(), 0);
}

#[tokio::test]
async fn test_construction_falls_back_to_descriptor() {
    let fixture = Fixture::new();
    let tap = fixture.tap(orders(), false).await;
    assert_eq!(tap.location(), fixture.orders_location());
    assert!(!tap.is_transactional());
    assert!(!tap.is_strict());
    assert!(framework::registered().contains(&FRAMEWORK_NAME.to_string()));
}

#[tokio::test]
async fn test_construction_adopts_existing_table() {
    let fixture = Fixture::new();
    fixture
        .metastore
        .put_table(transactional_orders().to_hive_table("/data/external/orders"));

    let tap = fixture.tap(orders(), false).await;
    assert_eq!(tap.location(), "/data/external/orders");
    assert!(tap.is_transactional());

    let stats = fixture.metastore.stats();
    assert_eq!(stats.get_table, 1);
    assert_eq!(stats.open_clients(), 0);
}

#[tokio::test]
async fn test_create_orders_table() {
    let fixture = Fixture::new();
    let tap = fixture.tap(orders(), false).await;

    assert!(tap.create_resource(&fixture.conf).await.unwrap());

    let database = fixture.metastore.database("sales").unwrap();
    assert_eq!(
        database.description,
        Some(format!("created by {}", FRAMEWORK_NAME))
    );
    assert_eq!(
        database.location_uri,
        format!("{}/sales.db", fixture.warehouse.path().to_str().unwrap())
    );

    let table = fixture.metastore.table("sales", "orders").unwrap();
    assert_eq!(table.partition_keys, vec![FieldSchema::new("ds", "string")]);
    assert_eq!(
        table.sd.cols,
        vec![FieldSchema::new("id", "int"), FieldSchema::new("amount", "double")]
    );
    assert_eq!(table.sd.location, fixture.orders_location());
    assert_eq!(table.table_type, "MANAGED_TABLE");
    assert!(tap.last_modified() > 0);

    assert!(tap.resource_exists(&fixture.conf).await.unwrap());
    assert_eq!(fixture.metastore.stats().open_clients(), 0);
}

#[tokio::test]
async fn test_create_resource_is_idempotent() {
    let fixture = Fixture::new();
    let tap = fixture.tap(orders(), false).await;

    assert!(tap.create_resource(&fixture.conf).await.unwrap());
    assert!(tap.create_resource(&fixture.conf).await.unwrap());

    let stats = fixture.metastore.stats();
    assert_eq!(stats.create_database, 1);
    assert_eq!(stats.create_table, 1);
    assert_eq!(stats.open_clients(), 0);
}

#[tokio::test]
async fn test_create_resource_in_existing_database() {
    let fixture = Fixture::new();
    let customers = HiveTableDescriptor::builder("customers")
        .database("sales")
        .columns(&["id", "name"], &["int", "string"])
        .build()
        .unwrap();
    fixture.tap(orders(), false).await.create_resource(&fixture.conf).await.unwrap();
    fixture.tap(customers, false).await.create_resource(&fixture.conf).await.unwrap();

    let stats = fixture.metastore.stats();
    assert_eq!(stats.create_database, 1);
    assert_eq!(stats.create_table, 2);
}

#[tokio::test]
async fn test_strict_matching_table_exists() {
    let fixture = Fixture::new();
    fixture
        .tap(orders(), false)
        .await
        .create_resource(&fixture.conf)
        .await
        .unwrap();

    let tap = fixture.tap(orders(), true).await;
    assert!(tap.resource_exists(&fixture.conf).await.unwrap());
    assert!(tap.create_resource(&fixture.conf).await.unwrap());
    assert_eq!(fixture.metastore.stats().create_table, 1);
}

/// Strict existence check of `orders` against a remote table built from `remote`
async fn strict_mismatch(remote: HiveTableDescriptor) -> ValidationError {
    let fixture = Fixture::new();
    fixture
        .metastore
        .put_table(remote.to_hive_table(&fixture.orders_location()));

    let tap = fixture.tap(orders(), true).await;
    let result = tap.resource_exists(&fixture.conf).await;
    assert_eq!(fixture.metastore.stats().open_clients(), 0);
    match result {
        Err(TapError::Validation(e)) => e,
        other => panic!("expected a validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_strict_table_type_mismatch() {
    let remote = orders_builder()
        .location("/warehouse/sales.db/orders")
        .build()
        .unwrap();
    assert_eq!(
        strict_mismatch(remote).await,
        ValidationError::TableType {
            expected: "MANAGED_TABLE".to_string(),
            found: "EXTERNAL_TABLE".to_string(),
        }
    );
}

#[tokio::test]
async fn test_strict_location_mismatch() {
    let fixture = Fixture::new();
    let tap = fixture.tap(orders(), true).await;
    // created elsewhere by another writer after the tap resolved its location
    fixture
        .metastore
        .put_table(orders().to_hive_table("/elsewhere/orders"));

    match tap.resource_exists(&fixture.conf).await {
        Err(TapError::Validation(ValidationError::Location { expected, found })) => {
            assert_eq!(expected, format!("file://{}", fixture.orders_location()));
            assert_eq!(found, "file:///elsewhere/orders");
        }
        other => panic!("expected a location mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_strict_existing_table_at_other_location() {
    let fixture = Fixture::new();
    fixture
        .metastore
        .put_table(orders().to_hive_table("/elsewhere/orders"));

    let tap = fixture.tap(orders(), true).await;
    assert_eq!(tap.location(), "/elsewhere/orders");
    match tap.resource_exists(&fixture.conf).await {
        Err(TapError::Validation(ValidationError::Location { expected, found })) => {
            assert_eq!(expected, format!("file://{}", fixture.orders_location()));
            assert_eq!(found, "file:///elsewhere/orders");
        }
        other => panic!("expected a location mismatch, got {:?}", other),
    }

    // non-strict taps accept the stored location
    let tap = fixture.tap(orders(), false).await;
    assert!(tap.resource_exists(&fixture.conf).await.unwrap());
}

#[tokio::test]
async fn test_strict_column_count_mismatch() {
    let remote = HiveTableDescriptor::builder("orders")
        .database("sales")
        .columns(
            &["id", "amount", "note", "ds"],
            &["int", "double", "string", "string"],
        )
        .partition_keys(&["ds"])
        .build()
        .unwrap();
    assert_eq!(
        strict_mismatch(remote).await,
        ValidationError::ColumnCount {
            expected: 2,
            found: 3
        }
    );
}

#[tokio::test]
async fn test_strict_transactional_mismatch() {
    assert_eq!(
        strict_mismatch(transactional_orders()).await,
        ValidationError::Transactional {
            expected: false,
            found: true
        }
    );
}

#[tokio::test]
async fn test_strict_column_name_mismatch() {
    let remote = HiveTableDescriptor::builder("orders")
        .database("sales")
        .columns(&["id", "total", "ds"], &["int", "double", "string"])
        .partition_keys(&["ds"])
        .build()
        .unwrap();
    assert_eq!(
        strict_mismatch(remote).await,
        ValidationError::ColumnName {
            expected: "amount".to_string(),
            found: "total".to_string(),
        }
    );
}

#[tokio::test]
async fn test_strict_column_type_mismatch() {
    let remote = HiveTableDescriptor::builder("orders")
        .database("sales")
        .columns(&["id", "amount", "ds"], &["int", "float", "string"])
        .partition_keys(&["ds"])
        .build()
        .unwrap();
    assert_eq!(
        strict_mismatch(remote).await,
        ValidationError::ColumnType {
            expected: "double".to_string(),
            found: "float".to_string(),
        }
    );
}

#[tokio::test]
async fn test_strict_partition_count_mismatch() {
    let remote = HiveTableDescriptor::builder("orders")
        .database("sales")
        .columns(
            &["id", "amount", "ds", "hr"],
            &["int", "double", "string", "int"],
        )
        .partition_keys(&["ds", "hr"])
        .build()
        .unwrap();
    assert_eq!(
        strict_mismatch(remote).await,
        ValidationError::PartitionCount {
            expected: 1,
            found: 2
        }
    );
}

#[tokio::test]
async fn test_strict_partition_name_mismatch() {
    let remote = HiveTableDescriptor::builder("orders")
        .database("sales")
        .columns(&["id", "amount", "dt"], &["int", "double", "string"])
        .partition_keys(&["dt"])
        .build()
        .unwrap();
    assert_eq!(
        strict_mismatch(remote).await,
        ValidationError::PartitionName {
            expected: "ds".to_string(),
            found: "dt".to_string(),
        }
    );
}

#[tokio::test]
async fn test_strict_partition_type_mismatch() {
    let remote = HiveTableDescriptor::builder("orders")
        .database("sales")
        .columns(&["id", "amount", "ds"], &["int", "double", "date"])
        .partition_keys(&["ds"])
        .build()
        .unwrap();
    assert_eq!(
        strict_mismatch(remote).await,
        ValidationError::PartitionType {
            expected: "string".to_string(),
            found: "date".to_string(),
        }
    );
}

#[tokio::test]
async fn test_modified_time_from_table() {
    let fixture = Fixture::new();
    let mut table = orders().to_hive_table(&fixture.orders_location());
    table.create_time = 1_600_000_000;
    fixture.metastore.put_table(table.clone());

    let tap = fixture.tap(orders(), false).await;
    assert!(tap.resource_exists(&fixture.conf).await.unwrap());
    assert_eq!(tap.modified_time(&fixture.conf).await.unwrap(), 1_600_000_000_000);

    table.last_access_time = 1_700_000_000;
    fixture.metastore.put_table(table);
    assert!(tap.resource_exists(&fixture.conf).await.unwrap());
    assert_eq!(tap.last_modified(), 1_700_000_000_000);
}

#[tokio::test]
async fn test_transactional_writes_make_no_remote_calls() {
    let fixture = Fixture::new();
    fixture
        .metastore
        .put_table(transactional_orders().to_hive_table(&fixture.orders_location()));
    let tap = fixture.tap(orders(), false).await;
    assert!(tap.is_transactional());

    let before = fixture.metastore.stats();
    let mut conf = fixture.conf.clone();
    assert!(matches!(
        tap.create_resource(&conf).await,
        Err(TapError::TransactionalWrite)
    ));
    assert!(matches!(
        tap.delete_resource(&conf).await,
        Err(TapError::TransactionalWrite)
    ));
    assert!(matches!(
        tap.sink_conf_init(&mut conf).await,
        Err(TapError::TransactionalWrite)
    ));
    assert!(matches!(
        tap.open_for_write(&conf, "part-00000").await,
        Err(TapError::TransactionalWrite)
    ));

    assert_eq!(fixture.metastore.stats(), before);
    assert_eq!(conf.get(OUTPUT_DIR), None);
    assert!(fixture.metastore.table("sales", "orders").is_some());
}

#[tokio::test]
async fn test_declared_transactional_table_is_not_created() {
    let fixture = Fixture::new();
    let tap = fixture.tap(transactional_orders(), false).await;
    assert!(matches!(
        tap.create_resource(&fixture.conf).await,
        Err(TapError::TransactionalWrite)
    ));
    // a commit still tries to create the table and fails the same way
    match tap.commit_resource(&fixture.conf).await {
        Err(TapError::Resource(inner)) => {
            assert!(matches!(*inner, TapError::TransactionalWrite))
        }
        other => panic!("expected a resource error, got {:?}", other),
    }
    assert_eq!(fixture.metastore.stats().create_table, 0);
}

#[tokio::test]
async fn test_transactional_source_stamps_txns_and_buckets() {
    let fixture = Fixture::new();
    fixture
        .metastore
        .put_table(transactional_orders().to_hive_table(&fixture.orders_location()));
    let aborted = fixture.metastore.open_transaction();
    let committed = fixture.metastore.open_transaction();
    let open = fixture.metastore.open_transaction();
    fixture.metastore.abort_transaction(aborted).unwrap();
    fixture.metastore.commit_transaction(committed).unwrap();

    let tap = fixture.tap(transactional_orders(), false).await;
    let mut conf = fixture.conf.clone();
    tap.source_conf_init(&mut conf).await.unwrap();

    let txns: ValidTxnList = conf.get(VALID_TXNS_KEY).unwrap().parse().unwrap();
    assert_eq!(txns.high_watermark(), open);
    assert!(!txns.is_txn_valid(aborted));
    assert!(txns.is_txn_valid(committed));
    assert!(!txns.is_txn_valid(open));
    assert_eq!(conf.get_int(BUCKET_COUNT).unwrap(), Some(4));
    assert_eq!(
        conf.get(INPUT_DIR),
        Some(format!("file://{}", fixture.orders_location()).as_str())
    );
    assert_eq!(fixture.metastore.stats().open_clients(), 0);
}

#[tokio::test]
async fn test_plain_source_skips_transaction_snapshot() {
    let fixture = Fixture::new();
    let tap = fixture.tap(orders(), false).await;
    let mut conf = fixture.conf.clone();
    tap.source_conf_init(&mut conf).await.unwrap();

    assert_eq!(conf.get(VALID_TXNS_KEY), None);
    assert_eq!(conf.get(BUCKET_COUNT), None);
    assert!(conf.get(INPUT_DIR).is_some());
    assert_eq!(fixture.metastore.stats().get_valid_txns, 0);
}

#[tokio::test]
async fn test_sink_conf_init_sets_output_dir() {
    let fixture = Fixture::new();
    let tap = fixture.tap(orders(), false).await;
    let mut conf = fixture.conf.clone();
    tap.sink_conf_init(&mut conf).await.unwrap();
    assert_eq!(
        conf.get(OUTPUT_DIR),
        Some(format!("file://{}", fixture.orders_location()).as_str())
    );
}

#[tokio::test]
async fn test_commit_resource_creates_table() {
    let fixture = Fixture::new();
    let tap = fixture.tap(orders(), false).await;
    assert!(tap.commit_resource(&fixture.conf).await.unwrap());
    assert!(fixture.metastore.table("sales", "orders").is_some());

    assert!(tap.commit_resource(&fixture.conf).await.unwrap());
    assert_eq!(fixture.metastore.stats().create_table, 1);
}

#[tokio::test]
async fn test_delete_resource_removes_files_and_table() {
    let fixture = Fixture::new();
    let tap = fixture.tap(orders(), false).await;
    tap.create_resource(&fixture.conf).await.unwrap();

    let mut writer = tap
        .open_for_write(&fixture.conf, "part-00000")
        .await
        .unwrap();
    writer.write_all(b"1\x0142.5\x012024-01-01\n").await.unwrap();
    writer.shutdown().await.unwrap();
    let location = std::path::PathBuf::from(fixture.orders_location());
    assert!(location.join("part-00000").exists());

    assert!(tap.delete_resource(&fixture.conf).await.unwrap());
    assert!(!location.exists());
    assert!(fixture.metastore.table("sales", "orders").is_none());
    assert!(!tap.resource_exists(&fixture.conf).await.unwrap());

    // dropping a missing table is tolerated by the metastore call itself
    assert!(tap.delete_resource(&fixture.conf).await.unwrap());
    assert_eq!(fixture.metastore.stats().drop_table, 2);
}

#[tokio::test]
async fn test_register_partition_unpartitioned_is_noop() {
    let fixture = Fixture::new();
    let customers = HiveTableDescriptor::builder("customers")
        .columns(&["id", "name"], &["int", "string"])
        .build()
        .unwrap();
    let tap = fixture.tap(customers, false).await;
    let before = fixture.metastore.stats();

    // not local and no central metastore, still fine
    let conf = fixture.conf.clone().with(MAPREDUCE_FRAMEWORK_NAME, "yarn");
    tap.register_partition(&conf, Partition::default()).await.unwrap();
    tap.register_partition_path(&conf, "ds=2024-01-01").await.unwrap();

    assert_eq!(fixture.metastore.stats(), before);
}

#[tokio::test]
async fn test_register_partition_requires_central_metastore() {
    let fixture = Fixture::new();
    let tap = fixture.tap(orders(), false).await;
    let conf = fixture.conf.clone().with(MAPREDUCE_FRAMEWORK_NAME, "yarn");

    assert!(matches!(
        tap.register_partition_path(&conf, "ds=2024-01-01").await,
        Err(TapError::MissingCentralMetastore)
    ));
    assert!(fixture.metastore.table("sales", "orders").is_none());

    let conf = conf.with(HIVE_METASTORE_URIS, "thrift://metastore:9083");
    tap.register_partition_path(&conf, "ds=2024-01-01").await.unwrap();
    assert_eq!(fixture.metastore.partitions("sales", "orders").len(), 1);
}

#[tokio::test]
async fn test_register_partition_is_idempotent() {
    let fixture = Fixture::new();
    let tap = fixture.tap(orders(), false).await;

    tap.register_partition_path(&fixture.conf, "ds=2024-01-01")
        .await
        .unwrap();
    tap.register_partition_path(&fixture.conf, "ds=2024-01-01")
        .await
        .unwrap();

    let partitions = fixture.metastore.partitions("sales", "orders");
    assert_eq!(partitions.len(), 1);
    assert_eq!(partitions[0].values, vec!["2024-01-01"]);
    assert_eq!(
        partitions[0].sd.location,
        format!("{}/ds=2024-01-01", fixture.orders_location())
    );

    let stats = fixture.metastore.stats();
    assert_eq!(stats.create_table, 1);
    assert_eq!(stats.add_partition, 2);
    assert_eq!(stats.open_clients(), 0);
}

#[tokio::test]
async fn test_register_partition_surfaces_other_errors() {
    let fixture = Fixture::new();
    let tap = fixture.tap(orders(), false).await;
    let partition = Partition {
        db_name: "sales".to_string(),
        table_name: "orders".to_string(),
        values: vec!["2024-01-01".to_string(), "extra".to_string()],
        ..Default::default()
    };
    match tap.register_partition(&fixture.conf, partition).await {
        Err(TapError::Metastore { source, .. }) => {
            assert!(matches!(source, HmsError::Meta(_)))
        }
        other => panic!("expected a metastore error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_construction_releases_client() {
    let metastore = EmbeddedMetastore::new();
    let factory = Arc::new(FlakyFactory::new(metastore.clone()));
    factory.fail();

    let result = HiveTap::with_factory(orders(), false, &JobConf::new(), factory.clone()).await;
    match result {
        Err(e) => assert_eq!(
            e.metastore_error(),
            Some(&HmsError::ThriftTransport("connection reset".to_string()))
        ),
        Ok(tap) => panic!("expected construction to fail, got {:?}", tap),
    }

    let stats = metastore.stats();
    assert_eq!(stats.opened, 1);
    assert_eq!(stats.closed, 1);
}

#[tokio::test]
async fn test_metastore_failures_are_surfaced_and_release_clients() {
    let fixture = Fixture::new();
    fixture
        .metastore
        .put_table(transactional_orders().to_hive_table("/data/acid/orders"));
    let factory = Arc::new(FlakyFactory::new(fixture.metastore.clone()));
    let acid = HiveTap::with_factory(orders(), false, &fixture.conf, factory.clone())
        .await
        .unwrap();
    let customers = HiveTableDescriptor::builder("customers")
        .database("sales")
        .columns(&["id", "day"], &["int", "string"])
        .partition_keys(&["day"])
        .build()
        .unwrap();
    let plain = HiveTap::with_factory(customers, false, &fixture.conf, factory.clone())
        .await
        .unwrap();
    factory.fail();

    assert!(matches!(
        plain.resource_exists(&fixture.conf).await,
        Err(TapError::Metastore { .. })
    ));
    assert!(matches!(
        plain.create_resource(&fixture.conf).await,
        Err(TapError::Metastore { .. })
    ));
    assert!(matches!(
        plain.delete_resource(&fixture.conf).await,
        Err(TapError::Metastore { .. })
    ));
    assert!(matches!(
        plain.commit_resource(&fixture.conf).await,
        Err(TapError::Resource(_))
    ));
    assert!(matches!(
        plain
            .register_partition_path(&fixture.conf, "day=monday")
            .await,
        Err(TapError::Metastore { .. })
    ));

    let mut conf = fixture.conf.clone();
    assert!(matches!(
        acid.source_conf_init(&mut conf).await,
        Err(TapError::TransactionList(HmsError::ThriftTransport(_)))
    ));
    assert_eq!(conf.get(VALID_TXNS_KEY), None);

    let stats = fixture.metastore.stats();
    assert!(stats.opened > 2);
    assert_eq!(stats.open_clients(), 0);
}

#[tokio::test]
async fn test_default_factory_uses_embedded_metastore() {
    let warehouse = tempfile::tempdir().unwrap();
    let conf = JobConf::new().with(
        HIVE_METASTORE_WAREHOUSE,
        warehouse.path().to_str().unwrap(),
    );
    let descriptor = HiveTableDescriptor::builder("default_factory_events")
        .database("hive_tap_tests")
        .columns(&["id", "payload"], &["bigint", "string"])
        .build()
        .unwrap();

    let tap = HiveTap::new(descriptor, true, &conf).await.unwrap();
    assert!(tap.create_resource(&conf).await.unwrap());
    assert!(EmbeddedMetastore::global()
        .table("hive_tap_tests", "default_factory_events")
        .is_some());
    assert!(tap.delete_resource(&conf).await.unwrap());
}

#[test]
fn test_parent_location() {
    assert_eq!(
        parent_location("/warehouse/sales.db/orders/"),
        "/warehouse/sales.db"
    );
    assert_eq!(parent_location("/orders"), "/");
    assert_eq!(parent_location("file:///orders"), "file:///");
    assert_eq!(
        parent_location("hdfs://nn:8020/warehouse/sales.db/orders"),
        "hdfs://nn:8020/warehouse/sales.db"
    );
}
