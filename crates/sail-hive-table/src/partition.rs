//! Building metastore partitions for a partitioned table

use crate::descriptor::HiveTableDescriptor;
use crate::error::{HmsError, HmsResult};
use crate::types::{escape_partition_value, parse_partition_spec, Partition};

/// Translates between partition values, partition paths and metastore partitions
#[derive(Debug, Clone)]
pub struct HivePartition<'a> {
    descriptor: &'a HiveTableDescriptor,
}

impl<'a> HivePartition<'a> {
    pub fn new(descriptor: &'a HiveTableDescriptor) -> Self {
        Self { descriptor }
    }

    /// Relative path of a partition, e.g. `year=2024/month=01`
    pub fn partition_path<V: AsRef<str>>(&self, values: &[V]) -> HmsResult<String> {
        let keys = self.descriptor.partition_keys();
        if values.len() != keys.len() {
            return Err(HmsError::InvalidObject(format!(
                "table {}.{} has {} partition keys but got {} values",
                self.descriptor.database_name(),
                self.descriptor.table_name(),
                keys.len(),
                values.len()
            )));
        }

        Ok(keys
            .iter()
            .zip(values)
            .map(|(key, value)| format!("{}={}", key, escape_partition_value(value.as_ref())))
            .collect::<Vec<_>>()
            .join("/"))
    }

    /// Partition values encoded in a partition path, in partition key order
    pub fn parse_values(&self, partition_path: &str) -> HmsResult<Vec<String>> {
        let pairs = parse_partition_spec(partition_path)?;
        let keys = self.descriptor.partition_keys();
        if pairs.len() != keys.len() {
            return Err(HmsError::InvalidObject(format!(
                "partition '{}' does not match partition keys {:?}",
                partition_path, keys
            )));
        }

        pairs
            .into_iter()
            .zip(keys)
            .map(|((key, value), expected)| {
                if key.eq_ignore_ascii_case(expected) {
                    Ok(value)
                } else {
                    Err(HmsError::InvalidObject(format!(
                        "expected partition key '{}' but found '{}' in '{}'",
                        expected, key, partition_path
                    )))
                }
            })
            .collect()
    }

    /// Metastore partition for `partition_path` below `table_location`
    ///
    /// The partition inherits the table's storage descriptor with its own location.
    pub fn to_partition(&self, partition_path: &str, table_location: &str) -> HmsResult<Partition> {
        let values = self.parse_values(partition_path)?;
        let location = format!(
            "{}/{}",
            table_location.trim_end_matches('/'),
            partition_path.trim_matches('/')
        );

        let mut sd = self.descriptor.to_hive_table(table_location).sd;
        sd.location = location;

        Ok(Partition {
            db_name: self.descriptor.database_name().to_string(),
            table_name: self.descriptor.table_name().to_string(),
            values,
            sd,
            ..Default::default()
        })
    }
}
