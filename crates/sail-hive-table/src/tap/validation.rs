//! Strict comparison of a metastore table against a descriptor

use crate::config::JobConf;
use crate::descriptor::HiveTableDescriptor;
use crate::error::{TapResult, ValidationError};
use crate::filesystem::make_qualified;
use crate::types::{FieldSchema, Table};

/// Check `table` against `descriptor`, reporting the first field that differs
///
/// `location` is where the descriptor places the table. Columns are
/// compared by position, names and types ignoring case.
pub(crate) fn validate_table(
    descriptor: &HiveTableDescriptor,
    location: &str,
    table: &Table,
    conf: &JobConf,
) -> TapResult<()> {
    let expected_type = descriptor.table_type();
    if !table.table_type.eq_ignore_ascii_case(expected_type.as_str()) {
        return Err(ValidationError::TableType {
            expected: expected_type.to_string(),
            found: table.table_type.clone(),
        }
        .into());
    }

    let expected_location = make_qualified(location, conf)?;
    let found_location = make_qualified(&table.sd.location, conf)?;
    if expected_location != found_location {
        return Err(ValidationError::Location {
            expected: expected_location.to_string(),
            found: found_location.to_string(),
        }
        .into());
    }

    let data_columns = descriptor.data_columns();
    if data_columns.len() != table.sd.cols.len() {
        return Err(ValidationError::ColumnCount {
            expected: data_columns.len(),
            found: table.sd.cols.len(),
        }
        .into());
    }

    let transactional = table.is_transactional();
    if descriptor.is_transactional() != transactional {
        return Err(ValidationError::Transactional {
            expected: descriptor.is_transactional(),
            found: transactional,
        }
        .into());
    }

    for (expected, found) in data_columns.iter().zip(&table.sd.cols) {
        compare_field(expected, found, false)?;
    }

    let partition_columns = descriptor.partition_columns();
    if partition_columns.len() != table.partition_keys.len() {
        return Err(ValidationError::PartitionCount {
            expected: partition_columns.len(),
            found: table.partition_keys.len(),
        }
        .into());
    }

    for (expected, found) in partition_columns.iter().zip(&table.partition_keys) {
        compare_field(expected, found, true)?;
    }

    Ok(())
}

fn compare_field(
    expected: &FieldSchema,
    found: &FieldSchema,
    partition: bool,
) -> Result<(), ValidationError> {
    if !expected.name.eq_ignore_ascii_case(&found.name) {
        let (expected, found) = (expected.name.clone(), found.name.clone());
        return Err(if partition {
            ValidationError::PartitionName { expected, found }
        } else {
            ValidationError::ColumnName { expected, found }
        });
    }
    if !expected.field_type.eq_ignore_ascii_case(&found.field_type) {
        let (expected, found) = (expected.field_type.clone(), found.field_type.clone());
        return Err(if partition {
            ValidationError::PartitionType { expected, found }
        } else {
            ValidationError::ColumnType { expected, found }
        });
    }
    Ok(())
}
