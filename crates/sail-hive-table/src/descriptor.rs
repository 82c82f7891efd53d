//! Declared description of a Hive table

use arrow_schema::{Field, Schema};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use crate::error::{DescriptorError, HmsResult};
use crate::types::{
    parse_hms_type, FieldSchema, SerDeInfo, StorageDescriptor, Table, TableType,
    EXTERNAL_PARAMETER, LAZY_SIMPLE_SERDE, TEXT_INPUT_FORMAT, TEXT_OUTPUT_FORMAT,
    TRANSACTIONAL_PARAMETER,
};

pub const DEFAULT_DATABASE: &str = "default";
pub const DEFAULT_DELIMITER: &str = "\u{1}";

const SERIALIZATION_FORMAT: &str = "serialization.format";
const FIELD_DELIMITER: &str = "field.delim";

/// Immutable description of a Hive table as the pipeline expects it
///
/// Partition keys are the trailing columns of the table, in order. They are
/// stored by the metastore apart from the data columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiveTableDescriptor {
    database_name: String,
    table_name: String,
    column_names: Vec<String>,
    column_types: Vec<String>,
    partition_keys: Vec<String>,
    location: Option<String>,
    transactional: bool,
    bucket_count: i32,
    delimiter: String,
    serialization_lib: String,
}

impl HiveTableDescriptor {
    pub fn builder(table_name: impl Into<String>) -> HiveTableDescriptorBuilder {
        HiveTableDescriptorBuilder::new(table_name)
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn column_types(&self) -> &[String] {
        &self.column_types
    }

    pub fn partition_keys(&self) -> &[String] {
        &self.partition_keys
    }

    pub fn is_partitioned(&self) -> bool {
        !self.partition_keys.is_empty()
    }

    pub fn is_transactional(&self) -> bool {
        self.transactional
    }

    pub fn bucket_count(&self) -> i32 {
        self.bucket_count
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Explicit location; tables with one are created as external tables
    pub fn explicit_location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn table_type(&self) -> TableType {
        if self.location.is_some() {
            TableType::External
        } else {
            TableType::Managed
        }
    }

    /// Number of columns stored in the data files, i.e. without partition keys
    pub fn data_column_count(&self) -> usize {
        self.column_names.len() - self.partition_keys.len()
    }

    /// Data columns as metastore fields
    pub fn data_columns(&self) -> Vec<FieldSchema> {
        self.fields(0..self.data_column_count())
    }

    /// Partition columns as metastore fields
    pub fn partition_columns(&self) -> Vec<FieldSchema> {
        self.fields(self.data_column_count()..self.column_names.len())
    }

    fn fields(&self, range: std::ops::Range<usize>) -> Vec<FieldSchema> {
        self.column_names[range.clone()]
            .iter()
            .zip(&self.column_types[range])
            .map(|(name, field_type)| FieldSchema::new(name, field_type))
            .collect()
    }

    /// Location of the table's files given the warehouse root
    pub fn location(&self, warehouse: &str) -> String {
        if let Some(location) = &self.location {
            return location.clone();
        }
        let warehouse = warehouse.trim_end_matches('/');
        if self.database_name == DEFAULT_DATABASE {
            format!("{}/{}", warehouse, self.table_name)
        } else {
            format!("{}/{}.db/{}", warehouse, self.database_name, self.table_name)
        }
    }

    /// Metastore representation of this table stored at `location`
    pub fn to_hive_table(&self, location: &str) -> Table {
        let mut serde_parameters = HashMap::new();
        serde_parameters.insert(SERIALIZATION_FORMAT.to_string(), self.delimiter.clone());
        serde_parameters.insert(FIELD_DELIMITER.to_string(), self.delimiter.clone());

        let mut parameters = HashMap::new();
        if self.table_type() == TableType::External {
            parameters.insert(EXTERNAL_PARAMETER.to_string(), "TRUE".to_string());
        }
        if self.transactional {
            parameters.insert(TRANSACTIONAL_PARAMETER.to_string(), "true".to_string());
        }

        let data_columns = self.data_columns();
        let bucket_cols = if self.bucket_count > 0 {
            data_columns.first().map(|c| c.name.clone()).into_iter().collect()
        } else {
            Vec::new()
        };

        Table {
            db_name: self.database_name.clone(),
            table_name: self.table_name.clone(),
            sd: StorageDescriptor {
                cols: data_columns,
                location: location.to_string(),
                input_format: TEXT_INPUT_FORMAT.to_string(),
                output_format: TEXT_OUTPUT_FORMAT.to_string(),
                compressed: false,
                num_buckets: if self.bucket_count > 0 { self.bucket_count } else { -1 },
                serde_info: SerDeInfo {
                    name: None,
                    serialization_lib: self.serialization_lib.clone(),
                    parameters: serde_parameters,
                },
                bucket_cols,
                parameters: HashMap::new(),
            },
            partition_keys: self.partition_columns(),
            parameters,
            table_type: self.table_type().as_str().to_string(),
            ..Default::default()
        }
    }

    /// Arrow schema of all columns, partition keys last
    pub fn arrow_schema(&self) -> HmsResult<Schema> {
        let fields = self
            .column_names
            .iter()
            .zip(&self.column_types)
            .map(|(name, column_type)| Ok(Field::new(name, parse_hms_type(column_type)?, true)))
            .collect::<HmsResult<Vec<_>>>()?;
        Ok(Schema::new(fields))
    }
}

/// Builder validating a [`HiveTableDescriptor`]
#[derive(Debug, Clone)]
pub struct HiveTableDescriptorBuilder {
    database_name: String,
    table_name: String,
    columns: Vec<(String, String)>,
    column_count_mismatch: Option<(usize, usize)>,
    partition_keys: Vec<String>,
    location: Option<String>,
    transactional: bool,
    bucket_count: i32,
    delimiter: String,
    serialization_lib: String,
}

impl HiveTableDescriptorBuilder {
    fn new(table_name: impl Into<String>) -> Self {
        Self {
            database_name: DEFAULT_DATABASE.to_string(),
            table_name: table_name.into(),
            columns: Vec::new(),
            column_count_mismatch: None,
            partition_keys: Vec::new(),
            location: None,
            transactional: false,
            bucket_count: -1,
            delimiter: DEFAULT_DELIMITER.to_string(),
            serialization_lib: LAZY_SIMPLE_SERDE.to_string(),
        }
    }

    pub fn database(mut self, database_name: impl Into<String>) -> Self {
        self.database_name = database_name.into();
        self
    }

    pub fn column(mut self, name: impl Into<String>, column_type: impl Into<String>) -> Self {
        self.columns.push((name.into(), column_type.into()));
        self
    }

    /// Parallel name/type lists; a length mismatch is reported by `build`
    pub fn columns<N, T>(mut self, names: &[N], types: &[T]) -> Self
    where
        N: AsRef<str>,
        T: AsRef<str>,
    {
        if names.len() != types.len() {
            self.column_count_mismatch = Some((names.len(), types.len()));
        }
        self.columns.extend(
            names
                .iter()
                .zip(types)
                .map(|(n, t)| (n.as_ref().to_string(), t.as_ref().to_string())),
        );
        self
    }

    pub fn partition_keys<K: AsRef<str>>(mut self, keys: &[K]) -> Self {
        self.partition_keys = keys.iter().map(|k| k.as_ref().to_string()).collect();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    pub fn bucket_count(mut self, bucket_count: i32) -> Self {
        self.bucket_count = bucket_count;
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn serialization_lib(mut self, serialization_lib: impl Into<String>) -> Self {
        self.serialization_lib = serialization_lib.into();
        self
    }

    pub fn build(self) -> Result<HiveTableDescriptor, DescriptorError> {
        static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
        let name_regex = NAME_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

        // Hive stores identifiers in lower case
        let table_name = self.table_name.trim().to_lowercase();
        if !name_regex.is_match(&table_name) {
            return Err(DescriptorError::InvalidName {
                kind: "table",
                name: self.table_name,
            });
        }
        let database_name = self.database_name.trim().to_lowercase();
        if !name_regex.is_match(&database_name) {
            return Err(DescriptorError::InvalidName {
                kind: "database",
                name: self.database_name,
            });
        }

        if let Some((names, types)) = self.column_count_mismatch {
            return Err(DescriptorError::ColumnTypeMismatch { names, types });
        }
        if self.columns.is_empty() {
            return Err(DescriptorError::NoColumns);
        }

        let mut seen = HashSet::new();
        for (position, (name, column_type)) in self.columns.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(DescriptorError::EmptyColumnName(position));
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(DescriptorError::DuplicateColumn(name.clone()));
            }
            parse_hms_type(column_type).map_err(|e| DescriptorError::InvalidColumnType {
                column: name.clone(),
                column_type: column_type.clone(),
                reason: e.to_string(),
            })?;
        }

        let partition_count = self.partition_keys.len();
        if partition_count > 0 {
            if partition_count >= self.columns.len() {
                return Err(DescriptorError::OnlyPartitionColumns);
            }
            let trailing = &self.columns[self.columns.len() - partition_count..];
            let in_order = trailing
                .iter()
                .zip(&self.partition_keys)
                .all(|((name, _), key)| name.eq_ignore_ascii_case(key));
            if !in_order {
                return Err(DescriptorError::PartitionKeysNotTrailing {
                    keys: self.partition_keys,
                });
            }
        }

        if self.transactional && self.bucket_count <= 0 {
            return Err(DescriptorError::MissingBuckets(self.bucket_count));
        }

        let (column_names, column_types) = self.columns.into_iter().unzip();

        Ok(HiveTableDescriptor {
            database_name,
            table_name,
            column_names,
            column_types,
            partition_keys: self.partition_keys,
            location: self.location,
            transactional: self.transactional,
            bucket_count: self.bucket_count,
            delimiter: self.delimiter,
            serialization_lib: self.serialization_lib,
        })
    }
}
