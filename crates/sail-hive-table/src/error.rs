//! Error types for Hive table resources

use thiserror::Error;

use crate::config::HIVE_METASTORE_URIS;

/// Result type for metastore client operations
pub type HmsResult<T> = Result<T, HmsError>;

/// Result type for tap operations
pub type TapResult<T> = Result<T, TapError>;

/// Errors reported by a metastore client
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HmsError {
    /// Database not found in HMS
    #[error("database not found: {0}")]
    DatabaseNotFound(String),

    /// Table not found in HMS
    #[error("table not found: {database}.{table}")]
    TableNotFound { database: String, table: String },

    /// Database already exists
    #[error("database already exists: {0}")]
    DatabaseAlreadyExists(String),

    /// Table already exists
    #[error("table already exists: {database}.{table}")]
    TableAlreadyExists { database: String, table: String },

    /// Partition already exists
    #[error("partition already exists: {database}.{table} {values:?}")]
    PartitionAlreadyExists {
        database: String,
        table: String,
        values: Vec<String>,
    },

    /// The metastore rejected an object as malformed or dangling
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// Generic metastore failure (MetaException)
    #[error("metastore error: {0}")]
    Meta(String),

    /// Thrift protocol error
    #[error("Thrift protocol error: {0}")]
    ThriftProtocol(String),

    /// Thrift transport error
    #[error("Thrift transport error: {0}")]
    ThriftTransport(String),

    /// Invalid HMS URI format
    #[error("invalid HMS URI: {0}")]
    InvalidUri(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Type conversion error between Hive and Arrow types
    #[error("type conversion error: {0}")]
    TypeConversion(String),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl HmsError {
    /// Whether the metastore reported the requested object as missing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            HmsError::DatabaseNotFound(_) | HmsError::TableNotFound { .. }
        )
    }

    /// Whether the metastore reported the object as already present
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            HmsError::DatabaseAlreadyExists(_)
                | HmsError::TableAlreadyExists { .. }
                | HmsError::PartitionAlreadyExists { .. }
        )
    }
}

/// A mismatch between an existing table and the descriptor, found in strict mode
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expected a table of type '{expected}' but found '{found}'")]
    TableType { expected: String, found: String },

    #[error("table in MetaStore does not have the same path. Expected {expected} got {found}")]
    Location { expected: String, found: String },

    #[error("table in MetaStore does not have same number of columns. expected {expected} got {found}")]
    ColumnCount { expected: usize, found: usize },

    #[error("table in MetaStore does not have the same ACID properties. expected {expected} got {found}")]
    Transactional { expected: bool, found: bool },

    #[error("hive schema mismatch: expected column name '{expected}', but found '{found}'")]
    ColumnName { expected: String, found: String },

    #[error("hive schema mismatch: expected column type '{expected}', but found '{found}'")]
    ColumnType { expected: String, found: String },

    #[error("table in MetaStore does not have same number of partition columns. expected {expected} got {found}")]
    PartitionCount { expected: usize, found: usize },

    #[error("hive partition schema mismatch: expected column name '{expected}', but found '{found}'")]
    PartitionName { expected: String, found: String },

    #[error("hive partition schema mismatch: expected column type '{expected}', but found '{found}'")]
    PartitionType { expected: String, found: String },
}

/// A table descriptor that cannot describe a valid Hive table
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },

    #[error("a table needs at least one column")]
    NoColumns,

    #[error("got {names} column names but {types} column types")]
    ColumnTypeMismatch { names: usize, types: usize },

    #[error("column name cannot be empty (position {0})")]
    EmptyColumnName(usize),

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("invalid type '{column_type}' for column '{column}': {reason}")]
    InvalidColumnType {
        column: String,
        column_type: String,
        reason: String,
    },

    #[error("partition keys {keys:?} must be the trailing columns of the table")]
    PartitionKeysNotTrailing { keys: Vec<String> },

    #[error("all columns cannot be partition keys")]
    OnlyPartitionColumns,

    #[error("transactional tables need a positive bucket count, got {0}")]
    MissingBuckets(i32),
}

/// Errors raised by the Hive tap
#[derive(Debug, Error)]
pub enum TapError {
    /// A metastore call failed; surfaced as an I/O failure of the resource
    #[error("metastore I/O failure while {action}: {source}")]
    Metastore {
        action: &'static str,
        #[source]
        source: HmsError,
    },

    /// Object store failure on the table location
    #[error("storage failure on '{path}': {source}")]
    Storage {
        path: String,
        #[source]
        source: object_store::Error,
    },

    /// The table location cannot be turned into a storage URL
    #[error("invalid location '{location}': {reason}")]
    InvalidLocation { location: String, reason: String },

    /// Strict mode found a different table than the one described
    #[error("hive table validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Writes, DDL and deletes are not supported on ACID tables
    #[error("writing to an ACID table is not currently supported")]
    TransactionalWrite,

    /// Partition registration needs a shared metastore outside local mode
    #[error("cannot register partition without central metastore, please set '{}' to your metastore", HIVE_METASTORE_URIS)]
    MissingCentralMetastore,

    /// The valid transaction snapshot for an ACID read could not be fetched
    #[error("could not fetch transaction list from meta store: {0}")]
    TransactionList(#[source] HmsError),

    /// A lifecycle step failed as a whole
    #[error("resource operation failed: {0}")]
    Resource(#[source] Box<TapError>),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

impl TapError {
    pub(crate) fn metastore(action: &'static str, source: HmsError) -> Self {
        TapError::Metastore { action, source }
    }

    /// The underlying metastore error, if this failure came from a metastore call
    pub fn metastore_error(&self) -> Option<&HmsError> {
        match self {
            TapError::Metastore { source, .. } | TapError::TransactionList(source) => Some(source),
            TapError::Resource(inner) => inner.metastore_error(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(HmsError::DatabaseNotFound("sales".into()).is_not_found());
        assert!(HmsError::TableNotFound {
            database: "sales".into(),
            table: "orders".into()
        }
        .is_not_found());
        assert!(!HmsError::Meta("boom".into()).is_not_found());
        assert!(!HmsError::ThriftTransport("reset".into()).is_not_found());
    }

    #[test]
    fn test_already_exists_classification() {
        let err = HmsError::PartitionAlreadyExists {
            database: "sales".into(),
            table: "orders".into(),
            values: vec!["2024-01-01".into()],
        };
        assert!(err.is_already_exists());
        assert!(!err.is_not_found());
        assert!(!HmsError::InvalidObject("bad".into()).is_already_exists());
    }

    #[test]
    fn test_resource_error_exposes_metastore_source() {
        let err = TapError::Resource(Box::new(TapError::metastore(
            "creating table",
            HmsError::ThriftTransport("connection refused".into()),
        )));
        assert_eq!(
            err.metastore_error(),
            Some(&HmsError::ThriftTransport("connection refused".into()))
        );
        assert!(TapError::TransactionalWrite.metastore_error().is_none());
    }

    #[test]
    fn test_validation_messages_name_the_field() {
        let err = ValidationError::ColumnType {
            expected: "int".into(),
            found: "string".into(),
        };
        assert_eq!(
            err.to_string(),
            "hive schema mismatch: expected column type 'int', but found 'string'"
        );
        let err = TapError::from(ValidationError::PartitionCount {
            expected: 1,
            found: 0,
        });
        assert!(err.to_string().contains("number of partition columns"));
    }
}
