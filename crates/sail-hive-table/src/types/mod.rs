//! Hive Metastore object model and type conversions
//!
//! These structs mirror the subset of the HMS Thrift structures the tap reads
//! and writes. Type strings are parsed into Arrow types so a descriptor can be
//! checked before it reaches the metastore.

mod txn;

pub use txn::ValidTxnList;

use arrow_schema::{DataType, Field, TimeUnit};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{HmsError, HmsResult};

/// Table parameter recording whether a table is ACID
pub const TRANSACTIONAL_PARAMETER: &str = "transactional";

/// Table parameter marking external tables
pub const EXTERNAL_PARAMETER: &str = "EXTERNAL";

pub const TEXT_INPUT_FORMAT: &str = "org.apache.hadoop.mapred.TextInputFormat";
pub const TEXT_OUTPUT_FORMAT: &str = "org.apache.hadoop.hive.ql.io.HiveIgnoreKeyTextOutputFormat";
pub const LAZY_SIMPLE_SERDE: &str = "org.apache.hadoop.hive.serde2.lazy.LazySimpleSerDe";

/// Kind of table as stored by the metastore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableType {
    Managed,
    External,
}

impl TableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableType::Managed => "MANAGED_TABLE",
            TableType::External => "EXTERNAL_TABLE",
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column as stored by the metastore
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: String,
    pub comment: Option<String>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            comment: None,
        }
    }
}

/// Serialization library and its parameters
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerDeInfo {
    pub name: Option<String>,
    pub serialization_lib: String,
    pub parameters: HashMap<String, String>,
}

/// Physical layout of a table or partition
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageDescriptor {
    pub cols: Vec<FieldSchema>,
    pub location: String,
    pub input_format: String,
    pub output_format: String,
    pub compressed: bool,
    pub num_buckets: i32,
    pub serde_info: SerDeInfo,
    pub bucket_cols: Vec<String>,
    pub parameters: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    pub description: Option<String>,
    pub location_uri: String,
    pub parameters: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Table {
    pub db_name: String,
    pub table_name: String,
    pub owner: Option<String>,
    /// Seconds since the epoch
    pub create_time: i32,
    /// Seconds since the epoch
    pub last_access_time: i32,
    pub sd: StorageDescriptor,
    pub partition_keys: Vec<FieldSchema>,
    pub parameters: HashMap<String, String>,
    /// `MANAGED_TABLE`, `EXTERNAL_TABLE`, `VIRTUAL_VIEW`, ...
    pub table_type: String,
}

impl Table {
    /// ACID flag from the reserved table parameter; absent or unparsable means false
    pub fn is_transactional(&self) -> bool {
        parse_bool(self.parameters.get(TRANSACTIONAL_PARAMETER).map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Partition {
    pub db_name: String,
    pub table_name: String,
    pub values: Vec<String>,
    /// Seconds since the epoch
    pub create_time: i32,
    pub sd: StorageDescriptor,
    pub parameters: HashMap<String, String>,
}

/// Boolean parsing with Java's `Boolean.parseBoolean` leniency
pub fn parse_bool(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

/// Convert HMS type string to Arrow DataType
pub fn parse_hms_type(type_str: &str) -> HmsResult<DataType> {
    let type_str = type_str.trim().to_lowercase();

    match type_str.as_str() {
        "boolean" => Ok(DataType::Boolean),
        "tinyint" => Ok(DataType::Int8),
        "smallint" => Ok(DataType::Int16),
        "int" | "integer" => Ok(DataType::Int32),
        "bigint" => Ok(DataType::Int64),
        "float" => Ok(DataType::Float32),
        "double" | "double precision" => Ok(DataType::Float64),
        "string" => Ok(DataType::Utf8),
        "binary" => Ok(DataType::Binary),
        "timestamp" => Ok(DataType::Timestamp(TimeUnit::Microsecond, None)),
        "date" => Ok(DataType::Date32),
        "decimal" => Ok(DataType::Decimal128(10, 0)),

        s if s.starts_with("decimal") => parse_decimal_type(s),
        s if s.starts_with("varchar") || s.starts_with("char") => parse_char_type(s),
        s if s.starts_with("array") => parse_array_type(s),
        s if s.starts_with("map") => parse_map_type(s),
        s if s.starts_with("struct") => parse_struct_type(s),

        other => Err(HmsError::TypeConversion(format!(
            "unsupported Hive type: {}",
            other
        ))),
    }
}

/// Body between the outer brackets of `name<...>` or `name(...)`
fn type_arguments<'a>(type_str: &'a str, name: &str, open: char, close: char) -> HmsResult<&'a str> {
    type_str
        .strip_prefix(name)
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix(open))
        .and_then(|rest| rest.strip_suffix(close))
        .map(str::trim)
        .filter(|body| !body.is_empty())
        .ok_or_else(|| HmsError::TypeConversion(format!("Invalid {} type: {}", name, type_str)))
}

/// Split on commas that are not nested inside `<>` or `()`
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (index, c) in body.char_indices() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(body[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(body[start..].trim());
    parts
}

/// Parse decimal type (e.g., "decimal(10,2)")
fn parse_decimal_type(type_str: &str) -> HmsResult<DataType> {
    let body = type_arguments(type_str, "decimal", '(', ')')?;
    let args = split_top_level(body);
    let invalid = || HmsError::TypeConversion(format!("Invalid decimal type: {}", type_str));

    let precision: u8 = args
        .first()
        .and_then(|p| p.parse().ok())
        .filter(|p| (1..=38).contains(p))
        .ok_or_else(invalid)?;
    let scale: i8 = match args.get(1) {
        Some(s) => s.parse().map_err(|_| invalid())?,
        None => 0,
    };
    if args.len() > 2 || scale < 0 || scale as u8 > precision {
        return Err(invalid());
    }

    Ok(DataType::Decimal128(precision, scale))
}

/// Parse char/varchar type (e.g., "varchar(100)")
fn parse_char_type(type_str: &str) -> HmsResult<DataType> {
    let name = if type_str.starts_with("varchar") {
        "varchar"
    } else {
        "char"
    };
    let length = type_arguments(type_str, name, '(', ')')?;
    length.parse::<u32>().map_err(|_| {
        HmsError::TypeConversion(format!("Invalid {} length: {}", name, type_str))
    })?;

    // Both char and varchar map to Utf8 in Arrow
    Ok(DataType::Utf8)
}

/// Parse array type (e.g., "array<int>")
fn parse_array_type(type_str: &str) -> HmsResult<DataType> {
    let element = type_arguments(type_str, "array", '<', '>')?;
    let element_type = parse_hms_type(element)?;

    Ok(DataType::List(Arc::new(Field::new("item", element_type, true))))
}

/// Parse map type (e.g., "map<string,int>")
fn parse_map_type(type_str: &str) -> HmsResult<DataType> {
    let body = type_arguments(type_str, "map", '<', '>')?;
    let [key, value] = split_top_level(body)[..] else {
        return Err(HmsError::TypeConversion(format!("Invalid map type: {}", type_str)));
    };

    let entries = DataType::Struct(
        vec![
            Field::new("key", parse_hms_type(key)?, false),
            Field::new("value", parse_hms_type(value)?, true),
        ]
        .into(),
    );

    Ok(DataType::Map(Arc::new(Field::new("entries", entries, false)), false))
}

/// Parse struct type (e.g., "struct<name:string,age:int>")
fn parse_struct_type(type_str: &str) -> HmsResult<DataType> {
    let body = type_arguments(type_str, "struct", '<', '>')?;

    let fields = split_top_level(body)
        .into_iter()
        .map(|field_str| {
            let (name, field_type) = field_str.split_once(':').ok_or_else(|| {
                HmsError::TypeConversion(format!("Invalid struct field: {}", field_str))
            })?;
            Ok(Field::new(name.trim(), parse_hms_type(field_type)?, true))
        })
        .collect::<HmsResult<Vec<_>>>()?;

    Ok(DataType::Struct(fields.into()))
}

/// Escape partition value for a partition path
pub fn escape_partition_value(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Unescape partition value from a partition path
pub fn unescape_partition_value(value: &str) -> HmsResult<String> {
    urlencoding::decode(value)
        .map(|s| s.into_owned())
        .map_err(|e| HmsError::TypeConversion(format!("Invalid partition value: {}", e)))
}

/// Parse partition spec string (e.g., "year=2023/month=01") into ordered pairs
pub fn parse_partition_spec(spec: &str) -> HmsResult<Vec<(String, String)>> {
    spec.trim_matches('/')
        .split('/')
        .map(|part| {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                HmsError::TypeConversion(format!("Missing partition value in '{}'", part))
            })?;
            if key.is_empty() {
                return Err(HmsError::TypeConversion(format!(
                    "Missing partition key in '{}'",
                    part
                )));
            }

            Ok((unescape_partition_value(key)?, unescape_partition_value(value)?))
        })
        .collect()
}
