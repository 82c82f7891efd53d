//! Snapshot of valid transactions handed to ACID readers

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::HmsError;

/// Transactions visible to a reader of an ACID table
///
/// Serialized as `<high watermark>:<min open>:<open ids>:<aborted ids>`, with
/// ids comma separated and `i64::MAX` standing for "no open transaction".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidTxnList {
    high_watermark: i64,
    open: BTreeSet<i64>,
    aborted: BTreeSet<i64>,
}

impl ValidTxnList {
    pub fn new(
        high_watermark: i64,
        open: impl IntoIterator<Item = i64>,
        aborted: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            high_watermark,
            open: open.into_iter().filter(|id| *id <= high_watermark).collect(),
            aborted: aborted
                .into_iter()
                .filter(|id| *id <= high_watermark)
                .collect(),
        }
    }

    pub fn high_watermark(&self) -> i64 {
        self.high_watermark
    }

    pub fn min_open_txn(&self) -> Option<i64> {
        self.open.first().copied()
    }

    pub fn open_txns(&self) -> impl Iterator<Item = i64> + '_ {
        self.open.iter().copied()
    }

    pub fn aborted_txns(&self) -> impl Iterator<Item = i64> + '_ {
        self.aborted.iter().copied()
    }

    /// Whether the writes of `txn_id` are committed as of this snapshot
    pub fn is_txn_valid(&self, txn_id: i64) -> bool {
        txn_id <= self.high_watermark
            && !self.open.contains(&txn_id)
            && !self.aborted.contains(&txn_id)
    }
}

fn join(ids: &BTreeSet<i64>) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl fmt::Display for ValidTxnList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.high_watermark,
            self.min_open_txn().unwrap_or(i64::MAX),
            join(&self.open),
            join(&self.aborted)
        )
    }
}

impl FromStr for ValidTxnList {
    type Err = HmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HmsError::Meta(format!("invalid valid transaction list: '{}'", s));
        let parse_ids = |field: Option<&str>| -> Result<Vec<i64>, HmsError> {
            field
                .unwrap_or_default()
                .split(',')
                .filter(|id| !id.is_empty())
                .map(|id| id.parse::<i64>().map_err(|_| invalid()))
                .collect()
        };

        let mut fields = s.trim().split(':');
        let high_watermark = fields
            .next()
            .and_then(|hwm| hwm.parse::<i64>().ok())
            .ok_or_else(invalid)?;
        // the min open id is derived from the open set
        fields
            .next()
            .map(|min| min.parse::<i64>().map_err(|_| invalid()))
            .transpose()?;
        let open = parse_ids(fields.next())?;
        let aborted = parse_ids(fields.next())?;
        if fields.next().is_some() {
            return Err(invalid());
        }

        Ok(Self::new(high_watermark, open, aborted))
    }
}
