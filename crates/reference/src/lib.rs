//! Static reference table of valid budget allocations.
//!
//! Loaded once at startup from a CSV export of the allocation spreadsheet and
//! never mutated afterwards. Every lookup recomputes from the in-memory rows.

use std::{
    cmp::Ordering,
    collections::BTreeSet,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, StringRecord, Trim};
use shared::domain::AllocationRow;
use thiserror::Error;
use tracing::{debug, info};

pub const ORGANIZATION_COLUMN: &str = "ORGANIZATION";
pub const ALLOCATION_COLUMN: &str = "ALLOCATION";
pub const SEQUENCE_COLUMN: &str = "SEQUENCE";

const ORGANIZATION_ALIAS: &str = "ÓRGÃO";
const ALLOCATION_ALIAS: &str = "DOTAÇÃO";
const SEQUENCE_ALIAS: &str = "SEQUENCIAL";

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to read reference file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed reference table: {0}")]
    Csv(#[from] csv::Error),
    #[error("reference table is missing column {expected} (accepted alias: {alias})")]
    MissingColumn {
        expected: &'static str,
        alias: &'static str,
    },
    #[error("reference table line {line}: column {column} is empty")]
    IncompleteRow { line: u64, column: &'static str },
    #[error("reference table has no rows")]
    Empty,
}

#[derive(Debug, Clone)]
pub struct ReferenceTable {
    rows: Vec<AllocationRow>,
}

struct ColumnIndexes {
    organization: usize,
    allocation: usize,
    sequence: usize,
}

impl ColumnIndexes {
    fn locate(headers: &StringRecord) -> Result<Self, ReferenceError> {
        Ok(Self {
            organization: find_column(headers, ORGANIZATION_COLUMN, ORGANIZATION_ALIAS)?,
            allocation: find_column(headers, ALLOCATION_COLUMN, ALLOCATION_ALIAS)?,
            sequence: find_column(headers, SEQUENCE_COLUMN, SEQUENCE_ALIAS)?,
        })
    }
}

impl ReferenceTable {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ReferenceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ReferenceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            rows = table.len(),
            organizations = table.organizations().len(),
            "reference table loaded"
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReferenceError> {
        let mut csv = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);
        let columns = ColumnIndexes::locate(csv.headers()?)?;

        let mut rows = Vec::new();
        for record in csv.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let organization = record.get(columns.organization).unwrap_or_default();
            let allocation = record.get(columns.allocation).unwrap_or_default();
            let sequence = record.get(columns.sequence).unwrap_or_default();

            if organization.is_empty() && allocation.is_empty() && sequence.is_empty() {
                debug!(line, "skipping blank reference row");
                continue;
            }
            for (value, column) in [
                (organization, ORGANIZATION_COLUMN),
                (allocation, ALLOCATION_COLUMN),
                (sequence, SEQUENCE_COLUMN),
            ] {
                if value.is_empty() {
                    return Err(ReferenceError::IncompleteRow { line, column });
                }
            }

            rows.push(AllocationRow::new(
                organization,
                allocation,
                normalize_sequence(sequence),
            ));
        }

        Self::from_rows(rows)
    }

    pub fn from_rows(rows: Vec<AllocationRow>) -> Result<Self, ReferenceError> {
        if rows.is_empty() {
            return Err(ReferenceError::Empty);
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[AllocationRow] {
        &self.rows
    }

    /// Distinct organizations, sorted.
    pub fn organizations(&self) -> Vec<String> {
        distinct_sorted(self.rows.iter().map(|row| row.organization.as_str()))
    }

    pub fn has_organization(&self, organization: &str) -> bool {
        self.rows.iter().any(|row| row.organization == organization)
    }

    /// Distinct allocation codes of `organization`, sorted. Unknown organizations yield nothing.
    pub fn allocations(&self, organization: &str) -> Vec<String> {
        distinct_sorted(
            self.rows
                .iter()
                .filter(|row| row.organization == organization)
                .map(|row| row.allocation_code.as_str()),
        )
    }

    /// Distinct sequence numbers of the (organization, allocation) pair, numeric ones first.
    pub fn sequences(&self, organization: &str, allocation_code: &str) -> Vec<String> {
        let mut sequences = distinct_sorted(
            self.rows
                .iter()
                .filter(|row| {
                    row.organization == organization && row.allocation_code == allocation_code
                })
                .map(|row| row.sequence_number.as_str()),
        );
        sequences.sort_by(|a, b| sequence_order(a, b));
        sequences
    }

    pub fn contains(&self, organization: &str, allocation_code: &str, sequence_number: &str) -> bool {
        let sequence_number = normalize_sequence(sequence_number);
        self.rows.iter().any(|row| {
            row.organization == organization
                && row.allocation_code == allocation_code
                && row.sequence_number == sequence_number
        })
    }

    pub fn find(
        &self,
        organization: &str,
        allocation_code: &str,
        sequence_number: &str,
    ) -> Option<&AllocationRow> {
        let sequence_number = normalize_sequence(sequence_number);
        self.rows.iter().find(|row| {
            row.organization == organization
                && row.allocation_code == allocation_code
                && row.sequence_number == sequence_number
        })
    }
}

/// Orders sequence numbers by numeric value when both parse, numeric before textual otherwise.
pub fn sequence_order(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Spreadsheet exports write integer cells as `12.0`; keep the integer text.
pub fn normalize_sequence(raw: &str) -> String {
    let raw = raw.trim();
    if let Some((integer, fraction)) = raw.split_once('.') {
        if !fraction.is_empty()
            && fraction.bytes().all(|b| b == b'0')
            && integer.parse::<i64>().is_ok()
        {
            return integer.to_string();
        }
    }
    raw.to_string()
}

fn find_column(
    headers: &StringRecord,
    expected: &'static str,
    alias: &'static str,
) -> Result<usize, ReferenceError> {
    headers
        .iter()
        .position(|header| {
            let header = header.trim_start_matches('\u{feff}').trim();
            header == expected || header == alias
        })
        .ok_or(ReferenceError::MissingColumn { expected, alias })
}

fn distinct_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
