// src/warehouse.rs
//! The two primitives StageFrost needs from a warehouse: run one statement
//! and get rows back, or push one local file into a stage.
use std::path::PathBuf;

use anyhow::{anyhow, Result};

use crate::sql::{Sql, StagePath};

/// Placeholder stored for SQL `NULL` cells.
pub const NULL_SENTINEL: &str = "NULL";

/// A fully materialised result set. Cell values arrive as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowSet {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive header lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    /// Every value of `name`, or of the first column when the driver reports
    /// different headers.
    pub fn column(&self, name: &str) -> Vec<String> {
        let idx = self.column_index(name).unwrap_or(0);
        self.rows
            .iter()
            .filter_map(|row| row.get(idx).cloned())
            .collect()
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let idx = self.column_index(name)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }
}

/// One file transfer into a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRequest {
    pub local: PathBuf,
    pub stage: StagePath,
    pub compress: bool,
    pub overwrite: bool,
}

impl PutRequest {
    pub fn file_name(&self) -> String {
        self.local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.local.to_string_lossy().into_owned())
    }

    pub fn to_sql(&self) -> Sql {
        crate::sql::put_file(&self.local, &self.stage, self.compress, self.overwrite)
    }
}

/// The row a `PUT` reports back, kept verbatim for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutResult {
    pub source: String,
    pub target: String,
    pub source_size: u64,
    pub target_size: u64,
    pub source_compression: String,
    pub target_compression: String,
    pub status: String,
    pub message: String,
}

impl PutResult {
    const COLUMNS: [&'static str; 8] = [
        "source",
        "target",
        "source_size",
        "target_size",
        "source_compression",
        "target_compression",
        "status",
        "message",
    ];

    /// Builds the result from the first row of a `PUT` response. Columns are
    /// looked up by name and fall back to their documented position.
    pub fn from_rows(rows: &RowSet) -> Result<Self> {
        let row = rows
            .rows
            .first()
            .ok_or_else(|| anyhow!("PUT returned no result row"))?;
        let field = |pos: usize| -> String {
            let idx = rows.column_index(Self::COLUMNS[pos]).unwrap_or(pos);
            row.get(idx)
                .filter(|v| v.as_str() != NULL_SENTINEL)
                .cloned()
                .unwrap_or_default()
        };
        let size = |pos: usize| -> u64 { field(pos).trim().parse().unwrap_or(0) };

        Ok(Self {
            source: field(0),
            target: field(1),
            source_size: size(2),
            target_size: size(3),
            source_compression: field(4),
            target_compression: field(5),
            status: field(6),
            message: field(7),
        })
    }

    pub fn is_uploaded(&self) -> bool {
        self.status.eq_ignore_ascii_case("UPLOADED")
    }

    pub fn is_skipped(&self) -> bool {
        self.status.eq_ignore_ascii_case("SKIPPED")
    }

    /// Multi-line rendering of every field, as shown under "PUT Result".
    pub fn describe(&self) -> Vec<String> {
        vec![
            format!("Source: {}", self.source),
            format!("Target: {}", self.target),
            format!("Source Size: {}", self.source_size),
            format!("Target Size: {}", self.target_size),
            format!("Source Compression: {}", self.source_compression),
            format!("Target Compression: {}", self.target_compression),
            format!("Status: {}", self.status),
            format!("Message: {}", self.message),
        ]
    }
}

/// Anything that can execute StageFrost's statements.
///
/// Implementations run one statement per call and block until it finishes.
pub trait Warehouse {
    fn query(&self, sql: &Sql) -> Result<RowSet>;

    fn put(&self, request: &PutRequest) -> Result<PutResult>;
}
