// src/stage_explorer.rs
use std::collections::BTreeSet;

use anyhow::{bail, Context, Result};
use chrono::DateTime;
use tracing::{info, warn};

use crate::outcome::{BatchReport, FailurePolicy};
use crate::sql::{self, StagePath};
use crate::warehouse::{RowSet, Warehouse, NULL_SENTINEL};

/// One file inside a stage, as reported by `LIST`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageObject {
    /// Listed name; the first path segment is the (lower-cased) stage name.
    pub name: String,
    pub size: u64,
    pub md5: Option<String>,
    pub last_modified: Option<String>,
}

impl StageObject {
    fn from_row(rows: &RowSet, row: usize) -> Option<Self> {
        let text = |col: &str| {
            rows.cell(row, col)
                .filter(|v| *v != NULL_SENTINEL && !v.is_empty())
                .map(str::to_string)
        };
        let name = text("name").or_else(|| rows.rows.get(row)?.first().cloned())?;
        Some(Self {
            name,
            size: text("size").and_then(|s| s.trim().parse().ok()).unwrap_or(0),
            md5: text("md5"),
            last_modified: text("last_modified"),
        })
    }

    /// Path below the stage root, used to address the object.
    pub fn relative_path(&self) -> &str {
        match self.name.split_once('/') {
            Some((_, rest)) if !rest.is_empty() => rest,
            _ => &self.name,
        }
    }

    pub fn modified_display(&self) -> String {
        match &self.last_modified {
            Some(raw) => DateTime::parse_from_rfc2822(raw)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|_| raw.clone()),
            None => String::new(),
        }
    }

    pub fn size_display(&self) -> String {
        human_size(self.size)
    }
}

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub fn list_objects(wh: &dyn Warehouse, stage: &StagePath) -> Result<Vec<StageObject>> {
    let rows = wh
        .query(&sql::list_stage(stage))
        .with_context(|| format!("Cannot list {}", stage.display()))?;
    let objects: Vec<StageObject> = (0..rows.rows.len())
        .filter_map(|i| StageObject::from_row(&rows, i))
        .collect();
    info!(stage = %stage, count = objects.len(), "listed stage");
    Ok(objects)
}

/// Removes each named object with its own statement, in the given order.
/// Names are listed names (`stage/relative/path`). Each successful item
/// carries the names the warehouse reported as removed; a removal that
/// matched nothing is a failure.
pub fn delete_selected(
    wh: &dyn Warehouse,
    stage: &StagePath,
    names: &[String],
    policy: FailurePolicy,
) -> BatchReport<Vec<String>> {
    let report = BatchReport::run(names, policy, |name| {
        let listed = StageObject { name: name.clone(), size: 0, md5: None, last_modified: None };
        let relative = listed.relative_path();
        let rows = wh
            .query(&sql::remove_object(stage, relative))
            .with_context(|| format!("Cannot remove {}", name))?;
        let removed = rows.column("name");
        if removed.is_empty() {
            bail!("{} not found in {}", relative, stage.display());
        }
        info!(stage = %stage, object = %relative, "removed");
        Ok(removed)
    });
    for (name, msg) in report.failed() {
        warn!(stage = %stage, object = %name, error = %msg, "remove failed");
    }
    info!(stage = %stage, summary = %report.summary(), "delete batch finished");
    report
}

/// Grid state for one stage listing: rows, caret and checked rows.
#[derive(Debug, Clone, Default)]
pub struct ObjectGrid {
    objects: Vec<StageObject>,
    checked: BTreeSet<String>,
    pub cursor: usize,
    pub view_offset: usize,
}

impl ObjectGrid {
    pub fn objects(&self) -> &[StageObject] {
        &self.objects
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Replaces the rows; checks on objects that disappeared are dropped.
    pub fn set_objects(&mut self, objects: Vec<StageObject>) {
        let present: BTreeSet<&str> = objects.iter().map(|o| o.name.as_str()).collect();
        self.checked.retain(|n| present.contains(n.as_str()));
        self.objects = objects;
        self.cursor = self.cursor.min(self.objects.len().saturating_sub(1));
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_checked(&self, name: &str) -> bool {
        self.checked.contains(name)
    }

    pub fn toggle_at_cursor(&mut self) {
        if let Some(obj) = self.objects.get(self.cursor) {
            if !self.checked.remove(&obj.name) {
                self.checked.insert(obj.name.clone());
            }
        }
    }

    /// Header-checkbox behaviour: all rows, or none if all were checked.
    pub fn toggle_all(&mut self) {
        if self.checked.len() == self.objects.len() {
            self.checked.clear();
        } else {
            self.checked = self.objects.iter().map(|o| o.name.clone()).collect();
        }
    }

    pub fn check_only(&mut self, names: &[String]) {
        self.checked = names
            .iter()
            .filter(|n| self.objects.iter().any(|o| &o.name == *n))
            .cloned()
            .collect();
    }

    /// Checked names in listing order.
    /// Relative paths of the checked rows, in listing order.
    pub fn checked_paths(&self) -> Vec<&str> {
        self.objects
            .iter()
            .filter(|o| self.checked.contains(&o.name))
            .map(StageObject::relative_path)
            .collect()
    }

    pub fn checked_names(&self) -> Vec<String> {
        self.objects
            .iter()
            .filter(|o| self.checked.contains(&o.name))
            .map(|o| o.name.clone())
            .collect()
    }

    pub fn checked_count(&self) -> usize {
        self.checked.len()
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.objects.is_empty() {
            return;
        }
        let last = self.objects.len() as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, last) as usize;
    }

    pub fn ensure_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.cursor < self.view_offset {
            self.view_offset = self.cursor;
        } else if self.cursor >= self.view_offset + height {
            self.view_offset = self.cursor + 1 - height;
        }
    }

    pub fn current(&self) -> Option<&StageObject> {
        self.objects.get(self.cursor)
    }
}

/// The explorer tab: which stage is shown, its grid, and the last
/// deletion outcome.
#[derive(Debug, Default)]
pub struct StageExplorer {
    stage: Option<StagePath>,
    pub grid: ObjectGrid,
    pub last_report: Option<BatchReport<Vec<String>>>,
}

impl StageExplorer {
    pub fn stage(&self) -> Option<&StagePath> {
        self.stage.as_ref()
    }

    /// Shows `stage` (or nothing). Switching stages resets the grid.
    pub fn load(&mut self, wh: &dyn Warehouse, stage: Option<StagePath>) -> Result<()> {
        if stage != self.stage {
            self.grid.clear();
            self.last_report = None;
        }
        self.stage = stage;
        self.refresh(wh)
    }

    pub fn refresh(&mut self, wh: &dyn Warehouse) -> Result<()> {
        let Some(stage) = &self.stage else {
            self.grid.clear();
            return Ok(());
        };
        let objects = list_objects(wh, stage)?;
        self.grid.set_objects(objects);
        Ok(())
    }

    /// Deletes the checked objects, then re-lists the stage. The report is
    /// kept even when the refresh fails.
    pub fn delete_checked(
        &mut self,
        wh: &dyn Warehouse,
        policy: FailurePolicy,
    ) -> Result<&BatchReport<Vec<String>>> {
        let names = self.grid.checked_names();
        self.run_delete(wh, &names, policy)
    }

    /// Retries the failed and skipped items of the previous batch.
    pub fn retry_remaining(
        &mut self,
        wh: &dyn Warehouse,
        policy: FailurePolicy,
    ) -> Result<&BatchReport<Vec<String>>> {
        let names = self
            .last_report
            .as_ref()
            .map(BatchReport::remaining)
            .unwrap_or_default();
        self.run_delete(wh, &names, policy)
    }

    fn run_delete(
        &mut self,
        wh: &dyn Warehouse,
        names: &[String],
        policy: FailurePolicy,
    ) -> Result<&BatchReport<Vec<String>>> {
        let stage = self.stage.clone().context("No stage selected")?;
        let report = delete_selected(wh, &stage, names, policy);
        let remaining = report.remaining();
        self.last_report = Some(report);
        let refreshed = self.refresh(wh);
        self.grid.check_only(&remaining);
        refreshed?;
        self.last_report.as_ref().context("delete report missing")
    }
}
