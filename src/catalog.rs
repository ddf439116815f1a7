// src/catalog.rs
use anyhow::{Context, Result};
use tracing::debug;

use crate::sql::{self, Ident, StagePath};
use crate::warehouse::Warehouse;

pub fn list_databases(wh: &dyn Warehouse) -> Result<Vec<String>> {
    let rows = wh.query(&sql::list_databases()).context("Cannot list databases")?;
    let names = rows.column("database_name");
    debug!(count = names.len(), "listed databases");
    Ok(names)
}

pub fn list_schemas(wh: &dyn Warehouse, database: &str) -> Result<Vec<String>> {
    let db = Ident::new(database)?;
    let rows = wh
        .query(&sql::list_schemas(&db))
        .with_context(|| format!("Cannot list schemas of {}", db.display_form()))?;
    let names = rows.column("schema_name");
    debug!(database, count = names.len(), "listed schemas");
    Ok(names)
}

/// Internal named stages only; external and table stages are filtered out
/// by the query itself.
pub fn list_stages(wh: &dyn Warehouse, database: &str, schema: &str) -> Result<Vec<String>> {
    let db = Ident::new(database)?;
    let sch = Ident::new(schema)?;
    let rows = wh.query(&sql::list_stages(&db, &sch)).with_context(|| {
        format!("Cannot list stages of {}.{}", db.display_form(), sch.display_form())
    })?;
    let names = rows.column("stage_name");
    debug!(database, schema, count = names.len(), "listed stages");
    Ok(names)
}

/// A single-choice list. A freshly filled picker selects its first option.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Picker {
    options: Vec<String>,
    selected: Option<usize>,
}

impl Picker {
    pub fn set_options(&mut self, options: Vec<String>) {
        self.selected = if options.is_empty() { None } else { Some(0) };
        self.options = options;
    }

    pub fn clear(&mut self) {
        self.options.clear();
        self.selected = None;
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.and_then(|i| self.options.get(i)).map(String::as_str)
    }

    /// Returns `false` when `idx` is out of range or already selected.
    pub fn select(&mut self, idx: usize) -> bool {
        if idx >= self.options.len() || self.selected == Some(idx) {
            return false;
        }
        self.selected = Some(idx);
        true
    }

    pub fn select_name(&mut self, name: &str) -> bool {
        match self.options.iter().position(|o| o == name) {
            Some(idx) => self.select(idx),
            None => false,
        }
    }

    /// Moves the selection by `delta`, clamped to the list.
    pub fn step(&mut self, delta: isize) -> bool {
        let Some(cur) = self.selected else { return false };
        let last = self.options.len().saturating_sub(1) as isize;
        let next = (cur as isize + delta).clamp(0, last) as usize;
        self.select(next)
    }
}

/// Cascading database → schema → stage choice. Changing a level clears and
/// reloads every level below it.
#[derive(Debug, Clone, Default)]
pub struct CatalogSelection {
    pub databases: Picker,
    pub schemas: Picker,
    pub stages: Picker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogLevel {
    Database,
    Schema,
    Stage,
}

impl CatalogSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.databases.clear();
        self.schemas.clear();
        self.stages.clear();
    }

    /// Reloads everything from the database list down.
    pub fn refresh(&mut self, wh: &dyn Warehouse) -> Result<()> {
        let previous = self.database().map(str::to_string);
        self.clear();
        self.databases.set_options(list_databases(wh)?);
        if let Some(prev) = previous {
            self.databases.select_name(&prev);
        }
        self.reload_schemas(wh)
    }

    pub fn select(&mut self, wh: &dyn Warehouse, level: CatalogLevel, idx: usize) -> Result<()> {
        match level {
            CatalogLevel::Database => {
                if self.databases.select(idx) {
                    self.reload_schemas(wh)?;
                }
            }
            CatalogLevel::Schema => {
                if self.schemas.select(idx) {
                    self.reload_stages(wh)?;
                }
            }
            CatalogLevel::Stage => {
                self.stages.select(idx);
            }
        }
        Ok(())
    }

    /// Arrow-key variant of [`select`](Self::select).
    pub fn step(&mut self, wh: &dyn Warehouse, level: CatalogLevel, delta: isize) -> Result<()> {
        let picker = self.picker(level);
        let Some(cur) = picker.selected_index() else { return Ok(()) };
        let last = picker.options().len().saturating_sub(1) as isize;
        let next = (cur as isize + delta).clamp(0, last) as usize;
        self.select(wh, level, next)
    }

    pub fn picker(&self, level: CatalogLevel) -> &Picker {
        match level {
            CatalogLevel::Database => &self.databases,
            CatalogLevel::Schema => &self.schemas,
            CatalogLevel::Stage => &self.stages,
        }
    }

    /// Re-runs the stage listing for the current schema, e.g. after a stage
    /// was created. Keeps the chosen stage when it still exists.
    pub fn reload_stages(&mut self, wh: &dyn Warehouse) -> Result<()> {
        let previous = self.stage().map(str::to_string);
        self.stages.clear();
        let (Some(db), Some(schema)) = (self.database(), self.schema()) else { return Ok(()) };
        let stages = list_stages(wh, db, schema)?;
        self.stages.set_options(stages);
        if let Some(prev) = previous {
            self.stages.select_name(&prev);
        }
        Ok(())
    }

    fn reload_schemas(&mut self, wh: &dyn Warehouse) -> Result<()> {
        self.schemas.clear();
        self.stages.clear();
        let Some(db) = self.database() else { return Ok(()) };
        let schemas = list_schemas(wh, db)?;
        self.schemas.set_options(schemas);
        self.reload_stages(wh)
    }

    pub fn database(&self) -> Option<&str> {
        self.databases.selected()
    }

    pub fn schema(&self) -> Option<&str> {
        self.schemas.selected()
    }

    pub fn stage(&self) -> Option<&str> {
        self.stages.selected()
    }

    /// `DB.SCHEMA` when both are chosen.
    pub fn scope_label(&self) -> Option<String> {
        Some(format!("{}.{}", self.database()?, self.schema()?))
    }

    pub fn stage_path(&self) -> Option<StagePath> {
        StagePath::new(self.database()?, self.schema()?, self.stage()?).ok()
    }
}
