// src/testing.rs
//! In-memory warehouse used by the unit tests. It recognises exactly the
//! statements produced by `crate::sql` and keeps a small catalog of
//! databases, schemas, stages and staged files.
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

use anyhow::{anyhow, bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::profile::ConnectionProfile;
use crate::session::Connector;
use crate::sql::{self, Ident, Sql, StagePath};
use crate::warehouse::{PutRequest, PutResult, RowSet, Warehouse};

pub const LAST_MODIFIED: &str = "Tue, 5 Mar 2024 10:00:00 GMT";

static CREATE_STAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^create stage if not exists "((?:[^"]|"")*)"\."((?:[^"]|"")*)"\."((?:[^"]|"")*)"$"#)
        .unwrap()
});

#[derive(Debug, Default, Clone)]
struct FakeStage {
    internal: bool,
    objects: BTreeMap<String, u64>,
}

type Schemas = BTreeMap<String, BTreeMap<String, FakeStage>>;

#[derive(Default)]
pub struct FakeWarehouse {
    catalog: RefCell<BTreeMap<String, Schemas>>,
    statements: RefCell<Vec<Sql>>,
    identity: RefCell<Option<ConnectionProfile>>,
    failing_removes: RefCell<HashSet<String>>,
    failing_puts: RefCell<HashSet<String>>,
}

fn s(v: &[&str]) -> Vec<String> {
    v.iter().map(|x| x.to_string()).collect()
}

fn ident(name: &str) -> Ident {
    Ident::new(name).unwrap()
}

fn unquote(raw: &str) -> String {
    raw.replace("\"\"", "\"")
}

impl FakeWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_database(&self, db: &str) {
        self.catalog.borrow_mut().entry(db.into()).or_default();
    }

    pub fn add_schema(&self, db: &str, schema: &str) {
        self.catalog
            .borrow_mut()
            .entry(db.into())
            .or_default()
            .entry(schema.into())
            .or_default();
    }

    fn insert_stage(&self, db: &str, schema: &str, stage: &str, internal: bool) {
        self.catalog
            .borrow_mut()
            .entry(db.into())
            .or_default()
            .entry(schema.into())
            .or_default()
            .entry(stage.into())
            .or_insert_with(|| FakeStage { internal, objects: BTreeMap::new() });
    }

    pub fn add_stage(&self, db: &str, schema: &str, stage: &str) {
        self.insert_stage(db, schema, stage, true);
    }

    pub fn add_external_stage(&self, db: &str, schema: &str, stage: &str) {
        self.insert_stage(db, schema, stage, false);
    }

    pub fn add_object(&self, path: &StagePath, relative: &str, size: u64) {
        self.insert_stage(path.database.as_str(), path.schema.as_str(), path.stage.as_str(), true);
        self.with_stage(path, |st| {
            st.objects.insert(relative.into(), size);
        });
    }

    pub fn stage_exists(&self, path: &StagePath) -> bool {
        self.with_stage(path, |_| ()).is_some()
    }

    /// Relative names currently stored in the stage.
    pub fn objects(&self, path: &StagePath) -> Vec<String> {
        self.with_stage(path, |st| st.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn fail_remove_of(&self, relative: &str) {
        self.failing_removes.borrow_mut().insert(relative.into());
    }

    pub fn fail_put_of(&self, file_name: &str) {
        self.failing_puts.borrow_mut().insert(file_name.into());
    }

    pub fn statements(&self) -> Vec<Sql> {
        self.statements.borrow().clone()
    }

    pub fn set_identity(&self, profile: &ConnectionProfile) {
        *self.identity.borrow_mut() = Some(profile.clone());
    }

    fn with_stage<R>(&self, path: &StagePath, f: impl FnOnce(&mut FakeStage) -> R) -> Option<R> {
        let mut catalog = self.catalog.borrow_mut();
        let stage = catalog
            .get_mut(path.database.as_str())?
            .get_mut(path.schema.as_str())?
            .get_mut(path.stage.as_str())?;
        Some(f(stage))
    }

    fn all_stage_paths(&self) -> Vec<StagePath> {
        let catalog = self.catalog.borrow();
        let mut out = Vec::new();
        for (db, schemas) in catalog.iter() {
            for (schema, stages) in schemas {
                for stage in stages.keys() {
                    out.push(StagePath::new(db, schema, stage).unwrap());
                }
            }
        }
        out
    }

    fn answer(&self, stmt: &Sql) -> Result<RowSet> {
        if *stmt == sql::session_introspection() {
            let who = self.identity.borrow().clone().unwrap_or_default();
            return Ok(RowSet::new(
                s(&["CURRENT_ACCOUNT()", "CURRENT_USER()", "CURRENT_ROLE()", "CURRENT_VERSION()", "CURRENT_WAREHOUSE()"]),
                vec![vec![who.account.clone(), who.user.to_uppercase(), who.role, "8.0.0".into(), who.warehouse]],
            ));
        }
        if *stmt == sql::list_databases() {
            let names: Vec<Vec<String>> = self.catalog.borrow().keys().map(|k| vec![k.clone()]).collect();
            return Ok(RowSet::new(s(&["DATABASE_NAME"]), names));
        }

        let databases: Vec<String> = self.catalog.borrow().keys().cloned().collect();
        for db in &databases {
            if *stmt == sql::list_schemas(&ident(db)) {
                let catalog = self.catalog.borrow();
                let rows: Vec<Vec<String>> = catalog[db].keys().map(|k| vec![k.clone()]).collect();
                return Ok(RowSet::new(s(&["SCHEMA_NAME"]), rows));
            }
            // The text only depends on the database; the schema is bound.
            let shape = sql::list_stages(&ident(db), &ident("_"));
            if stmt.text == shape.text {
                let schema = stmt.params.first().ok_or_else(|| anyhow!("unbound parameter"))?;
                let catalog = self.catalog.borrow();
                let rows: Vec<Vec<String>> = catalog[db]
                    .get(schema)
                    .map(|stages| {
                        stages
                            .iter()
                            .filter(|(_, st)| st.internal)
                            .map(|(name, _)| vec![name.clone(), "Internal Named".to_string()])
                            .collect()
                    })
                    .unwrap_or_default();
                return Ok(RowSet::new(s(&["STAGE_NAME", "STAGE_TYPE"]), rows));
            }
        }

        for path in self.all_stage_paths() {
            if *stmt == sql::list_stage(&path) {
                let prefix = path.stage.as_str().to_lowercase();
                let rows: Vec<Vec<String>> = self
                    .with_stage(&path, |st| {
                        st.objects
                            .iter()
                            .map(|(rel, size)| {
                                vec![
                                    format!("{prefix}/{rel}"),
                                    size.to_string(),
                                    format!("md5-{rel}"),
                                    LAST_MODIFIED.to_string(),
                                ]
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                return Ok(RowSet::new(s(&["name", "size", "md5", "last_modified"]), rows));
            }
            for rel in self.objects(&path) {
                if *stmt == sql::remove_object(&path, &rel) {
                    if self.failing_removes.borrow().contains(&rel) {
                        bail!("Remote file '{rel}' could not be removed: access denied");
                    }
                    self.with_stage(&path, |st| st.objects.remove(&rel));
                    let name = format!("{}/{rel}", path.stage.as_str().to_lowercase());
                    return Ok(RowSet::new(s(&["name", "result"]), vec![vec![name, "removed".into()]]));
                }
            }
            // A removal that matches nothing answers with zero rows.
            let location = sql::string_literal(&path.location());
            if stmt.text.starts_with(&format!("remove {}/", location.trim_end_matches('\''))) {
                return Ok(RowSet::new(s(&["name", "result"]), Vec::new()));
            }
        }

        if let Some(caps) = CREATE_STAGE.captures(&stmt.text) {
            let (db, schema, stage) = (unquote(&caps[1]), unquote(&caps[2]), unquote(&caps[3]));
            let exists_schema = self
                .catalog
                .borrow()
                .get(&db)
                .map(|schemas| schemas.contains_key(&schema))
                .unwrap_or(false);
            if !exists_schema {
                bail!("Schema '{db}.{schema}' does not exist or not authorized.");
            }
            let path = StagePath::new(&db, &schema, &stage)?;
            let message = if self.stage_exists(&path) {
                format!("{stage} already exists, statement succeeded.")
            } else {
                self.add_stage(&db, &schema, &stage);
                format!("Stage area {stage} successfully created.")
            };
            return Ok(RowSet::new(s(&["status"]), vec![vec![message]]));
        }

        bail!("SQL compilation error: unrecognised statement: {}", stmt.text)
    }
}

impl Warehouse for FakeWarehouse {
    fn query(&self, stmt: &Sql) -> Result<RowSet> {
        self.statements.borrow_mut().push(stmt.clone());
        self.answer(stmt)
    }

    fn put(&self, request: &PutRequest) -> Result<PutResult> {
        self.statements.borrow_mut().push(request.to_sql());
        let file_name = request.file_name();
        if self.failing_puts.borrow().contains(&file_name) {
            bail!("Upload of {file_name} failed: connection reset");
        }
        if !self.stage_exists(&request.stage) {
            bail!("Stage '{}' does not exist or not authorized.", request.stage.display());
        }
        let size = std::fs::metadata(&request.local)?.len();
        let (target, target_size, compression) = if request.compress {
            (format!("{file_name}.gz"), size / 2 + 20, "GZIP")
        } else {
            (file_name.clone(), size, "NONE")
        };

        let exists = self
            .with_stage(&request.stage, |st| st.objects.contains_key(&target))
            .unwrap_or(false);
        let (status, message) = if exists && !request.overwrite {
            ("SKIPPED", "File already exists in the stage and OVERWRITE is FALSE.".to_string())
        } else {
            self.with_stage(&request.stage, |st| st.objects.insert(target.clone(), target_size));
            ("UPLOADED", String::new())
        };

        Ok(PutResult {
            source: file_name,
            target,
            source_size: size,
            target_size,
            source_compression: "NONE".into(),
            target_compression: compression.into(),
            status: status.into(),
            message,
        })
    }
}

/// Hands out fresh fake warehouses and counts how often it was asked to.
pub struct FakeConnector {
    factory: Box<dyn Fn() -> FakeWarehouse>,
    fail_first: Cell<usize>,
    opened: Cell<usize>,
}

impl FakeConnector {
    pub fn new(factory: impl Fn() -> FakeWarehouse + 'static) -> Self {
        Self::failing_first(0, factory)
    }

    pub fn failing_first(n: usize, factory: impl Fn() -> FakeWarehouse + 'static) -> Self {
        Self { factory: Box::new(factory), fail_first: Cell::new(n), opened: Cell::new(0) }
    }

    pub fn opened(&self) -> usize {
        self.opened.get()
    }
}

impl Connector for FakeConnector {
    fn open(&self, profile: &ConnectionProfile) -> Result<Box<dyn Warehouse>> {
        self.opened.set(self.opened.get() + 1);
        if self.fail_first.get() > 0 {
            self.fail_first.set(self.fail_first.get() - 1);
            bail!("Connection failed: authentication failed for user {}", profile.user);
        }
        let wh = (self.factory)();
        wh.set_identity(profile);
        Ok(Box::new(wh))
    }
}
