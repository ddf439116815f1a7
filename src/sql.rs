// src/sql.rs
//! Every statement StageFrost sends to the warehouse is built here.
//!
//! Catalog names never reach SQL text raw: identifiers are emitted as quoted
//! identifiers (`"name"`, embedded quotes doubled), values that can be bound
//! are bound as parameters, and the rest (stage locations, `PUT` sources,
//! removal patterns) go through [`string_literal`].
use std::fmt;
use std::path::Path;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Matches identifiers that Snowflake would accept unquoted (and upper-case).
static PLAIN_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z_][A-Z0-9_$]*$").expect("static regex"));

/// Names the operator may type without quotes; these fold to upper case.
static TYPED_PLAIN_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("static regex"));

/// A catalog identifier (database, schema or stage name) exactly as the
/// warehouse reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(String);

impl Ident {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            bail!("identifier must not be empty");
        }
        if name.contains('\0') {
            bail!("identifier {name:?} contains a NUL character");
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `"name"` with embedded double quotes doubled.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }

    /// Form used for display only: bare when the name needs no quoting.
    pub fn display_form(&self) -> String {
        if PLAIN_IDENT.is_match(&self.0) {
            self.0.clone()
        } else {
            self.quoted()
        }
    }
}

/// Resolves a name typed by the operator the way the warehouse resolves it
/// in SQL text: `my_stage` is `MY_STAGE`, `"my_stage"` stays `my_stage`.
/// Anything else is kept verbatim and will be emitted quoted.
pub fn resolve_typed_name(input: &str) -> String {
    let name = input.trim();
    if TYPED_PLAIN_IDENT.is_match(name) {
        return name.to_uppercase();
    }
    match name.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => name.to_string(),
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully qualified internal stage, `db.schema.stage`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StagePath {
    pub database: Ident,
    pub schema: Ident,
    pub stage: Ident,
}

impl StagePath {
    pub fn new(database: &str, schema: &str, stage: &str) -> Result<Self> {
        Ok(Self {
            database: Ident::new(database)?,
            schema: Ident::new(schema)?,
            stage: Ident::new(stage)?,
        })
    }

    /// `"DB"."SCH"."STG"` for DDL.
    pub fn qualified(&self) -> String {
        format!(
            "{}.{}.{}",
            self.database.quoted(),
            self.schema.quoted(),
            self.stage.quoted()
        )
    }

    /// `@"DB"."SCH"."STG"`, the raw stage location (unescaped).
    pub fn location(&self) -> String {
        format!("@{}", self.qualified())
    }

    /// Location of a single object inside the stage.
    pub fn object_location(&self, relative: &str) -> String {
        format!("{}/{}", self.location(), relative.trim_start_matches('/'))
    }

    /// `@DB.SCH.STG` as shown to the operator.
    pub fn display(&self) -> String {
        format!(
            "@{}.{}.{}",
            self.database.display_form(),
            self.schema.display_form(),
            self.stage.display_form()
        )
    }
}

impl fmt::Display for StagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// A statement plus the values bound to its `?` markers, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sql {
    pub text: String,
    pub params: Vec<String>,
}

impl Sql {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), params: Vec::new() }
    }

    pub fn bind(mut self, value: impl Into<String>) -> Self {
        self.params.push(value.into());
        self
    }
}

impl fmt::Display for Sql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Single-quoted string literal; backslashes and quotes are escaped.
pub fn string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

fn bool_keyword(value: bool) -> &'static str {
    if value { "TRUE" } else { "FALSE" }
}

/*──────────────────────── statements ────────────────────────*/

pub fn session_introspection() -> Sql {
    Sql::new(
        "select current_account(), current_user(), current_role(), \
         current_version(), current_warehouse()",
    )
}

pub fn list_databases() -> Sql {
    Sql::new("select database_name from snowflake.information_schema.databases order by database_name")
}

pub fn list_schemas(database: &Ident) -> Sql {
    Sql::new(format!(
        "select schema_name from {}.information_schema.schemata order by schema_name",
        database.quoted()
    ))
}

pub fn list_stages(database: &Ident, schema: &Ident) -> Sql {
    Sql::new(format!(
        "select stage_name, stage_type from {}.information_schema.stages \
         where stage_schema = ? and stage_type = 'Internal Named' order by stage_name",
        database.quoted()
    ))
    .bind(schema.as_str())
}

pub fn list_stage(stage: &StagePath) -> Sql {
    Sql::new(format!("list {}", string_literal(&stage.location())))
}

/// Removes exactly one object. The path alone would act as a prefix, so the
/// pattern pins the match to names ending in the full relative path.
pub fn remove_object(stage: &StagePath, relative: &str) -> Sql {
    let relative = relative.trim_start_matches('/');
    let pattern = format!(".*{}", regex::escape(relative));
    Sql::new(format!(
        "remove {} pattern = {}",
        string_literal(&stage.object_location(relative)),
        string_literal(&pattern)
    ))
}

pub fn create_stage(stage: &StagePath) -> Sql {
    Sql::new(format!("create stage if not exists {}", stage.qualified()))
}

pub fn put_file(local: &Path, stage: &StagePath, compress: bool, overwrite: bool) -> Sql {
    let source = format!("file://{}", local.to_string_lossy());
    Sql::new(format!(
        "put {} {} auto_compress = {} overwrite = {}",
        string_literal(&source),
        string_literal(&format!("{}/", stage.location())),
        bool_keyword(compress),
        bool_keyword(overwrite)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stage() -> StagePath {
        StagePath::new("SALES", "PUBLIC", "LANDING").unwrap()
    }

    #[test]
    fn quoted_identifier_doubles_embedded_quotes() {
        let id = Ident::new(r#"we"ird"#).unwrap();
        assert_eq!(id.quoted(), r#""we""ird""#);
    }

    #[test]
    fn empty_identifier_is_rejected() {
        assert!(Ident::new("").is_err());
        assert!(Ident::new("a\0b").is_err());
    }

    #[test]
    fn display_form_only_quotes_when_needed() {
        assert_eq!(Ident::new("RAW_DATA").unwrap().display_form(), "RAW_DATA");
        assert_eq!(Ident::new("my db").unwrap().display_form(), "\"my db\"");
        assert_eq!(stage().display(), "@SALES.PUBLIC.LANDING");
    }

    #[test]
    fn typed_names_resolve_like_unquoted_identifiers() {
        assert_eq!(resolve_typed_name(" my_stage "), "MY_STAGE");
        assert_eq!(resolve_typed_name("Raw$2"), "RAW$2");
        assert_eq!(resolve_typed_name(r#""my_stage""#), "my_stage");
        assert_eq!(resolve_typed_name(r#""a""b""#), r#"a"b"#);
        assert_eq!(resolve_typed_name("my stage"), "my stage");
        assert_eq!(resolve_typed_name("2024_drop"), "2024_drop");
        assert_eq!(resolve_typed_name(r#""""#), "");
    }

    #[test]
    fn string_literal_escapes_quotes_and_backslashes() {
        assert_eq!(string_literal(r"a'b\c"), r"'a\'b\\c'");
    }

    #[test]
    fn schema_name_is_bound_not_interpolated() {
        let db = Ident::new("SALES").unwrap();
        let schema = Ident::new("x' or '1'='1").unwrap();
        let sql = list_stages(&db, &schema);
        assert!(!sql.text.contains("or '1'='1"));
        assert_eq!(sql.params, vec!["x' or '1'='1".to_string()]);
        assert!(sql.text.starts_with(r#"select stage_name, stage_type from "SALES".information_schema.stages"#));
    }

    #[test]
    fn hostile_database_name_stays_inside_its_identifier() {
        let db = Ident::new(r#"X".information_schema.schemata; drop database Y; --"#).unwrap();
        let sql = list_schemas(&db);
        assert_eq!(
            sql.text,
            r#"select schema_name from "X"".information_schema.schemata; drop database Y; --".information_schema.schemata order by schema_name"#
        );
    }

    #[test]
    fn remove_pins_the_exact_object() {
        let sql = remove_object(&stage(), "dir/file.csv.gz");
        assert_eq!(
            sql.text,
            r#"remove '@"SALES"."PUBLIC"."LANDING"/dir/file.csv.gz' pattern = '.*dir/file\\.csv\\.gz'"#
        );
    }

    #[test]
    fn put_carries_flags() {
        let sql = put_file(Path::new("/tmp/a.csv"), &stage(), true, false);
        assert_eq!(
            sql.text,
            r#"put 'file:///tmp/a.csv' '@"SALES"."PUBLIC"."LANDING"/' auto_compress = TRUE overwrite = FALSE"#
        );
    }

    #[test]
    fn create_stage_is_idempotent_ddl() {
        assert_eq!(
            create_stage(&stage()).text,
            r#"create stage if not exists "SALES"."PUBLIC"."LANDING""#
        );
    }
}
