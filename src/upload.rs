// src/upload.rs
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::outcome::{BatchReport, FailurePolicy};
use crate::sql::{self, StagePath};
use crate::warehouse::{PutRequest, PutResult, Warehouse};

/// Where the files go: nothing chosen yet, a listed stage, or a stage that
/// will be created on upload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadTarget {
    #[default]
    Unchosen,
    Existing(String),
    New(String),
}

impl UploadTarget {
    /// Existing stage from the picker; `None` means the schema has no stages.
    pub fn existing(choice: Option<&str>) -> Self {
        match choice {
            Some(name) => UploadTarget::Existing(name.to_string()),
            None => UploadTarget::Unchosen,
        }
    }

    /// Free-text stage name, resolved like an identifier in SQL text.
    /// Blank input (or `""`) leaves the target unchosen.
    pub fn new_stage(input: &str) -> Self {
        let name = sql::resolve_typed_name(input);
        if name.is_empty() {
            UploadTarget::Unchosen
        } else {
            UploadTarget::New(name)
        }
    }

    pub fn is_chosen(&self) -> bool {
        !matches!(self, UploadTarget::Unchosen)
    }

    pub fn stage_name(&self) -> Option<&str> {
        match self {
            UploadTarget::Unchosen => None,
            UploadTarget::Existing(n) | UploadTarget::New(n) => Some(n),
        }
    }

    pub fn creates_stage(&self) -> bool {
        matches!(self, UploadTarget::New(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadFlags {
    pub compress: bool,
    pub overwrite: bool,
}

impl Default for UploadFlags {
    fn default() -> Self {
        Self { compress: true, overwrite: true }
    }
}

/// A resolved, ready-to-run upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub files: Vec<PathBuf>,
    pub stage: StagePath,
    pub create_stage: bool,
    pub flags: UploadFlags,
}

impl UploadRequest {
    pub fn new(
        database: &str,
        schema: &str,
        target: &UploadTarget,
        files: Vec<PathBuf>,
        flags: UploadFlags,
    ) -> Result<Self> {
        let Some(stage_name) = target.stage_name() else {
            bail!("Choose an existing stage or name a new one first");
        };
        if files.is_empty() {
            bail!("Choose at least one file to upload");
        }
        Ok(Self {
            files,
            stage: StagePath::new(database, schema, stage_name)?,
            create_stage: target.creates_stage(),
            flags,
        })
    }

    fn put_for(&self, local: &Path) -> PutRequest {
        PutRequest {
            local: local.to_path_buf(),
            stage: self.stage.clone(),
            compress: self.flags.compress,
            overwrite: self.flags.overwrite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub stage: StagePath,
    /// Status line of `create stage if not exists`, when it ran.
    pub stage_status: Option<String>,
    pub files: BatchReport<PutResult>,
}

/// Creates the stage when asked, then transfers each file in order.
///
/// A failed stage creation aborts before any transfer. Per-file failures
/// are recorded according to `policy`.
pub fn execute(wh: &dyn Warehouse, request: &UploadRequest, policy: FailurePolicy) -> Result<UploadReport> {
    let stage_status = if request.create_stage {
        let rows = wh
            .query(&sql::create_stage(&request.stage))
            .with_context(|| format!("Cannot create stage {}", request.stage.display()))?;
        let status = rows.rows.first().and_then(|r| r.first()).cloned().unwrap_or_default();
        info!(stage = %request.stage, status = %status, "create stage if not exists");
        Some(status)
    } else {
        None
    };

    let sources: Vec<LocalFile> = request.files.iter().map(|p| LocalFile::new(p)).collect();
    let files = BatchReport::run(&sources, policy, |source| {
        let local = source.path;
        check_local_file(local)?;
        let put = wh
            .put(&request.put_for(local))
            .with_context(|| format!("Upload of {} failed", local.display()))?;
        info!(
            stage = %request.stage,
            source = %put.source,
            target = %put.target,
            status = %put.status,
            compressed = %put.target_compression,
            "put finished"
        );
        Ok(put)
    });
    for (file, msg) in files.failed() {
        warn!(stage = %request.stage, file = %file, error = %msg, "put failed");
    }
    info!(stage = %request.stage, summary = %files.summary(), "upload batch finished");

    Ok(UploadReport { stage: request.stage.clone(), stage_status, files })
}

/// A queued file: the path as given plus the lossy text it is reported under.
struct LocalFile<'a> {
    path: &'a Path,
    key: String,
}

impl<'a> LocalFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, key: path.to_string_lossy().into_owned() }
    }
}

impl AsRef<str> for LocalFile<'_> {
    fn as_ref(&self) -> &str {
        &self.key
    }
}

fn check_local_file(path: &Path) -> Result<()> {
    let meta = std::fs::metadata(path).with_context(|| format!("Cannot read {}", path.display()))?;
    if !meta.is_file() {
        bail!("{} is not a regular file", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ItemOutcome;
    use crate::stage_explorer::list_objects;
    use crate::testing::FakeWarehouse;
    use pretty_assertions::assert_eq;

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn warehouse() -> FakeWarehouse {
        let wh = FakeWarehouse::new();
        wh.add_stage("ANALYTICS", "PUBLIC", "LANDING");
        wh
    }

    fn request(target: UploadTarget, files: Vec<PathBuf>, flags: UploadFlags) -> UploadRequest {
        UploadRequest::new("ANALYTICS", "PUBLIC", &target, files, flags).unwrap()
    }

    #[test]
    fn blank_new_stage_name_is_unchosen() {
        assert_eq!(UploadTarget::new_stage("   "), UploadTarget::Unchosen);
        assert_eq!(UploadTarget::new_stage(" NEW "), UploadTarget::New("NEW".into()));
        assert_eq!(UploadTarget::new_stage(r#""""#), UploadTarget::Unchosen);
        assert_eq!(UploadTarget::existing(None), UploadTarget::Unchosen);
        assert!(!UploadTarget::default().is_chosen());
    }

    #[test]
    fn flags_default_on() {
        assert_eq!(UploadFlags::default(), UploadFlags { compress: true, overwrite: true });
    }

    #[test]
    fn request_needs_target_and_files() {
        let err = UploadRequest::new("A", "B", &UploadTarget::Unchosen, vec!["x".into()], UploadFlags::default());
        assert!(err.is_err());
        let err = UploadRequest::new("A", "B", &UploadTarget::Existing("S".into()), vec![], UploadFlags::default());
        assert!(err.is_err());
    }

    #[test]
    fn new_stage_is_created_then_file_is_listed_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "orders.csv", "id,qty\n1,2\n");
        let wh = warehouse();

        let req = request(UploadTarget::New("INBOX".into()), vec![file], UploadFlags::default());
        let report = execute(&wh, &req, FailurePolicy::default()).unwrap();

        assert_eq!(report.stage_status.as_deref(), Some("Stage area INBOX successfully created."));
        assert!(report.files.all_succeeded());
        let listed = list_objects(&wh, &req.stage).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].relative_path(), "orders.csv.gz");

        let put: Vec<_> = report.files.succeeded().map(|(_, p)| p.clone()).collect();
        assert_eq!(put[0].target_compression, "GZIP");
    }

    #[test]
    fn creating_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "a.csv", "x");
        let wh = warehouse();
        let req = request(UploadTarget::New("INBOX".into()), vec![file], UploadFlags::default());

        execute(&wh, &req, FailurePolicy::default()).unwrap();
        let second = execute(&wh, &req, FailurePolicy::default()).unwrap();
        assert_eq!(second.stage_status.as_deref(), Some("INBOX already exists, statement succeeded."));
        assert_eq!(wh.objects(&req.stage), vec!["a.csv.gz"]);
    }

    #[test]
    fn typed_lowercase_name_reuses_the_existing_stage() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "a.csv", "x");
        let wh = warehouse();
        wh.add_stage("ANALYTICS", "PUBLIC", "MY_STAGE");

        let req = request(UploadTarget::new_stage("my_stage"), vec![file], UploadFlags::default());
        let report = execute(&wh, &req, FailurePolicy::default()).unwrap();

        let ddl = wh.statements().into_iter().find(|s| s.text.starts_with("create stage")).unwrap();
        assert_eq!(ddl.text, r#"create stage if not exists "ANALYTICS"."PUBLIC"."MY_STAGE""#);
        assert_eq!(report.stage_status.as_deref(), Some("MY_STAGE already exists, statement succeeded."));
        let stages = crate::catalog::list_stages(&wh, "ANALYTICS", "PUBLIC").unwrap();
        assert_eq!(stages, vec!["LANDING", "MY_STAGE"]);
    }

    #[test]
    fn quoted_name_keeps_its_case() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "a.csv", "x");
        let wh = warehouse();
        let req = request(UploadTarget::new_stage(r#""my_stage""#), vec![file], UploadFlags::default());
        execute(&wh, &req, FailurePolicy::default()).unwrap();
        assert_eq!(req.stage.stage.as_str(), "my_stage");
        assert!(wh.stage_exists(&StagePath::new("ANALYTICS", "PUBLIC", "my_stage").unwrap()));
    }

    #[test]
    fn uncompressed_upload_keeps_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "raw.json", "{}");
        let wh = warehouse();
        let flags = UploadFlags { compress: false, overwrite: true };
        let req = request(UploadTarget::Existing("LANDING".into()), vec![file], flags);
        let report = execute(&wh, &req, FailurePolicy::default()).unwrap();

        assert!(report.stage_status.is_none());
        assert_eq!(wh.objects(&req.stage), vec!["raw.json"]);
        let (_, put) = report.files.succeeded().next().unwrap();
        assert_eq!(put.target_compression, "NONE");
        assert!(!wh.statements().iter().any(|s| s.text.starts_with("create stage")));
    }

    #[test]
    fn overwrite_controls_repeat_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "dup.csv", "1");
        let wh = warehouse();

        let on = request(UploadTarget::Existing("LANDING".into()), vec![file.clone()], UploadFlags::default());
        for _ in 0..2 {
            let report = execute(&wh, &on, FailurePolicy::default()).unwrap();
            let (_, put) = report.files.succeeded().next().unwrap();
            assert!(put.is_uploaded());
        }

        let off = request(
            UploadTarget::Existing("LANDING".into()),
            vec![file],
            UploadFlags { compress: true, overwrite: false },
        );
        let report = execute(&wh, &off, FailurePolicy::default()).unwrap();
        let (_, put) = report.files.succeeded().next().unwrap();
        assert!(put.is_skipped());
        assert!(put.message.contains("already exists"));
    }

    #[test]
    fn failing_file_skips_the_rest_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            write_file(&dir, "one.csv", "1"),
            write_file(&dir, "two.csv", "2"),
            write_file(&dir, "three.csv", "3"),
        ];
        let wh = warehouse();
        wh.fail_put_of("two.csv");
        let req = request(UploadTarget::Existing("LANDING".into()), files, UploadFlags::default());

        let report = execute(&wh, &req, FailurePolicy::StopOnFirstFailure).unwrap();
        let labels: Vec<_> = report.files.items.iter().map(|(_, o)| o.label()).collect();
        assert_eq!(labels, vec!["ok", "failed", "skipped"]);
        assert_eq!(wh.objects(&req.stage), vec!["one.csv.gz"]);

        let report = execute(&wh, &req, FailurePolicy::ContinueOnFailure).unwrap();
        let labels: Vec<_> = report.files.items.iter().map(|(_, o)| o.label()).collect();
        assert_eq!(labels, vec!["ok", "failed", "ok"]);
    }

    #[test]
    fn missing_local_file_fails_without_a_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let wh = warehouse();
        let req = request(
            UploadTarget::Existing("LANDING".into()),
            vec![dir.path().join("gone.csv"), dir.path().to_path_buf()],
            UploadFlags::default(),
        );
        let report = execute(&wh, &req, FailurePolicy::ContinueOnFailure).unwrap();
        assert!(matches!(report.files.items[0].1, ItemOutcome::Failed(_)));
        assert!(matches!(&report.files.items[1].1, ItemOutcome::Failed(m) if m.contains("not a regular file")));
        assert!(!wh.statements().iter().any(|s| s.text.starts_with("put ")));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_name_is_uploaded_as_is() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OsStr::from_bytes(b"caf\xe9.csv"));
        if std::fs::write(&path, "x").is_err() {
            // some filesystems refuse non-UTF-8 names
            return;
        }
        let wh = warehouse();
        let req = request(UploadTarget::Existing("LANDING".into()), vec![path.clone()], UploadFlags::default());
        let report = execute(&wh, &req, FailurePolicy::default()).unwrap();

        assert!(report.files.all_succeeded(), "{:?}", report.files);
        assert_eq!(report.files.items[0].0, path.to_string_lossy());
        assert_eq!(wh.objects(&req.stage).len(), 1);
    }

    #[test]
    fn stage_creation_failure_aborts_before_transfers() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_file(&dir, "a.csv", "x");
        let wh = warehouse();
        let req = UploadRequest::new("ANALYTICS", "NOPE", &UploadTarget::New("S".into()), vec![file], UploadFlags::default())
            .unwrap();
        let err = execute(&wh, &req, FailurePolicy::default()).unwrap_err();
        assert!(format!("{err:#}").contains("does not exist"));
        assert!(!wh.statements().iter().any(|s| s.text.starts_with("put ")));
    }
}
