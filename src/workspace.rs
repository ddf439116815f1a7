use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use copypasta::{ClipboardContext, ClipboardProvider};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{info, warn};
use tui::layout::{Constraint, Direction, Layout};
use tui::text::{Span, Spans};
use tui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use tui::{backend::Backend, layout::Rect, Frame, Terminal};

use StageFrost::catalog::{CatalogLevel, CatalogSelection};
use StageFrost::config::Config;
use StageFrost::odbc_session::OdbcConnector;
use StageFrost::profile::ConnectionProfile;
use StageFrost::session::{AppContext, Connector};
use StageFrost::stage_explorer::StageExplorer;
use StageFrost::upload::{self, UploadReport, UploadRequest};
use StageFrost::FailurePolicy;

use crate::credentials_form::{render_session_info, CredentialsForm, FormAction};
use crate::palette::STYLE;
use crate::upload_form::{TargetMode, UploadAction, UploadForm};
use crate::widgets::{render_banners, render_object_grid, render_picker, Banner};

const MAX_BANNERS: usize = 6;
const PAGE: isize = 10;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Focus {
    Sidebar,
    Databases,
    Schemas,
    Stages,
    Main,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Sidebar => Focus::Databases,
            Focus::Databases => Focus::Schemas,
            Focus::Schemas => Focus::Stages,
            Focus::Stages => Focus::Main,
            Focus::Main => Focus::Sidebar,
        }
    }

    fn level(self) -> Option<CatalogLevel> {
        match self {
            Focus::Databases => Some(CatalogLevel::Database),
            Focus::Schemas => Some(CatalogLevel::Schema),
            Focus::Stages => Some(CatalogLevel::Stage),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Tab {
    Explorer,
    Uploader,
}

/// Blocking warehouse work. Queued so the busy banner is drawn before it runs.
enum Pending {
    Connect(ConnectionProfile),
    Delete,
    RetryDelete,
    Upload(UploadRequest),
}

pub struct Workspace {
    pub ctx: AppContext,
    connector: Box<dyn Connector>,
    policy: FailurePolicy,

    pub credentials: CredentialsForm,
    pub catalog: CatalogSelection,
    pub explorer: StageExplorer,
    pub uploader: UploadForm,
    pub last_upload: Option<UploadReport>,

    pub tab: Tab,
    pub focus: Focus,
    pub banners: Vec<Banner>,
    delete_armed: bool,
    pending: Option<Pending>,

    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,
    pub show_help: bool,
    clipboard: Option<ClipboardContext>,
}

impl Workspace {
    pub fn new(config: &Config, credentials_file: Option<PathBuf>) -> Self {
        let connector = Box::new(OdbcConnector::new(config.driver.clone()));
        Self::with_connector(config, credentials_file, connector)
    }

    pub fn with_connector(
        config: &Config,
        credentials_file: Option<PathBuf>,
        connector: Box<dyn Connector>,
    ) -> Self {
        Self {
            ctx: AppContext::new(),
            connector,
            policy: FailurePolicy::from_stop_flag(config.stop_on_first_failure),
            credentials: CredentialsForm::new(credentials_file.as_deref()),
            catalog: CatalogSelection::new(),
            explorer: StageExplorer::default(),
            uploader: UploadForm::new(),
            last_upload: None,
            tab: Tab::Explorer,
            focus: Focus::Sidebar,
            banners: Vec::new(),
            delete_armed: false,
            pending: None,
            status_message: None,
            status_message_time: None,
            show_help: false,
            // no clipboard on headless sessions; copying just reports it
            clipboard: ClipboardContext::new().ok(),
        }
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    fn push(&mut self, banner: Banner) {
        if self.banners.len() < MAX_BANNERS {
            self.banners.push(banner);
        }
    }

    /*──────────────────────── keys ────────────────────────*/
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        if key.kind != KeyEventKind::Press {
            return Ok(false);
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        // Ctrl+Q quits from anywhere
        if ctrl && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('Q')) {
            return Ok(true);
        }
        if key.code == KeyCode::F(1) {
            self.show_help = !self.show_help;
            return Ok(false);
        }
        /* block all other keys while help is shown or work is queued */
        if self.show_help || self.pending.is_some() {
            return Ok(false);
        }

        match key.code {
            KeyCode::Esc if self.delete_armed => {
                self.delete_armed = false;
                self.banners.clear();
                self.push(Banner::info("Deletion cancelled."));
                return Ok(false);
            }
            KeyCode::Esc => {
                self.focus = self.focus.next();
                return Ok(false);
            }
            KeyCode::F(2) => {
                self.tab = match self.tab {
                    Tab::Explorer => Tab::Uploader,
                    Tab::Uploader => Tab::Explorer,
                };
                self.delete_armed = false;
                return Ok(false);
            }
            KeyCode::F(5) => {
                self.banners.clear();
                self.refresh_catalog();
                return Ok(false);
            }
            KeyCode::Char('d') if ctrl => {
                self.disconnect();
                return Ok(false);
            }
            _ => {}
        }

        match self.focus {
            Focus::Sidebar => self.sidebar_key(key),
            Focus::Databases | Focus::Schemas | Focus::Stages => self.picker_key(key),
            Focus::Main => match self.tab {
                Tab::Explorer => self.explorer_key(key),
                Tab::Uploader => self.uploader_key(key),
            },
        }
        Ok(false)
    }

    pub fn handle_paste(&mut self, text: &str) {
        match (self.focus, self.tab) {
            (Focus::Sidebar, _) if !self.ctx.is_connected() => self.credentials.paste(text),
            (Focus::Main, Tab::Uploader) => self.uploader.paste(text),
            _ => {}
        }
    }

    fn sidebar_key(&mut self, key: KeyEvent) {
        if self.ctx.is_connected() {
            return;
        }
        match self.credentials.handle_key(key) {
            FormAction::None => {}
            FormAction::Invalid(msg) => {
                self.banners.clear();
                self.push(Banner::error(msg));
            }
            FormAction::Connect(profile) => {
                self.banners.clear();
                self.push(Banner::info(format!("Connecting to {}...", profile.host())));
                self.pending = Some(Pending::Connect(profile));
            }
        }
    }

    fn picker_key(&mut self, key: KeyEvent) {
        let Some(level) = self.focus.level() else { return };
        let delta = match key.code {
            KeyCode::Up => -1,
            KeyCode::Down => 1,
            KeyCode::PageUp => -PAGE,
            KeyCode::PageDown => PAGE,
            KeyCode::Enter | KeyCode::Tab => {
                self.focus = self.focus.next();
                return;
            }
            _ => return,
        };
        let Some(wh) = self.ctx.warehouse() else { return };
        let before = self.catalog.stage_path();
        let stepped = self.catalog.step(wh, level, delta);
        self.banners.clear();
        if let Err(e) = stepped {
            self.push(Banner::error(format!("{e:#}")));
            return;
        }
        if self.catalog.stage_path() != before {
            self.sync_explorer();
        }
    }

    fn explorer_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let grid = &mut self.explorer.grid;
        match key.code {
            KeyCode::Up => grid.move_cursor(-1),
            KeyCode::Down => grid.move_cursor(1),
            KeyCode::PageUp => grid.move_cursor(-PAGE),
            KeyCode::PageDown => grid.move_cursor(PAGE),
            KeyCode::Home => grid.cursor = 0,
            KeyCode::End => grid.move_cursor(isize::MAX / 2),
            KeyCode::Char(' ') => {
                grid.toggle_at_cursor();
                self.delete_armed = false;
            }
            KeyCode::Char('a') if ctrl => {
                grid.toggle_all();
                self.delete_armed = false;
            }
            KeyCode::Char('c') if ctrl => self.copy_current_path(),
            KeyCode::Char('r') if ctrl => self.request_retry(),
            KeyCode::Delete => self.request_delete(),
            KeyCode::Enter if self.delete_armed => self.request_delete(),
            _ => {}
        }
    }

    fn uploader_key(&mut self, key: KeyEvent) {
        match self.uploader.handle_key(key, self.catalog.stage()) {
            UploadAction::None => {}
            UploadAction::Message(msg) => self.set_status(msg),
            UploadAction::Upload => self.request_upload(),
        }
    }

    /*──────────────────────── actions ────────────────────────*/
    fn request_delete(&mut self) {
        self.banners.clear();
        let Some(stage) = self.explorer.stage().map(|s| s.display()) else {
            self.push(Banner::warning("Select a stage first."));
            return;
        };
        let n = self.explorer.grid.checked_count();
        if n == 0 {
            self.delete_armed = false;
            self.push(Banner::warning("Select at least one file to delete (Space toggles, Ctrl+A toggles all)."));
            return;
        }
        if !self.delete_armed {
            self.delete_armed = true;
            self.push(Banner::warning(format!(
                "Are you sure you want to delete {n} file(s) from {stage}? You cannot undo this!"
            )));
            let preview = selection_preview(&self.explorer.grid.checked_paths());
            self.push(Banner::warning(preview));
            self.push(Banner::info("Press Delete or Enter again to confirm, Esc to cancel."));
            return;
        }
        self.delete_armed = false;
        self.push(Banner::info(format!("Deleting {n} file(s) from {stage}...")));
        self.pending = Some(Pending::Delete);
    }

    fn request_retry(&mut self) {
        self.banners.clear();
        let remaining = self
            .explorer
            .last_report
            .as_ref()
            .map(|r| r.remaining().len())
            .unwrap_or(0);
        if remaining == 0 {
            self.push(Banner::info("Nothing to retry."));
            return;
        }
        self.push(Banner::info(format!("Retrying {remaining} file(s)...")));
        self.pending = Some(Pending::RetryDelete);
    }

    fn request_upload(&mut self) {
        self.banners.clear();
        let target = self.uploader.target(self.catalog.stage());
        let (Some(db), Some(schema)) = (self.catalog.database(), self.catalog.schema()) else {
            self.push(Banner::warning("Choose a database and schema first."));
            return;
        };
        match UploadRequest::new(db, schema, &target, self.uploader.files.clone(), self.uploader.flags) {
            Ok(request) => {
                self.push(Banner::info(format!(
                    "Uploading {} file(s) to {}...",
                    request.files.len(),
                    request.stage.display()
                )));
                self.pending = Some(Pending::Upload(request));
            }
            Err(e) => self.push(Banner::warning(format!("{e:#}"))),
        }
    }

    fn copy_current_path(&mut self) {
        let (Some(stage), Some(obj)) = (self.explorer.stage(), self.explorer.grid.current()) else { return };
        let path = format!("{}/{}", stage.display(), obj.relative_path());
        let copied = match self.clipboard.as_mut() {
            Some(cb) => cb.set_contents(path.clone()).is_ok(),
            None => false,
        };
        if copied {
            self.set_status(format!("Copied {path}"));
        } else {
            self.set_status("Clipboard unavailable");
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Runs the queued warehouse call. Blocks until it returns.
    pub fn run_pending(&mut self) {
        let Some(job) = self.pending.take() else { return };
        self.banners.clear();
        match job {
            Pending::Connect(profile) => self.connect(&profile),
            Pending::Delete => self.delete(false),
            Pending::RetryDelete => self.delete(true),
            Pending::Upload(request) => self.upload(&request),
        }
    }

    fn connect(&mut self, profile: &ConnectionProfile) {
        let connected = self
            .ctx
            .connect(profile, self.connector.as_ref())
            .map(|s| s.info().user.clone());
        match connected {
            Ok(user) => {
                self.push(Banner::success(format!("Connected to Snowflake as {user}.")));
                self.focus = Focus::Databases;
                self.refresh_catalog();
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "connect failed");
                self.push(Banner::error(format!("{e:#}")));
            }
        }
    }

    fn disconnect(&mut self) {
        self.banners.clear();
        if self.ctx.disconnect() {
            self.catalog.clear();
            self.explorer = StageExplorer::default();
            self.last_upload = None;
            self.delete_armed = false;
            self.focus = Focus::Sidebar;
            self.push(Banner::info("Disconnected."));
        }
    }

    fn refresh_catalog(&mut self) {
        let Some(wh) = self.ctx.warehouse() else {
            self.push(Banner::warning("Not connected. Enter credentials and press Enter."));
            return;
        };
        if let Err(e) = self.catalog.refresh(wh) {
            self.banners.push(Banner::error(format!("{e:#}")));
            return;
        }
        self.sync_explorer();
    }

    /// Points the explorer at the chosen stage and reports empty levels.
    fn sync_explorer(&mut self) {
        let Some(wh) = self.ctx.warehouse() else { return };
        let loaded = self.explorer.load(wh, self.catalog.stage_path());
        self.delete_armed = false;
        if let Err(e) = loaded {
            self.push(Banner::error(format!("{e:#}")));
            return;
        }
        self.note_empty_levels();
    }

    fn note_empty_levels(&mut self) {
        let banner = if self.catalog.databases.is_empty() {
            Banner::warning("No databases are visible to the current role.")
        } else if self.catalog.schemas.is_empty() {
            Banner::warning(format!("Database {} has no schemas.", self.catalog.database().unwrap_or("?")))
        } else if self.catalog.stages.is_empty() {
            Banner::info(format!(
                "There are no internal stages in {}.",
                self.catalog.scope_label().unwrap_or_default()
            ))
        } else if self.explorer.grid.is_empty() && self.tab == Tab::Explorer {
            Banner::info("There are no files in the stage.")
        } else {
            return;
        };
        self.push(banner);
    }

    fn delete(&mut self, retry: bool) {
        let Some(wh) = self.ctx.warehouse() else { return };
        let result = if retry {
            self.explorer.retry_remaining(wh, self.policy)
        } else {
            self.explorer.delete_checked(wh, self.policy)
        };
        let refresh_error = result.err().map(|e| format!("{e:#}"));

        let Some(report) = self.explorer.last_report.as_ref() else {
            if let Some(msg) = refresh_error {
                self.push(Banner::error(msg));
            }
            return;
        };
        let deleted = report.succeeded().count();
        let failures: Vec<String> = report.failed().map(|(k, m)| format!("{k}: {m}")).collect();
        let skipped = report.skipped().count();
        let summary = report.summary();
        info!(summary = %summary, "delete batch shown");

        if deleted > 0 {
            self.push(Banner::success(format!("Deleted {deleted} file(s).")));
        }
        for failure in failures {
            self.push(Banner::error(format!("Could not delete {failure}")));
        }
        if skipped > 0 {
            self.push(Banner::warning(format!(
                "{skipped} file(s) were not attempted ({summary}). Press Ctrl+R to retry."
            )));
        }
        if let Some(msg) = refresh_error {
            self.push(Banner::error(msg));
        } else if self.explorer.grid.is_empty() {
            self.push(Banner::info("There are no files in the stage."));
        }
    }

    fn upload(&mut self, request: &UploadRequest) {
        let Some(wh) = self.ctx.warehouse() else { return };
        let report = match upload::execute(wh, request, self.policy) {
            Ok(report) => report,
            Err(e) => {
                self.push(Banner::error(format!("{e:#}")));
                return;
            }
        };
        let reload = if request.create_stage {
            self.catalog.reload_stages(wh).map(|_| {
                self.catalog.stages.select_name(request.stage.stage.as_str());
            })
        } else {
            Ok(())
        };

        if let Some(status) = &report.stage_status {
            self.push(Banner::info(status.clone()));
        }
        let uploaded = report.files.succeeded().filter(|(_, p)| !p.is_skipped()).count();
        let rejected = report.files.succeeded().filter(|(_, p)| p.is_skipped()).count();
        let failed = report.files.failed().count();
        if uploaded > 0 {
            self.push(Banner::success(format!("Uploaded {uploaded} file(s) to {}.", request.stage.display())));
        }
        if rejected > 0 {
            self.push(Banner::warning(format!(
                "{rejected} file(s) already exist in the stage and overwrite is off."
            )));
        }
        if failed > 0 {
            self.push(Banner::error(format!("Upload finished with errors: {}.", report.files.summary())));
        }
        if let Err(e) = reload {
            self.push(Banner::error(format!("{e:#}")));
        }

        if report.files.all_succeeded() {
            self.uploader.clear_files();
        }
        if request.create_stage {
            self.uploader.mode = TargetMode::Existing;
            self.uploader.new_stage.clear();
        }
        self.last_upload = Some(report);
        self.sync_explorer();
    }

    /*──────────────────────── timers ────────────────────────*/
    pub fn update(&mut self) {
        if let Some(t) = self.status_message_time {
            if t.elapsed() > Duration::from_secs(5) {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    /*──────────────────────── drawing ────────────────────────*/
    fn render_help<B: Backend>(&self, f: &mut Frame<B>, area: Rect) {
        const HELP: &[&str] = &[
            " StageFrost  –  Key Reference ",
            "",
            "  🔄 Navigation",
            "      Esc                  Cycle focus: credentials, pickers, tab",
            "      F2                   Switch Stage Explorer / File Uploader",
            "      ↑ ↓  PgUp PgDn       Move in pickers and lists",
            "      Enter (picker)       Accept and move to the next picker",
            "      F5                   Refresh databases, schemas and stages",
            "",
            "  🔑 Session",
            "      Tab / Shift+Tab      Next / previous credential field",
            "      Space (Source)       JSON file or manual entry",
            "      Enter                Connect",
            "      Ctrl + D             Disconnect",
            "",
            "  🗂 Stage Explorer",
            "      Space                Select / unselect file",
            "      Ctrl + A             Select / unselect all",
            "      Delete               Delete selected (asks to confirm)",
            "      Ctrl + R             Retry failed or skipped deletions",
            "      Ctrl + C             Copy the file's stage path",
            "",
            "  ⬆ File Uploader",
            "      Tab / Shift+Tab      Next / previous control",
            "      Space                Toggle stage mode or a flag",
            "      Enter (Add file)     Queue the typed path",
            "      Delete (Files)       Drop the highlighted file",
            "      Enter (Upload)       Upload the queued files",
            "",
            "     F1                   Close this help screen",
            "     Ctrl + Q             Quit StageFrost",
        ];

        let block = Block::default()
            .style(STYLE::help_bg())
            .borders(Borders::ALL)
            .title(" Help (F1 to close) ")
            .border_style(STYLE::help_border());

        let p = Paragraph::new(HELP.join("\n"))
            .block(block)
            .wrap(Wrap { trim: false });

        f.render_widget(Clear, area);
        f.render_widget(p, area);
    }

    fn status_spans(&self) -> Spans<'static> {
        let conn = if self.ctx.is_connected() { "[Connected]" } else { "[Not Connected]" };
        let mut text = conn.to_string();
        if self.pending.is_some() {
            text.push_str(" | ⏳ working...");
        }
        if let Some(m) = &self.status_message {
            text.push_str(&format!(" | {m}"));
        }
        text.push_str(" | F1 help | Ctrl+Q quit");
        Spans::from(Span::styled(text, STYLE::status_fg()))
    }

    fn tab_spans(&self) -> Spans<'static> {
        let tab = |t: Tab, label: &'static str| {
            let style = if self.tab == t { STYLE::tab_active() } else { STYLE::dim() };
            Span::styled(label, style)
        };
        Spans::from(vec![
            tab(Tab::Explorer, " 🗂 Stage Explorer "),
            Span::styled(" │ ", STYLE::dim()),
            tab(Tab::Uploader, " ⬆ File Uploader "),
            Span::styled("   (F2 switches)", STYLE::dim()),
        ])
    }

    fn render_explorer<B: Backend>(&mut self, f: &mut Frame<B>, area: Rect) {
        let focused = self.focus == Focus::Main;
        let Some(stage) = self.explorer.stage().map(|s| s.display()) else {
            let block = Block::default()
                .title(" Stage Explorer ")
                .borders(Borders::ALL)
                .border_style(if focused { STYLE::border_focus() } else { STYLE::border() });
            let p = Paragraph::new(Span::styled("Select a stage to browse its files.", STYLE::dim())).block(block);
            f.render_widget(p, area);
            return;
        };
        let grid = &mut self.explorer.grid;
        let title = format!(
            "{stage} · {} file(s), {} selected",
            grid.objects().len(),
            grid.checked_count()
        );
        render_object_grid(f, area, &title, grid, focused);
    }

    pub fn render<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        terminal.draw(|f| {
            let size = f.size();

            /* ── 0️⃣  bail early on tiny windows ── */
            if size.height < 16 || size.width < 60 {
                f.render_widget(Paragraph::new("Window too small for StageFrost"), size);
                return;
            }
            f.render_widget(Block::default().style(STYLE::default_bg()), size);

            /* ── 1️⃣  Help overlay?  draw + return ── */
            if self.show_help {
                self.render_help(f, size);
                return;
            }

            /* ── 2️⃣  sidebar | main ── */
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(40), Constraint::Min(20)])
                .split(size);

            let sidebar_focus = self.focus == Focus::Sidebar;
            match self.ctx.session() {
                Some(session) => render_session_info(f, cols[0], session.info(), sidebar_focus),
                None => self.credentials.render(f, cols[0], sidebar_focus),
            }

            let banner_h = self.banners.len().min(MAX_BANNERS) as u16;
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1),        // title
                    Constraint::Length(8),        // pickers
                    Constraint::Length(banner_h), // banners
                    Constraint::Length(1),        // tabs
                    Constraint::Min(3),           // tab content
                    Constraint::Length(1),        // status bar
                ])
                .split(cols[1]);

            f.render_widget(
                Paragraph::new(Span::styled(" ❄ StageFrost · Snowflake Internal Stage Manager", STYLE::title())),
                rows[0],
            );

            /* ── 3️⃣  cascading pickers ── */
            let pickers = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(1, 3), Constraint::Ratio(1, 3)])
                .split(rows[1]);
            let connected = self.ctx.is_connected();
            let empty = |text: &'static str| if connected { text } else { "Connect first" };
            render_picker(f, pickers[0], "Database", &self.catalog.databases, self.focus == Focus::Databases, empty("No databases"));
            render_picker(f, pickers[1], "Schema", &self.catalog.schemas, self.focus == Focus::Schemas, empty("No schemas"));
            render_picker(f, pickers[2], "Stage", &self.catalog.stages, self.focus == Focus::Stages, empty("No internal stages"));

            /* ── 4️⃣  banners, tabs, content ── */
            render_banners(f, rows[2], &self.banners);
            f.render_widget(Paragraph::new(self.tab_spans()), rows[3]);

            match self.tab {
                Tab::Explorer => self.render_explorer(f, rows[4]),
                Tab::Uploader => {
                    let scope = self.catalog.scope_label();
                    self.uploader.render(
                        f,
                        rows[4],
                        self.focus == Focus::Main,
                        self.catalog.stage(),
                        scope.as_deref(),
                        self.last_upload.as_ref(),
                    );
                }
            }

            f.render_widget(Paragraph::new(self.status_spans()), rows[5]);
        })?;
        Ok(())
    }
}

const PREVIEW_LIMIT: usize = 5;

/// `a.csv, b.csv and 3 more`
fn selection_preview(paths: &[&str]) -> String {
    let shown = paths.iter().take(PREVIEW_LIMIT).copied().collect::<Vec<_>>().join(", ");
    match paths.len().saturating_sub(PREVIEW_LIMIT) {
        0 => shown,
        more => format!("{shown} and {more} more"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use StageFrost::sql::{Sql, StagePath};
    use StageFrost::warehouse::{PutRequest, PutResult, RowSet, Warehouse};

    struct Unreachable;

    impl Connector for Unreachable {
        fn open(&self, _profile: &ConnectionProfile) -> Result<Box<dyn Warehouse>> {
            bail!("Connection failed: account not found")
        }
    }

    fn workspace() -> Workspace {
        Workspace::with_connector(&Config::default(), None, Box::new(Unreachable))
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn profile() -> ConnectionProfile {
        ConnectionProfile {
            account: "acct".into(),
            user: "ops".into(),
            password: "pw".into(),
            role: "r".into(),
            warehouse: "wh".into(),
        }
    }

    #[test]
    fn ctrl_q_quits_and_f1_toggles_help() {
        let mut ws = workspace();
        assert!(!ws.handle_key(press(KeyCode::F(1))).unwrap());
        assert!(ws.show_help);
        assert!(ws.handle_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL)).unwrap());
    }

    #[test]
    fn esc_cycles_focus() {
        let mut ws = workspace();
        let mut seen = vec![ws.focus];
        for _ in 0..5 {
            ws.handle_key(press(KeyCode::Esc)).unwrap();
            seen.push(ws.focus);
        }
        assert_eq!(
            seen,
            vec![Focus::Sidebar, Focus::Databases, Focus::Schemas, Focus::Stages, Focus::Main, Focus::Sidebar]
        );
    }

    #[test]
    fn failed_connect_shows_an_error_and_stays_disconnected() {
        let mut ws = workspace();
        ws.pending = Some(Pending::Connect(profile()));
        assert!(ws.has_pending());
        ws.run_pending();
        assert!(!ws.has_pending());
        assert!(!ws.ctx.is_connected());
        assert_eq!(ws.banners, vec![Banner::error("Connection failed: account not found")]);
        assert_eq!(ws.focus, Focus::Sidebar);
    }

    #[test]
    fn delete_needs_a_stage_and_a_selection() {
        let mut ws = workspace();
        ws.focus = Focus::Main;
        ws.handle_key(press(KeyCode::Delete)).unwrap();
        assert_eq!(ws.banners, vec![Banner::warning("Select a stage first.")]);
        assert!(!ws.has_pending());
    }

    /// Serves one fixed listing; nothing else.
    struct Listing(Vec<&'static str>);

    impl Warehouse for Listing {
        fn query(&self, _sql: &Sql) -> Result<RowSet> {
            let headers = ["name", "size", "md5", "last_modified"].iter().map(|h| h.to_string()).collect();
            let rows = self
                .0
                .iter()
                .map(|name| vec![format!("landing/{name}"), "1".into(), "x".into(), "Tue, 5 Mar 2024 10:00:00 GMT".into()])
                .collect();
            Ok(RowSet::new(headers, rows))
        }

        fn put(&self, _request: &PutRequest) -> Result<PutResult> {
            bail!("read-only")
        }
    }

    #[test]
    fn delete_confirmation_names_the_files() {
        let mut ws = workspace();
        let wh = Listing(vec!["a.csv", "b.csv", "c.csv", "d.csv", "e.csv", "f.csv", "g.csv"]);
        let stage = StagePath::new("ANALYTICS", "PUBLIC", "LANDING").unwrap();
        ws.explorer.load(&wh, Some(stage)).unwrap();
        ws.explorer.grid.toggle_all();
        ws.focus = Focus::Main;

        ws.handle_key(press(KeyCode::Delete)).unwrap();
        assert!(ws.delete_armed);
        assert_eq!(
            ws.banners[0],
            Banner::warning("Are you sure you want to delete 7 file(s) from @ANALYTICS.PUBLIC.LANDING? You cannot undo this!")
        );
        assert_eq!(ws.banners[1], Banner::warning("a.csv, b.csv, c.csv, d.csv, e.csv and 2 more"));
        assert!(!ws.has_pending());
    }

    #[test]
    fn short_selection_is_listed_in_full() {
        assert_eq!(selection_preview(&["x.csv", "y/z.csv"]), "x.csv, y/z.csv");
    }

    #[test]
    fn upload_without_scope_is_refused() {
        let mut ws = workspace();
        ws.request_upload();
        assert_eq!(ws.banners, vec![Banner::warning("Choose a database and schema first.")]);
        assert!(!ws.has_pending());
    }
}
