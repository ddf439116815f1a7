// src/upload_form.rs
use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent};
use tui::{
    backend::Backend,
    layout::Rect,
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use StageFrost::upload::{UploadFlags, UploadReport, UploadTarget};
use StageFrost::ItemOutcome;

use crate::credentials_form::expand_home;
use crate::palette::STYLE;
use crate::text_input::TextInput;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TargetMode {
    Existing,
    New,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Field {
    Target,
    NewStage,
    AddFile,
    Files,
    Compress,
    Overwrite,
    Upload,
}

pub enum UploadAction {
    None,
    Upload,
    Message(String),
}

/// File Uploader tab: target, file list, flags and the upload button.
pub struct UploadForm {
    pub mode: TargetMode,
    pub new_stage: TextInput,
    pub add_file: TextInput,
    pub files: Vec<PathBuf>,
    file_cursor: usize,
    pub flags: UploadFlags,
    field: Field,
}

impl Default for UploadForm {
    fn default() -> Self {
        Self {
            mode: TargetMode::Existing,
            new_stage: TextInput::new(),
            add_file: TextInput::new(),
            files: Vec::new(),
            file_cursor: 0,
            flags: UploadFlags::default(),
            field: Field::Target,
        }
    }
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// `existing` is the stage currently chosen in the catalog picker.
    pub fn target(&self, existing: Option<&str>) -> UploadTarget {
        match self.mode {
            TargetMode::Existing => UploadTarget::existing(existing),
            TargetMode::New => UploadTarget::new_stage(self.new_stage.value()),
        }
    }

    fn fields(&self, target_chosen: bool) -> Vec<Field> {
        let mut fields = vec![Field::Target];
        if self.mode == TargetMode::New {
            fields.push(Field::NewStage);
        }
        if target_chosen {
            fields.extend([Field::AddFile, Field::Files, Field::Compress, Field::Overwrite, Field::Upload]);
        }
        fields
    }

    fn step_field(&mut self, target_chosen: bool, delta: isize) {
        let fields = self.fields(target_chosen);
        let cur = fields.iter().position(|f| *f == self.field).unwrap_or(0) as isize;
        let n = fields.len() as isize;
        self.field = fields[((cur + delta).rem_euclid(n)) as usize];
    }

    /// Queues a local path; blank input is ignored, duplicates are dropped.
    pub fn add_path(&mut self, raw: &str) -> Option<PathBuf> {
        if raw.trim().is_empty() {
            return None;
        }
        let path = expand_home(raw);
        if self.files.contains(&path) {
            return None;
        }
        self.files.push(path.clone());
        Some(path)
    }

    pub fn clear_files(&mut self) {
        self.files.clear();
        self.file_cursor = 0;
    }

    pub fn handle_key(&mut self, key: KeyEvent, existing: Option<&str>) -> UploadAction {
        let chosen = self.target(existing).is_chosen();
        if !self.fields(chosen).contains(&self.field) {
            self.field = Field::Target;
        }
        match key.code {
            KeyCode::Tab => self.step_field(chosen, 1),
            KeyCode::BackTab => self.step_field(chosen, -1),
            _ => return self.handle_field_key(key),
        }
        UploadAction::None
    }

    fn handle_field_key(&mut self, key: KeyEvent) -> UploadAction {
        match (self.field, key.code) {
            (Field::Target, KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')) => {
                self.mode = match self.mode {
                    TargetMode::Existing => TargetMode::New,
                    TargetMode::New => TargetMode::Existing,
                };
            }
            (Field::NewStage, _) => {
                self.new_stage.handle_key(key);
            }
            (Field::AddFile, KeyCode::Enter) => {
                let raw = self.add_file.value().to_string();
                self.add_file.clear();
                return match self.add_path(&raw) {
                    Some(path) => UploadAction::Message(format!("Added {}", path.display())),
                    None => UploadAction::None,
                };
            }
            (Field::AddFile, _) => {
                self.add_file.handle_key(key);
            }
            (Field::Files, KeyCode::Up) => self.file_cursor = self.file_cursor.saturating_sub(1),
            (Field::Files, KeyCode::Down) => {
                self.file_cursor = (self.file_cursor + 1).min(self.files.len().saturating_sub(1));
            }
            (Field::Files, KeyCode::Delete | KeyCode::Backspace) if self.file_cursor < self.files.len() => {
                self.files.remove(self.file_cursor);
                self.file_cursor = self.file_cursor.min(self.files.len().saturating_sub(1));
            }
            (Field::Compress, KeyCode::Char(' ') | KeyCode::Enter) => self.flags.compress = !self.flags.compress,
            (Field::Overwrite, KeyCode::Char(' ') | KeyCode::Enter) => self.flags.overwrite = !self.flags.overwrite,
            (Field::Upload, KeyCode::Enter) => return UploadAction::Upload,
            _ => {}
        }
        UploadAction::None
    }

    pub fn paste(&mut self, text: &str) {
        match self.field {
            Field::NewStage => self.new_stage.insert_str(text),
            Field::AddFile => {
                // one path per pasted line
                for line in text.lines() {
                    self.add_path(line);
                }
            }
            _ => {}
        }
    }

    pub fn render<B: Backend>(
        &self,
        f: &mut Frame<B>,
        area: Rect,
        focused: bool,
        existing: Option<&str>,
        scope: Option<&str>,
        last: Option<&UploadReport>,
    ) {
        let block = Block::default()
            .title(" ⬆ Upload files ")
            .borders(Borders::ALL)
            .border_style(if focused { STYLE::border_focus() } else { STYLE::border() });

        let on = |fld: Field| focused && self.field == fld;
        let mark = |fld: Field| if on(fld) { STYLE::caret() } else { STYLE::plain() };
        let check = |b: bool| if b { "[x]" } else { "[ ]" };

        let Some(scope) = scope else {
            let p = Paragraph::new(Span::styled("Choose a database and schema first.", STYLE::dim())).block(block);
            f.render_widget(p, area);
            return;
        };

        let existing_label = match existing {
            Some(stage) => format!("Existing stage ({stage})"),
            None => "Existing stage (none in this schema)".to_string(),
        };
        let radio = |m: TargetMode| if self.mode == m { "(•)" } else { "( )" };
        let mut lines = vec![
            Spans::from(Span::styled(format!("Target scope: {scope}"), STYLE::dim())),
            Spans::from(vec![
                Span::styled("Stage     ", mark(Field::Target)),
                Span::styled(format!("{} {existing_label}   {} Create new stage", radio(TargetMode::Existing), radio(TargetMode::New)), STYLE::plain()),
            ]),
        ];
        if self.mode == TargetMode::New {
            lines.push(self.new_stage.spans("New name", on(Field::NewStage)));
        }

        let target = self.target(existing);
        if !target.is_chosen() {
            lines.push(Spans::from(""));
            lines.push(Spans::from(Span::styled("Pick a stage or type a name for the new one.", STYLE::warning_fg())));
            f.render_widget(Paragraph::new(lines).block(block), area);
            return;
        }

        lines.push(Spans::from(""));
        lines.push(self.add_file.spans("Add file", on(Field::AddFile)));
        lines.push(Spans::from(Span::styled(
            format!("Files ({})", self.files.len()),
            if on(Field::Files) { STYLE::header_row() } else { STYLE::dim() },
        )));
        if self.files.is_empty() {
            lines.push(Spans::from(Span::styled("  none yet, type a path and press Enter", STYLE::dim())));
        }
        for (i, file) in self.files.iter().enumerate() {
            let style = if on(Field::Files) && i == self.file_cursor { STYLE::caret() } else { STYLE::plain() };
            lines.push(Spans::from(Span::styled(format!("  {}", file.display()), style)));
        }
        lines.push(Spans::from(""));
        lines.push(Spans::from(vec![
            Span::styled(format!("{} Compress (gzip)", check(self.flags.compress)), mark(Field::Compress)),
            Span::raw("   "),
            Span::styled(format!("{} Overwrite", check(self.flags.overwrite)), mark(Field::Overwrite)),
        ]));
        let verb = if target.creates_stage() { "Create stage and upload" } else { "Upload" };
        lines.push(Spans::from(Span::styled(format!("[ {verb} ]"), mark(Field::Upload))));

        if let Some(report) = last {
            lines.push(Spans::from(""));
            lines.push(Spans::from(Span::styled(
                format!("PUT result for {}: {}", report.stage.display(), report.files.summary()),
                STYLE::header_row(),
            )));
            if let Some(status) = &report.stage_status {
                lines.push(Spans::from(Span::styled(status.clone(), STYLE::info_fg())));
            }
            for (file, outcome) in &report.files.items {
                match outcome {
                    ItemOutcome::Succeeded(put) => {
                        let style = if put.is_skipped() { STYLE::warning_fg() } else { STYLE::success_fg() };
                        for line in put.describe() {
                            lines.push(Spans::from(Span::styled(format!("  {line}"), style)));
                        }
                    }
                    ItemOutcome::Failed(msg) => {
                        lines.push(Spans::from(Span::styled(format!("  {file}: {msg}"), STYLE::error_fg())));
                    }
                    ItemOutcome::Skipped => {
                        lines.push(Spans::from(Span::styled(format!("  {file}: not attempted"), STYLE::dim())));
                    }
                }
            }
        }

        f.render_widget(Paragraph::new(lines).block(block), area);
    }
}
