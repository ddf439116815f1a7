// src/credentials_form.rs
use std::path::{Path, PathBuf};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use directories::UserDirs;
use tui::{
    backend::Backend,
    layout::Rect,
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use StageFrost::profile::ConnectionProfile;
use StageFrost::session::SessionInfo;

use crate::palette::STYLE;
use crate::text_input::TextInput;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CredentialSource {
    JsonFile,
    Manual,
}

const MANUAL_LABELS: [&str; 5] = ["Account", "User", "Password", "Role", "Warehouse"];

/// Sidebar login: either a JSON credentials file or five typed fields.
pub struct CredentialsForm {
    pub source: CredentialSource,
    pub file_path: TextInput,
    fields: [TextInput; 5],
    /// 0 = source toggle, 1.. = inputs of the active source.
    field_idx: usize,
}

pub enum FormAction {
    None,
    Connect(ConnectionProfile),
    Invalid(String),
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    let raw = raw.trim();
    let rest = raw.strip_prefix("~/").or_else(|| (raw == "~").then_some(""));
    match (rest, UserDirs::new()) {
        (Some(rest), Some(dirs)) => dirs.home_dir().join(rest),
        _ => PathBuf::from(raw),
    }
}

impl CredentialsForm {
    pub fn new(default_file: Option<&Path>) -> Self {
        let (source, file_path) = match default_file {
            Some(p) => (CredentialSource::JsonFile, TextInput::with_value(&p.display().to_string())),
            None => (CredentialSource::Manual, TextInput::new()),
        };
        Self {
            source,
            file_path,
            fields: [TextInput::new(), TextInput::new(), TextInput::masked(), TextInput::new(), TextInput::new()],
            field_idx: 1,
        }
    }

    fn field_count(&self) -> usize {
        match self.source {
            CredentialSource::JsonFile => 2,
            CredentialSource::Manual => 1 + self.fields.len(),
        }
    }

    fn active_input(&mut self) -> Option<&mut TextInput> {
        match (self.source, self.field_idx) {
            (_, 0) => None,
            (CredentialSource::JsonFile, _) => Some(&mut self.file_path),
            (CredentialSource::Manual, i) => self.fields.get_mut(i - 1),
        }
    }

    pub fn toggle_source(&mut self) {
        self.source = match self.source {
            CredentialSource::JsonFile => CredentialSource::Manual,
            CredentialSource::Manual => CredentialSource::JsonFile,
        };
        self.field_idx = 0;
    }

    /// Builds the profile from whichever source is active.
    pub fn profile(&self) -> Result<ConnectionProfile> {
        let profile = match self.source {
            CredentialSource::JsonFile => ConnectionProfile::from_json_file(&expand_home(self.file_path.value()))?,
            CredentialSource::Manual => {
                let v = |i: usize| self.fields[i].value().trim().to_string();
                // passwords are taken verbatim, surrounding spaces included
                let password = self.fields[2].value().to_string();
                ConnectionProfile { account: v(0), user: v(1), password, role: v(3), warehouse: v(4) }
            }
        };
        profile.validate()?;
        Ok(profile)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        match key.code {
            KeyCode::Tab | KeyCode::Down => {
                self.field_idx = (self.field_idx + 1) % self.field_count();
            }
            KeyCode::BackTab | KeyCode::Up => {
                let n = self.field_count();
                self.field_idx = (self.field_idx + n - 1) % n;
            }
            KeyCode::Enter => {
                return match self.profile() {
                    Ok(profile) => FormAction::Connect(profile),
                    Err(e) => FormAction::Invalid(format!("{e:#}")),
                };
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if self.field_idx == 0 => {
                self.toggle_source();
            }
            _ => {
                if let Some(input) = self.active_input() {
                    input.handle_key(key);
                }
            }
        }
        FormAction::None
    }

    pub fn paste(&mut self, text: &str) {
        if let Some(input) = self.active_input() {
            input.insert_str(text);
        }
    }

    pub fn render<B: Backend>(&self, f: &mut Frame<B>, area: Rect, focused: bool) {
        let block = Block::default()
            .title(" 🔑 Snowflake Credentials ")
            .borders(Borders::ALL)
            .border_style(if focused { STYLE::border_focus() } else { STYLE::border() });

        let radio = |src: CredentialSource, label: &str| {
            let mark = if self.source == src { "(•)" } else { "( )" };
            Span::styled(format!("{mark} {label}  "), STYLE::plain())
        };
        let toggle_style = if focused && self.field_idx == 0 { STYLE::caret() } else { STYLE::plain() };
        let mut lines = vec![
            Spans::from(vec![Span::styled("Source  ", toggle_style), radio(CredentialSource::JsonFile, "JSON file"), radio(CredentialSource::Manual, "Manual")]),
            Spans::from(""),
        ];
        match self.source {
            CredentialSource::JsonFile => {
                lines.push(self.file_path.spans("File", focused && self.field_idx == 1));
                lines.push(Spans::from(Span::styled(
                    "keys: account, user, password, role, warehouse",
                    STYLE::dim(),
                )));
            }
            CredentialSource::Manual => {
                for (i, (input, label)) in self.fields.iter().zip(MANUAL_LABELS).enumerate() {
                    lines.push(input.spans(label, focused && self.field_idx == i + 1));
                }
            }
        }
        lines.push(Spans::from(""));
        lines.push(Spans::from(Span::styled("Enter: Connect   Tab: next field", STYLE::dim())));

        f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
    }
}

/// Replaces the login form once connected.
pub fn render_session_info<B: Backend>(f: &mut Frame<B>, area: Rect, info: &SessionInfo, focused: bool) {
    let block = Block::default()
        .title(" ✅ Connection details ")
        .borders(Borders::ALL)
        .border_style(if focused { STYLE::border_focus() } else { STYLE::border() });

    let mut lines: Vec<Spans> = info
        .to_pretty_json()
        .lines()
        .map(|l| Spans::from(Span::styled(l.to_string(), STYLE::plain())))
        .collect();
    lines.push(Spans::from(""));
    lines.push(Spans::from(Span::styled("Ctrl+D: Disconnect", STYLE::dim())));

    f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(form: &mut CredentialsForm, text: &str) {
        for c in text.chars() {
            form.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn manual_fields_build_a_profile() {
        let mut form = CredentialsForm::new(None);
        for value in ["acct", "ops", "pw", "SYSADMIN", "WH"] {
            type_str(&mut form, value);
            form.handle_key(key(KeyCode::Tab));
        }
        let FormAction::Connect(profile) = form.handle_key(key(KeyCode::Enter)) else {
            panic!("expected a profile");
        };
        assert_eq!(profile.user, "ops");
        assert_eq!(profile.warehouse, "WH");
    }

    #[test]
    fn password_keeps_surrounding_spaces() {
        let mut form = CredentialsForm::new(None);
        for value in ["acct", " ops ", " p w ", "SYSADMIN", "WH"] {
            type_str(&mut form, value);
            form.handle_key(key(KeyCode::Tab));
        }
        let profile = form.profile().unwrap();
        assert_eq!(profile.user, "ops");
        assert_eq!(profile.password, " p w ");
    }

    #[test]
    fn missing_fields_are_reported() {
        let mut form = CredentialsForm::new(None);
        type_str(&mut form, "acct");
        let FormAction::Invalid(msg) = form.handle_key(key(KeyCode::Enter)) else {
            panic!("expected a validation error");
        };
        assert!(msg.contains("password"));
    }

    #[test]
    fn json_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(
            &path,
            r#"{"account":"a","user":"u","password":"p","role":"r","warehouse":"w"}"#,
        )
        .unwrap();
        let form = CredentialsForm::new(Some(&path));
        assert_eq!(form.source, CredentialSource::JsonFile);
        assert_eq!(form.profile().unwrap().role, "r");
    }

    #[test]
    fn home_is_expanded() {
        if let Some(dirs) = UserDirs::new() {
            assert_eq!(expand_home("~/c.json"), dirs.home_dir().join("c.json"));
        }
        assert_eq!(expand_home(" /tmp/c.json "), PathBuf::from("/tmp/c.json"));
    }
}
