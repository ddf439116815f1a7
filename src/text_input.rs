// src/text_input.rs
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tui::text::{Span, Spans};
use unicode_segmentation::UnicodeSegmentation;

use crate::palette::STYLE;

/// One-line text field. The caret counts grapheme clusters, not bytes.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    value: String,
    caret: usize,
    masked: bool,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders every grapheme as `•`.
    pub fn masked() -> Self {
        Self { masked: true, ..Self::default() }
    }

    pub fn with_value(value: &str) -> Self {
        let mut input = Self::new();
        input.set_value(value);
        input
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: &str) {
        self.value = value.to_string();
        self.caret = self.len();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.caret = 0;
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    fn len(&self) -> usize {
        self.value.graphemes(true).count()
    }

    fn byte_at(&self, grapheme: usize) -> usize {
        self.value
            .grapheme_indices(true)
            .nth(grapheme)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    pub fn insert_str(&mut self, text: &str) {
        let text: String = text.chars().filter(|c| !c.is_control()).collect();
        let at = self.byte_at(self.caret);
        self.value.insert_str(at, &text);
        self.caret += text.graphemes(true).count();
    }

    /// Applies an editing key. Returns `true` when the key was consumed.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('u') if ctrl => self.clear(),
            KeyCode::Char(_) if ctrl => return false,
            KeyCode::Char(c) => {
                let mut buf = [0u8; 4];
                self.insert_str(c.encode_utf8(&mut buf));
            }
            KeyCode::Backspace if self.caret > 0 => {
                let (start, end) = (self.byte_at(self.caret - 1), self.byte_at(self.caret));
                self.value.replace_range(start..end, "");
                self.caret -= 1;
            }
            KeyCode::Delete if self.caret < self.len() => {
                let (start, end) = (self.byte_at(self.caret), self.byte_at(self.caret + 1));
                self.value.replace_range(start..end, "");
            }
            KeyCode::Left => self.caret = self.caret.saturating_sub(1),
            KeyCode::Right => self.caret = (self.caret + 1).min(self.len()),
            KeyCode::Home => self.caret = 0,
            KeyCode::End => self.caret = self.len(),
            KeyCode::Backspace | KeyCode::Delete => {}
            _ => return false,
        }
        true
    }

    fn shown(&self) -> Vec<String> {
        if self.masked {
            vec!["•".to_string(); self.len()]
        } else {
            self.value.graphemes(true).map(str::to_string).collect()
        }
    }

    /// `label` followed by the value; the caret cell is highlighted when focused.
    pub fn spans(&self, label: &str, focused: bool) -> Spans<'static> {
        let label_style = if focused { STYLE::header_row() } else { STYLE::dim() };
        let mut spans = vec![Span::styled(format!("{label:<10}"), label_style)];
        let shown = self.shown();
        if !focused {
            spans.push(Span::styled(shown.concat(), STYLE::plain()));
            return Spans::from(spans);
        }
        let before: String = shown[..self.caret].concat();
        let at = shown.get(self.caret).cloned().unwrap_or_else(|| " ".to_string());
        let after: String = shown.get(self.caret + 1..).map(|s| s.concat()).unwrap_or_default();
        spans.push(Span::styled(before, STYLE::plain()));
        spans.push(Span::styled(at, STYLE::input_cursor()));
        spans.push(Span::styled(after, STYLE::plain()));
        Spans::from(spans)
    }
}
