// src/widgets.rs
use tui::{
    backend::Backend,
    layout::Rect,
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use StageFrost::stage_explorer::{ObjectGrid, StageObject};
use StageFrost::Picker;

use crate::palette::STYLE;

/*──────────────────────── banners ────────────────────────*/
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Info,
    Warning,
    Error,
}

/// Inline message above the tabs. Cleared by the next user action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
}

impl Banner {
    pub fn success(text: impl Into<String>) -> Self { Self { kind: BannerKind::Success, text: text.into() } }
    pub fn info(text: impl Into<String>) -> Self { Self { kind: BannerKind::Info, text: text.into() } }
    pub fn warning(text: impl Into<String>) -> Self { Self { kind: BannerKind::Warning, text: text.into() } }
    pub fn error(text: impl Into<String>) -> Self { Self { kind: BannerKind::Error, text: text.into() } }

    fn spans(&self) -> Spans<'static> {
        let (icon, style) = match self.kind {
            BannerKind::Success => ("✔", STYLE::success_fg()),
            BannerKind::Info => ("ℹ", STYLE::info_fg()),
            BannerKind::Warning => ("⚠", STYLE::warning_fg()),
            BannerKind::Error => ("✖", STYLE::error_fg()),
        };
        Spans::from(Span::styled(format!(" {icon} {}", self.text), style))
    }
}

pub fn render_banners<B: Backend>(f: &mut Frame<B>, area: Rect, banners: &[Banner]) {
    let lines: Vec<Spans> = banners.iter().map(Banner::spans).collect();
    f.render_widget(Paragraph::new(lines), area);
}

/*──────────────────────── pickers ────────────────────────*/
/// Single-choice list with the selection kept in view.
pub fn render_picker<B: Backend>(
    f: &mut Frame<B>,
    area: Rect,
    title: &str,
    picker: &Picker,
    focused: bool,
    empty_text: &str,
) {
    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(if focused { STYLE::border_focus() } else { STYLE::border() });
    let height = block.inner(area).height as usize;

    if picker.is_empty() {
        let p = Paragraph::new(Span::styled(empty_text.to_string(), STYLE::dim())).block(block);
        f.render_widget(p, area);
        return;
    }

    let selected = picker.selected_index().unwrap_or(0);
    let offset = (selected + 1).saturating_sub(height);
    let lines: Vec<Spans> = picker
        .options()
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(i, name)| {
            let style = match (i == selected, focused) {
                (true, true) => STYLE::caret(),
                (true, false) => STYLE::selected_unfocused(),
                _ => STYLE::plain(),
            };
            Spans::from(Span::styled(format!(" {name}"), style))
        })
        .collect();
    f.render_widget(Paragraph::new(lines).block(block), area);
}

/*──────────────────────── object grid ────────────────────────*/
const NAME_MIN: usize = 24;

fn pad(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat(' ').take(width - len));
    out
}

fn row_text(obj: &StageObject, name_w: usize) -> String {
    format!(
        "{} {:>10}  {:<19}  {}",
        pad(obj.relative_path(), name_w),
        obj.size_display(),
        obj.modified_display(),
        obj.md5.as_deref().unwrap_or(""),
    )
}

/// Checkbox table of stage objects. Updates the grid's scroll offset.
pub fn render_object_grid<B: Backend>(
    f: &mut Frame<B>,
    area: Rect,
    title: &str,
    grid: &mut ObjectGrid,
    focused: bool,
) {
    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(if focused { STYLE::border_focus() } else { STYLE::border() });
    let inner = block.inner(area);
    let rows_h = (inner.height as usize).saturating_sub(1);
    grid.ensure_visible(rows_h);

    let name_w = (inner.width as usize).saturating_sub(4 + 11 + 21 + 34).max(NAME_MIN);
    let mut lines = vec![Spans::from(Span::styled(
        format!("    {} {:>10}  {:<19}  {}", pad("Name", name_w), "Size", "Last modified", "MD5"),
        STYLE::header_row(),
    ))];

    for (i, obj) in grid.objects().iter().enumerate().skip(grid.view_offset).take(rows_h) {
        let checked = grid.is_checked(&obj.name);
        let box_span = if checked {
            Span::styled(" ☑  ", STYLE::checked())
        } else {
            Span::styled(" ☐  ", STYLE::plain())
        };
        let style = if focused && i == grid.cursor { STYLE::caret() } else { STYLE::plain() };
        lines.push(Spans::from(vec![box_span, Span::styled(row_text(obj, name_w), style)]));
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}
