use tui::style::{Color, Modifier, Style};
use once_cell::sync::OnceCell;

use StageFrost::config::ColorConfig;

/*──────────────────────── 1. Kanagawa tones (RGB) ─────────────────────────*/
/// The handful of fixed tones that are not configurable.
pub mod KANAGAWA {
    use tui::style::Color;

    pub const INKSTONE:        Color = Color::Rgb( 22,  22,  22);
    pub const STEEL_VIOLET:    Color = Color::Rgb( 84,  84, 109);
    pub const SILVER_VIOLET:   Color = Color::Rgb(120, 120, 145);
    pub const SAKURA_PETAL:    Color = Color::Rgb(238, 185, 225);
}

/*──────────────────────── Configured colors ───────────────────────────────*/
static CONFIG_COLORS: OnceCell<ColorConfig> = OnceCell::new();

/// Installs the `[colors]` table of the loaded config. Later calls are ignored.
pub fn install(colors: ColorConfig) {
    let _ = CONFIG_COLORS.set(colors);
}

fn colors() -> &'static ColorConfig {
    CONFIG_COLORS.get_or_init(ColorConfig::default)
}

// Helper to convert RGB array to Color
#[inline]
pub fn rgb(arr: [u8; 3]) -> Color {
    Color::Rgb(arr[0], arr[1], arr[2])
}

/*──────────────────────── 2. Style shortcuts used throughout the UI ───────*/
/// Central place to theme every widget.
pub mod STYLE {
    use super::{colors, rgb, Modifier, Style};
    const EMPTY: Modifier = Modifier::empty();

    fn fg(c: [u8; 3]) -> Style { Style { fg: Some(rgb(c)), bg: None, add_modifier: EMPTY, sub_modifier: EMPTY } }

    /* ─── global background ─── */
    pub fn default_bg() -> Style {
        Style { fg: None, bg: Some(rgb(colors().default_bg)), add_modifier: EMPTY, sub_modifier: EMPTY }
    }

    pub fn plain() -> Style { fg(colors().plain) }
    pub fn dim() -> Style { Style { fg: Some(super::KANAGAWA::SILVER_VIOLET), bg: None, add_modifier: EMPTY, sub_modifier: EMPTY } }

    /* ─── panes ─── */
    pub fn border() -> Style { fg(colors().border) }
    pub fn border_focus() -> Style { fg(colors().border_focus) }
    pub fn header_row() -> Style { Style { fg: Some(rgb(colors().header_row)), bg: None, add_modifier: Modifier::BOLD, sub_modifier: EMPTY } }
    pub fn tab_active() -> Style { Style { fg: Some(rgb(colors().tab_active)), bg: None, add_modifier: Modifier::BOLD | Modifier::UNDERLINED, sub_modifier: EMPTY } }
    pub fn title() -> Style { Style { fg: Some(super::KANAGAWA::SAKURA_PETAL), bg: None, add_modifier: Modifier::BOLD, sub_modifier: EMPTY } }

    /* ─── lists, grid and inputs ─── */
    pub fn caret() -> Style { Style { fg: Some(rgb(colors().caret_fg)), bg: Some(rgb(colors().caret_bg)), add_modifier: EMPTY, sub_modifier: EMPTY } }
    pub fn selected_unfocused() -> Style { Style { fg: Some(rgb(colors().plain)), bg: Some(super::KANAGAWA::STEEL_VIOLET), add_modifier: EMPTY, sub_modifier: EMPTY } }
    pub fn checked() -> Style { Style { fg: Some(rgb(colors().checked_fg)), bg: None, add_modifier: Modifier::BOLD, sub_modifier: EMPTY } }
    pub fn input_cursor() -> Style { Style { fg: Some(super::KANAGAWA::INKSTONE), bg: Some(rgb(colors().plain)), add_modifier: EMPTY, sub_modifier: EMPTY } }

    /* ─── banners / status ─── */
    pub fn success_fg() -> Style { fg(colors().success_fg) }
    pub fn info_fg() -> Style { fg(colors().info_fg) }
    pub fn warning_fg() -> Style { Style { fg: Some(rgb(colors().warning_fg)), bg: None, add_modifier: Modifier::BOLD, sub_modifier: EMPTY } }
    pub fn error_fg() -> Style { Style { fg: Some(rgb(colors().error_fg)), bg: None, add_modifier: Modifier::BOLD, sub_modifier: EMPTY } }
    pub fn status_fg() -> Style { fg(colors().status_fg) }

    /* ─── help ─── */
    pub fn help_bg() -> Style { Style { fg: Some(rgb(colors().plain)), bg: Some(rgb(colors().help_bg)), add_modifier: EMPTY, sub_modifier: EMPTY } }
    pub fn help_border() -> Style { fg(colors().border_focus) }
}
