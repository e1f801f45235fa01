use crate::core::widget::Theme;
use crate::pipeline::Trend;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Label,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Label => style(text).bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Colors that differ between light and dark terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub header: Color,
    pub muted: Color,
    pub positive: Color,
    pub negative: Color,
}

pub fn palette(theme: Theme) -> Palette {
    match theme {
        Theme::Light => Palette {
            header: Color::DarkBlue,
            muted: Color::DarkGrey,
            positive: Color::DarkGreen,
            negative: Color::DarkRed,
        },
        Theme::Dark => Palette {
            header: Color::Cyan,
            muted: Color::Grey,
            positive: Color::Green,
            negative: Color::Red,
        },
    }
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str, palette: &Palette) -> Cell {
    Cell::new(text)
        .fg(palette.header)
        .add_attribute(Attribute::Bold)
}

/// Right-aligned cell for numeric values.
pub fn number_cell(text: &str) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

/// Creates a cell colored by the direction of a price move.
pub fn trend_cell(text: &str, trend: Trend, palette: &Palette) -> Cell {
    let (marker, color) = match trend {
        Trend::Up => ("▲", palette.positive),
        Trend::Down => ("▼", palette.negative),
        Trend::Flat => ("-", palette.muted),
    };
    Cell::new(format!("{marker} {text}"))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

/// Creates a cell for "N/A" values, with error-specific styling.
pub fn na_cell(has_error: bool, palette: &Palette) -> Cell {
    let color = if has_error {
        palette.negative
    } else {
        palette.muted
    };
    Cell::new("N/A").fg(color)
}

/// Creates a new `indicatif::ProgressBar` with standard styling.
pub fn new_progress_bar(len: u64, with_message: bool) -> ProgressBar {
    let template = if with_message {
        "{spinner:.green} {msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}"
    } else {
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}"
    };

    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palettes_differ_per_theme() {
        assert_ne!(palette(Theme::Light), palette(Theme::Dark));
    }

    #[test]
    fn test_trend_cell_marks_direction() {
        let palette = palette(Theme::Dark);
        assert_eq!(trend_cell("1.2%", Trend::Up, &palette).content(), "▲ 1.2%");
        assert_eq!(trend_cell("-3%", Trend::Down, &palette).content(), "▼ -3%");
        assert_eq!(trend_cell("n/a", Trend::Flat, &palette).content(), "- n/a");
    }
}
