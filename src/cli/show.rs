use super::ui;
use crate::core::accessor::resolve;
use crate::core::format::{ValueFormat, format_number, format_value};
use crate::core::table::{SortDirection, TableView};
use crate::core::widget::{ChartMode, Theme, WidgetDefinition, WidgetKind};
use crate::dashboard::Dashboard;
use crate::pipeline::{CardSummary, ChartPoint, WidgetData, WidgetView};
use anyhow::Result;
use comfy_table::Cell;
use futures::future::join_all;
use serde_json::Value;

/// Table criteria applied to every table widget before rendering.
#[derive(Debug, Clone, Default)]
pub struct ShowOptions {
    pub widget: Option<String>,
    pub search: Option<String>,
    pub filters: Vec<(String, String)>,
    pub sort: Option<String>,
    pub descending: bool,
    pub page: Option<usize>,
}

impl ShowOptions {
    pub(crate) fn apply_to(&self, table: &mut TableView, row_count: usize) {
        if let Some(search) = &self.search {
            table.set_search(search);
        }
        for (field, value) in &self.filters {
            table.set_column_filter(field, value);
        }
        if let Some(field) = &self.sort {
            let direction = if self.descending {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            table.set_sort(field, direction);
        }
        if let Some(page) = self.page {
            table.set_page(page, row_count);
        }
    }
}

/// Parses a `field=value` column filter.
pub fn parse_filter(s: &str) -> Result<(String, String)> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Invalid filter {}, expected field=value", s))?;
    Ok((field.trim().to_string(), value.trim().to_string()))
}

pub async fn run(dashboard: &Dashboard, options: &ShowOptions) -> Result<()> {
    let widgets: Vec<WidgetDefinition> = match &options.widget {
        Some(id) => vec![super::widgets::find_widget(dashboard.store(), id)?],
        None => dashboard.store().widgets(),
    };

    if widgets.is_empty() {
        println!("No widgets on the dashboard. Add one with `finboard add`.");
        return Ok(());
    }

    let pb = ui::new_progress_bar(widgets.len() as u64, false);
    let refreshes = widgets.iter().map(|widget| {
        let pb_clone = pb.clone();
        async move {
            dashboard.refresh(&widget.id).await;
            pb_clone.inc(1);
        }
    });
    join_all(refreshes).await;
    pb.finish_and_clear();

    let theme = dashboard.store().theme();
    let num_widgets = widgets.len();
    for (i, widget) in widgets.iter().enumerate() {
        let view = dashboard.with_view_mut(&widget.id, |view| {
            if let Some(WidgetData::Table { rows, .. }) = &view.data {
                let row_count = rows.len();
                options.apply_to(&mut view.table, row_count);
            }
            view.clone()
        });
        render_widget(widget, &view, theme);

        if i < num_widgets - 1 {
            ui::print_separator();
        }
    }

    Ok(())
}

pub fn render_widget(widget: &WidgetDefinition, view: &WidgetView, theme: Theme) {
    println!(
        "\n{} {}",
        ui::style_text(&widget.title, ui::StyleType::Title),
        ui::style_text(&format!("[{}]", widget.kind), ui::StyleType::Subtle)
    );

    if let Some(error) = &view.error {
        println!("{}", ui::style_text(error, ui::StyleType::Error));
    }

    let palette = ui::palette(theme);
    match &view.data {
        None if view.error.is_none() => println!("Loading..."),
        None => {}
        Some(data) if data.is_empty() => println!("No data available"),
        Some(WidgetData::Table {
            rows,
            display_fields,
            ..
        }) => render_table(rows, display_fields, &view.table, &palette),
        Some(WidgetData::Cards { records }) => render_cards(records, &palette),
        Some(WidgetData::Chart { points }) => {
            let mode = match &widget.kind {
                WidgetKind::Chart(chart) => chart.mode,
                _ => ChartMode::Line,
            };
            render_chart(points, mode, &palette)
        }
    }

    if let Some(updated_at) = view.updated_at {
        println!(
            "{}",
            ui::style_text(
                &format!("Last updated {}", updated_at.format("%H:%M:%S UTC")),
                ui::StyleType::Subtle
            )
        );
    }
}

fn render_table(rows: &[Value], fields: &[String], view: &TableView, palette: &ui::Palette) {
    let page = view.page(rows, fields);

    let mut table = ui::new_styled_table();
    table.set_header(fields.iter().map(|field| {
        let marker = match view.sort() {
            Some(spec) if &spec.field == field => match spec.direction {
                SortDirection::Ascending => " ↑",
                SortDirection::Descending => " ↓",
            },
            _ => "",
        };
        ui::header_cell(&format!("{field}{marker}"), palette)
    }));

    for row in &page.rows {
        table.add_row(fields.iter().map(|field| match resolve(row, field) {
            None => ui::na_cell(false, palette),
            value => Cell::new(format_value(value, ValueFormat::Plain)),
        }));
    }
    println!("{table}");

    let mut footer = format!(
        "Page {} of {} ({} of {} rows)",
        page.current_page,
        page.total_pages.max(1),
        page.matching_rows,
        rows.len()
    );
    if view.has_criteria() {
        footer.push_str(", filtered");
    }
    println!("{}", ui::style_text(&footer, ui::StyleType::Subtle));
}

fn render_cards(records: &[Value], palette: &ui::Palette) {
    let mut table = ui::new_styled_table();
    table.set_header(
        ["Symbol", "Price", "Change", "Change %"]
            .iter()
            .map(|h| ui::header_cell(h, palette)),
    );

    for (index, record) in records.iter().enumerate() {
        let summary = CardSummary::from_record(record, index);
        let price = match &summary.price {
            Some(price) => ui::number_cell(&format_value(Some(price), ValueFormat::Currency)),
            None => ui::na_cell(false, palette),
        };
        table.add_row(vec![
            Cell::new(&summary.symbol),
            price,
            ui::trend_cell(
                &format_value(Some(&summary.change), ValueFormat::Currency),
                summary.trend,
                palette,
            ),
            ui::trend_cell(&summary.change_percent, summary.trend, palette),
        ]);
    }
    println!("{table}");
}

fn render_chart(points: &[ChartPoint], mode: ChartMode, palette: &ui::Palette) {
    let mut table = ui::new_styled_table();
    match mode {
        ChartMode::Line => {
            table.set_header(["Date", "Close"].iter().map(|h| ui::header_cell(h, palette)));
            for point in points {
                table.add_row(vec![
                    Cell::new(&point.date),
                    ui::number_cell(&format_number(point.close)),
                ]);
            }
        }
        ChartMode::Candle => {
            table.set_header(
                ["Date", "Open", "High", "Low", "Close", "Volume"]
                    .iter()
                    .map(|h| ui::header_cell(h, palette)),
            );
            for point in points {
                table.add_row(vec![
                    Cell::new(&point.date),
                    ui::number_cell(&format_number(point.open)),
                    ui::number_cell(&format_number(point.high)),
                    ui::number_cell(&format_number(point.low)),
                    ui::number_cell(&format_number(point.close)),
                    ui::number_cell(&format_number(point.volume)),
                ]);
            }
        }
    }
    println!("{table}");

    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        if first.close != 0.0 {
            let change = (last.close - first.close) / first.close * 100.0;
            println!(
                "{}",
                ui::style_text(
                    &format!(
                        "{} to {}: {:+.2}%",
                        first.date, last.date, change
                    ),
                    ui::StyleType::Label
                )
            );
        }
    }
}
