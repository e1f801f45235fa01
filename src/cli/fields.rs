use super::ui;
use crate::core::accessor::flatten;
use crate::core::format::{ValueFormat, format_value};
use crate::core::widget::WidgetPatch;
use crate::dashboard::Dashboard;
use crate::pipeline::Preview;
use anyhow::Result;
use comfy_table::Cell;
use serde_json::Value;
use tracing::warn;

const SAMPLE_WIDTH: usize = 48;

#[derive(Debug, Clone, Default)]
pub struct FieldsOptions {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub select: Option<Vec<String>>,
}

/// Previews the fields a widget can display and optionally saves a new
/// selection together with the endpoint it was previewed against.
pub async fn run(dashboard: &Dashboard, id: &str, options: FieldsOptions) -> Result<()> {
    let widget = super::widgets::find_widget(dashboard.store(), id)?;
    let endpoint = options
        .endpoint
        .as_deref()
        .or(widget.api_endpoint.as_deref());

    let preview = dashboard
        .pipeline()
        .preview(&widget, endpoint, options.api_key.as_deref())
        .await?;

    match options.select {
        None => print_preview(&preview, widget.selected_fields.as_deref(), dashboard),
        Some(fields) => {
            for field in fields.iter().filter(|f| !preview.available_fields.contains(*f)) {
                warn!(%field, "Selected field not found in preview");
            }
            let patch = WidgetPatch {
                api_endpoint: options.endpoint.map(Some),
                api_key: options.api_key.map(Some),
                selected_fields: Some(Some(fields).filter(|f| !f.is_empty())),
                ..Default::default()
            };
            dashboard.store().update(&widget.id, patch)?;
            println!("Saved field selection for {}", widget.title);
        }
    }
    Ok(())
}

fn print_preview(preview: &Preview, selected: Option<&[String]>, dashboard: &Dashboard) {
    let palette = ui::palette(dashboard.store().theme());
    let sample = match &preview.payload {
        Value::Array(items) => items.first().map(flatten).unwrap_or_default(),
        other => flatten(other),
    };

    let mut table = ui::new_styled_table();
    table.set_header(
        ["", "Field", "Sample"]
            .iter()
            .map(|h| ui::header_cell(h, &palette)),
    );
    for field in &preview.available_fields {
        let marker = match selected {
            Some(fields) if fields.contains(field) => "✓",
            _ => "",
        };
        table.add_row(vec![
            Cell::new(marker),
            Cell::new(field),
            Cell::new(truncate(&format_value(sample.get(field), ValueFormat::Plain))),
        ]);
    }
    println!("{table}");
    println!(
        "{}",
        ui::style_text(
            &format!("{} fields available", preview.available_fields.len()),
            ui::StyleType::Subtle
        )
    );
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= SAMPLE_WIDTH {
        return text.to_string();
    }
    let head: String = text.chars().take(SAMPLE_WIDTH - 1).collect();
    format!("{head}…")
}
