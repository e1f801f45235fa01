use super::ui;
use crate::core::widget::{WidgetDefinition, WidgetKind, WidgetPatch};
use crate::store::DashboardStore;
use anyhow::{Result, bail};
use comfy_table::Cell;

/// Settings for a widget created from the command line.
#[derive(Debug, Clone)]
pub struct NewWidget {
    pub kind: WidgetKind,
    pub title: String,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub refresh_interval_ms: Option<u64>,
    pub fields: Option<Vec<String>>,
}

impl NewWidget {
    pub fn into_definition(self) -> WidgetDefinition {
        let mut widget = WidgetDefinition::new(self.kind, &self.title)
            .with_endpoint(self.endpoint)
            .with_api_key(self.api_key)
            .with_selected_fields(self.fields);
        if self.refresh_interval_ms.is_some() {
            widget = widget.with_refresh_interval(self.refresh_interval_ms);
        }
        widget
    }
}

/// Looks a widget up by its full id or a unique id prefix.
pub fn find_widget(store: &DashboardStore, id: &str) -> Result<WidgetDefinition> {
    if let Some(widget) = store.widget(id) {
        return Ok(widget);
    }
    let mut matches = store
        .widgets()
        .into_iter()
        .filter(|w| w.id.starts_with(id));
    match (matches.next(), matches.next()) {
        (Some(widget), None) => Ok(widget),
        (Some(_), Some(_)) => bail!("Widget id {} is ambiguous", id),
        (None, _) => bail!("No widget with id {}", id),
    }
}

pub fn add(store: &DashboardStore, new_widget: NewWidget) -> Result<()> {
    let widget = new_widget.into_definition();
    let id = widget.id.clone();
    let title = widget.title.clone();
    store.add(widget)?;
    println!("Added widget {} ({})", ui::style_text(&title, ui::StyleType::Label), id);
    Ok(())
}

pub fn remove(store: &DashboardStore, id: &str) -> Result<()> {
    let widget = find_widget(store, id)?;
    store.remove(&widget.id);
    println!("Removed widget {}", widget.title);
    Ok(())
}

pub fn update(store: &DashboardStore, id: &str, patch: WidgetPatch) -> Result<()> {
    let widget = find_widget(store, id)?;
    store.update(&widget.id, patch)?;
    println!("Updated widget {}", widget.id);
    Ok(())
}

/// Moves a widget between 1-based positions.
pub fn reorder(store: &DashboardStore, from: usize, to: usize) -> Result<()> {
    if from == 0 || to == 0 {
        bail!("Positions start at 1");
    }
    if !store.reorder(from - 1, to - 1) {
        bail!("No widget at position {}", from);
    }
    list(store);
    Ok(())
}

/// First eight characters of an id, enough to pass back as a prefix.
fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

pub fn list(store: &DashboardStore) {
    let state = store.snapshot();
    if state.widgets.is_empty() {
        println!("No widgets on the dashboard.");
        return;
    }

    let palette = ui::palette(state.theme);
    let mut table = ui::new_styled_table();
    table.set_header(
        ["#", "Id", "Title", "Type", "Source", "Refresh", "Fields"]
            .iter()
            .map(|h| ui::header_cell(h, &palette)),
    );

    for (index, widget) in state.widgets.iter().enumerate() {
        let source = match (&widget.api_endpoint, &widget.kind) {
            (Some(endpoint), WidgetKind::Table | WidgetKind::Chart(_)) => endpoint.clone(),
            (_, WidgetKind::Table) => "top gainers".to_string(),
            (_, WidgetKind::Card(card)) => card.mode.to_string(),
            (None, WidgetKind::Chart(chart)) => format!("{} {}", chart.symbol, chart.interval),
        };
        let refresh = widget
            .refresh_interval_ms
            .map(|ms| format!("{}s", ms as f64 / 1000.0))
            .unwrap_or_else(|| "off".to_string());
        let fields = widget
            .selected_fields
            .as_ref()
            .map(|f| f.join(", "))
            .unwrap_or_else(|| "auto".to_string());

        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(short_id(&widget.id)),
            Cell::new(&widget.title),
            Cell::new(widget.kind.name()),
            Cell::new(source),
            Cell::new(refresh),
            Cell::new(fields),
        ]);
    }
    println!("{table}");
    println!(
        "{}",
        ui::style_text(&format!("Theme: {}", state.theme), ui::StyleType::Subtle)
    );
}
