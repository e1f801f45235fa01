//! Widget definitions and dashboard state.
//!
//! The serialized form uses the camelCase field names of the exported
//! dashboard document, e.g. `{"id": "...", "type": "chart", "chartType": "line"}`.

use crate::core::provider::SeriesInterval;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use uuid::Uuid;

pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 60_000;
pub const MIN_REFRESH_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_SYMBOL: &str = "AAPL";
pub const DEFAULT_WATCHLIST: [&str; 5] = ["AAPL", "GOOGL", "MSFT", "AMZN", "TSLA"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChartMode {
    #[default]
    #[serde(rename = "line")]
    Line,
    #[serde(rename = "candle", alias = "candlestick")]
    Candle,
}

impl FromStr for ChartMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "line" => Ok(ChartMode::Line),
            "candle" | "candlestick" => Ok(ChartMode::Candle),
            _ => Err(anyhow::anyhow!("Invalid chart mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardMode {
    Watchlist,
    #[default]
    Gainers,
    Performance,
    Financial,
}

impl Display for CardMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                CardMode::Watchlist => "watchlist",
                CardMode::Gainers => "gainers",
                CardMode::Performance => "performance",
                CardMode::Financial => "financial",
            }
        )
    }
}

impl FromStr for CardMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "watchlist" => Ok(CardMode::Watchlist),
            "gainers" => Ok(CardMode::Gainers),
            "performance" => Ok(CardMode::Performance),
            "financial" => Ok(CardMode::Financial),
            _ => Err(anyhow::anyhow!("Invalid card mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CardSettings {
    #[serde(rename = "cardType", default)]
    pub mode: CardMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,
}

impl CardSettings {
    pub fn new(mode: CardMode) -> Self {
        Self {
            mode,
            symbols: None,
        }
    }

    /// Symbols shown by watchlist cards.
    pub fn watchlist(&self) -> Vec<String> {
        match &self.symbols {
            Some(symbols) if !symbols.is_empty() => symbols.clone(),
            _ => DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Symbol shown by financial cards.
    pub fn primary_symbol(&self) -> String {
        self.symbols
            .as_ref()
            .and_then(|symbols| symbols.first())
            .cloned()
            .unwrap_or_else(|| DEFAULT_SYMBOL.to_string())
    }
}

fn default_symbol() -> String {
    DEFAULT_SYMBOL.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChartSettings {
    #[serde(rename = "chartType", default)]
    pub mode: ChartMode,
    #[serde(rename = "chartInterval", default)]
    pub interval: SeriesInterval,
    #[serde(default = "default_symbol")]
    pub symbol: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            mode: ChartMode::Line,
            interval: SeriesInterval::Daily,
            symbol: default_symbol(),
        }
    }
}

/// Widget kind with its kind-specific settings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WidgetKind {
    Table,
    Card(CardSettings),
    Chart(ChartSettings),
}

impl WidgetKind {
    pub fn name(&self) -> &'static str {
        match self {
            WidgetKind::Table => "table",
            WidgetKind::Card(_) => "card",
            WidgetKind::Chart(_) => "chart",
        }
    }
}

impl Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetDefinition {
    pub id: String,
    #[serde(flatten)]
    pub kind: WidgetKind,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(
        rename = "refreshInterval",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_fields: Option<Vec<String>>,
    /// Raw payload of the last successful fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl WidgetDefinition {
    /// Creates a widget with a fresh id and the default refresh interval.
    pub fn new(kind: WidgetKind, title: &str) -> Self {
        let title = if title.trim().is_empty() {
            format!("New {} Widget", kind.name())
        } else {
            title.to_string()
        };
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            title,
            api_endpoint: None,
            api_key: None,
            refresh_interval_ms: Some(DEFAULT_REFRESH_INTERVAL_MS),
            selected_fields: None,
            data: None,
            width: None,
            height: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.api_endpoint = endpoint.filter(|e| !e.trim().is_empty());
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_refresh_interval(mut self, refresh_interval_ms: Option<u64>) -> Self {
        self.refresh_interval_ms = refresh_interval_ms;
        self
    }

    pub fn with_selected_fields(mut self, fields: Option<Vec<String>>) -> Self {
        self.selected_fields = fields.filter(|f| !f.is_empty());
        self
    }

    /// Hash over the inputs that determine what a refresh fetches and how
    /// often. A change means the widget's refresh task must be rescheduled.
    pub fn refresh_fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.api_endpoint.hash(&mut hasher);
        self.api_key.hash(&mut hasher);
        self.kind.hash(&mut hasher);
        self.refresh_interval_ms.hash(&mut hasher);
        self.selected_fields.hash(&mut hasher);
        hasher.finish()
    }

    /// Shallow-merges `patch` into this widget. Settings that belong to a
    /// different kind are ignored; the kind itself never changes.
    pub fn apply_patch(&mut self, patch: WidgetPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(endpoint) = patch.api_endpoint {
            self.api_endpoint = endpoint;
        }
        if let Some(api_key) = patch.api_key {
            self.api_key = api_key;
        }
        if let Some(interval) = patch.refresh_interval_ms {
            self.refresh_interval_ms = interval;
        }
        if let Some(fields) = patch.selected_fields {
            self.selected_fields = fields;
        }
        if let Some(data) = patch.data {
            self.data = data;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }

        match &mut self.kind {
            WidgetKind::Chart(chart) => {
                if let Some(mode) = patch.chart_mode {
                    chart.mode = mode;
                }
                if let Some(interval) = patch.chart_interval {
                    chart.interval = interval;
                }
                if let Some(symbol) = patch.chart_symbol {
                    chart.symbol = symbol.to_uppercase();
                }
            }
            WidgetKind::Card(card) => {
                if let Some(mode) = patch.card_mode {
                    card.mode = mode;
                }
                if let Some(symbols) = patch.card_symbols {
                    card.symbols = symbols;
                }
            }
            WidgetKind::Table => {}
        }
    }
}

/// Partial update of a widget. `None` leaves a field untouched; for optional
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetPatch {
    pub title: Option<String>,
    pub api_endpoint: Option<Option<String>>,
    pub api_key: Option<Option<String>>,
    pub refresh_interval_ms: Option<Option<u64>>,
    pub selected_fields: Option<Option<Vec<String>>>,
    pub data: Option<Option<Value>>,
    pub width: Option<Option<f64>>,
    pub height: Option<Option<f64>>,
    pub chart_mode: Option<ChartMode>,
    pub chart_interval: Option<SeriesInterval>,
    pub chart_symbol: Option<String>,
    pub card_mode: Option<CardMode>,
    pub card_symbols: Option<Option<Vec<String>>>,
}

impl WidgetPatch {
    /// Patch that stores a freshly fetched payload.
    pub fn payload(data: Value) -> Self {
        Self {
            data: Some(Some(data)),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardState {
    #[serde(default)]
    pub widgets: Vec<WidgetDefinition>,
    #[serde(default)]
    pub theme: Theme,
}

impl DashboardState {
    pub fn position(&self, id: &str) -> Option<usize> {
        self.widgets.iter().position(|w| w.id == id)
    }

    pub fn widget(&self, id: &str) -> Option<&WidgetDefinition> {
        self.widgets.iter().find(|w| w.id == id)
    }
}
