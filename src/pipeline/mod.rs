//! Per-widget data loading.
//!
//! Chooses the upstream call for a widget, turns the raw payload into rows,
//! cards or chart points, and derives the fields a table displays.

pub mod scheduler;

use crate::core::accessor::{discover_paths, numeric_value, resolve, to_plain_string};
use crate::core::provider::{ApiError, ApiResult, FinanceApi, FinanceProvider, Params};
use crate::core::table::TableView;
use crate::core::widget::{CardMode, CardSettings, ChartSettings, WidgetDefinition, WidgetKind};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Number of columns a table shows when the user has not picked any.
pub const DEFAULT_TABLE_FIELDS: usize = 5;
/// Number of most recent points a chart keeps.
pub const CHART_POINTS: usize = 30;
const CARD_MOVERS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetData {
    Table {
        rows: Vec<Value>,
        available_fields: Vec<String>,
        display_fields: Vec<String>,
    },
    Cards {
        records: Vec<Value>,
    },
    Chart {
        points: Vec<ChartPoint>,
    },
}

impl WidgetData {
    pub fn len(&self) -> usize {
        match self {
            WidgetData::Table { rows, .. } => rows.len(),
            WidgetData::Cards { records } => records.len(),
            WidgetData::Chart { points } => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Result of loading a widget: the raw payload and what was derived from it.
#[derive(Debug, Clone)]
pub struct WidgetLoad {
    pub payload: Value,
    pub data: WidgetData,
}

/// Payload fetched for the configuration preview, with every field path the
/// user can select.
#[derive(Debug, Clone)]
pub struct Preview {
    pub payload: Value,
    pub available_fields: Vec<String>,
}

/// Runtime state of one widget on screen.
#[derive(Debug, Clone, Default)]
pub struct WidgetView {
    pub data: Option<WidgetData>,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub table: TableView,
}

impl WidgetView {
    /// Records the outcome of a fetch. A failure keeps the previously loaded
    /// data next to the error.
    pub fn apply(&mut self, result: Result<WidgetData, ApiError>) {
        match result {
            Ok(data) => {
                if let WidgetData::Table { rows, .. } = &data {
                    self.table.set_page(self.table.current_page(), rows.len());
                }
                self.data = Some(data);
                self.error = None;
                self.updated_at = Some(Utc::now());
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.error.is_none()
    }
}

pub struct WidgetPipeline {
    provider: Arc<dyn FinanceProvider>,
}

impl WidgetPipeline {
    pub fn new(provider: Arc<dyn FinanceProvider>) -> Self {
        Self { provider }
    }

    fn api<'a>(&'a self, api_key: Option<&'a str>) -> FinanceApi<'a> {
        FinanceApi::new(self.provider.as_ref(), api_key)
    }

    pub async fn load(&self, widget: &WidgetDefinition) -> Result<WidgetLoad, ApiError> {
        debug!(id = %widget.id, kind = %widget.kind, "Loading widget data");
        let api = self.api(widget.api_key.as_deref());
        match &widget.kind {
            WidgetKind::Table => load_table(&api, widget).await,
            WidgetKind::Card(card) => load_cards(&api, card).await,
            WidgetKind::Chart(chart) => load_chart(&api, widget, chart).await,
        }
    }

    /// Fetches a sample payload for field selection. `endpoint` and `api_key`
    /// are the values being edited, which may differ from the saved widget.
    pub async fn preview(
        &self,
        widget: &WidgetDefinition,
        endpoint: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Preview, ApiError> {
        let api = self.api(api_key.or(widget.api_key.as_deref()));
        let payload = match (endpoint, &widget.kind) {
            (Some(endpoint), _) => api.fetch(endpoint, &Params::new()).await?,
            (None, WidgetKind::Chart(chart)) => {
                api.time_series(&chart.symbol, chart.interval).await?
            }
            (None, _) => api.top_gainers_losers().await?,
        };

        let sample = match &payload {
            Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
            other => other.clone(),
        };
        Ok(Preview {
            available_fields: discover_paths(&sample),
            payload,
        })
    }
}

async fn load_table(api: &FinanceApi<'_>, widget: &WidgetDefinition) -> Result<WidgetLoad, ApiError> {
    let (payload, rows) = match &widget.api_endpoint {
        Some(endpoint) => {
            let payload = api.fetch(endpoint, &Params::new()).await?;
            let rows = records_from_payload(&payload);
            (payload, rows)
        }
        None => {
            let payload = api.top_gainers_losers().await?;
            let rows = array_at(&payload, "top_gainers");
            (payload, rows)
        }
    };

    let available_fields = rows.first().map(discover_paths).unwrap_or_default();
    let display_fields = match &widget.selected_fields {
        Some(fields) if !fields.is_empty() => fields.clone(),
        _ => available_fields
            .iter()
            .take(DEFAULT_TABLE_FIELDS)
            .cloned()
            .collect(),
    };

    Ok(WidgetLoad {
        payload,
        data: WidgetData::Table {
            rows,
            available_fields,
            display_fields,
        },
    })
}

async fn load_cards(api: &FinanceApi<'_>, card: &CardSettings) -> Result<WidgetLoad, ApiError> {
    let (payload, records) = match card.mode {
        CardMode::Gainers => {
            let payload = api.top_gainers_losers().await?;
            let records = array_at(&payload, "top_gainers");
            (payload, records)
        }
        CardMode::Performance => {
            let payload = api.top_gainers_losers().await?;
            let mut records: Vec<Value> = array_at(&payload, "top_gainers")
                .into_iter()
                .take(CARD_MOVERS)
                .collect();
            records.extend(array_at(&payload, "top_losers").into_iter().take(CARD_MOVERS));
            (payload, records)
        }
        CardMode::Financial => {
            let payload = api.company_overview(&card.primary_symbol()).await?;
            (payload.clone(), vec![payload])
        }
        CardMode::Watchlist => {
            let symbols = card.watchlist();
            let quotes = join_all(symbols.iter().map(|symbol| api.quote(symbol))).await;
            let payloads = watchlist_payloads(&symbols, quotes)?;
            let records = payloads
                .iter()
                .map(|quote| quote.get("Global Quote").cloned().unwrap_or_else(|| Value::Object(Default::default())))
                .collect();
            (Value::Array(payloads), records)
        }
    };

    Ok(WidgetLoad {
        payload,
        data: WidgetData::Cards { records },
    })
}

/// Keeps the quotes that loaded. Fails only when every quote failed.
fn watchlist_payloads(symbols: &[String], quotes: Vec<ApiResult>) -> Result<Vec<Value>, ApiError> {
    let mut first_error = None;
    let mut payloads = Vec::new();
    for (symbol, quote) in symbols.iter().zip(quotes) {
        match quote {
            Ok(payload) => payloads.push(payload),
            Err(e) => {
                warn!(%symbol, error = %e, "Skipping watchlist quote");
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) if payloads.is_empty() => Err(e),
        _ => Ok(payloads),
    }
}

async fn load_chart(
    api: &FinanceApi<'_>,
    widget: &WidgetDefinition,
    chart: &ChartSettings,
) -> Result<WidgetLoad, ApiError> {
    let payload = match &widget.api_endpoint {
        Some(endpoint) => api.fetch(endpoint, &Params::new()).await?,
        None => api.time_series(&chart.symbol, chart.interval).await?,
    };
    let points = chart_points(&payload)?;
    Ok(WidgetLoad {
        payload,
        data: WidgetData::Chart { points },
    })
}

/// Rows of a custom endpoint: the payload itself when it is an array,
/// otherwise the values of its top-level object.
pub fn records_from_payload(payload: &Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items.clone(),
        Value::Object(map) => map.values().cloned().collect(),
        _ => Vec::new(),
    }
}

fn array_at(payload: &Value, key: &str) -> Vec<Value> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn is_series_key(key: &str) -> bool {
    key.contains("Time Series") || key.contains("Weekly") || key.contains("Monthly")
}

/// Extracts chronological OHLCV points from a time series payload, keeping
/// the most recent [`CHART_POINTS`].
pub fn chart_points(payload: &Value) -> Result<Vec<ChartPoint>, ApiError> {
    let series = payload
        .as_object()
        .and_then(|map| map.iter().find(|(key, _)| is_series_key(key)))
        .and_then(|(_, series)| series.as_object())
        .ok_or_else(|| ApiError::new("Invalid data format"))?;

    let mut points: Vec<ChartPoint> = series
        .iter()
        .map(|(date, values)| ChartPoint {
            date: date.clone(),
            open: series_value(values, &["1. open", "Open"]),
            high: series_value(values, &["2. high", "High"]),
            low: series_value(values, &["3. low", "Low"]),
            close: series_value(values, &["4. close", "Close"]),
            volume: series_value(values, &["5. volume", "Volume"]),
        })
        .collect();

    // Providers list the newest entry first
    points.reverse();
    let skip = points.len().saturating_sub(CHART_POINTS);
    Ok(points.split_off(skip))
}

fn series_value(values: &Value, keys: &[&str]) -> f64 {
    first_present(values, keys)
        .and_then(|v| numeric_value(Some(v)))
        .unwrap_or(0.0)
}

/// First of `paths` that resolves to a meaningful value: empty strings,
/// zero and `false` are skipped.
fn first_present<'a>(record: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths.iter().find_map(|path| {
        resolve(record, path).filter(|value| match value {
            Value::String(s) => !s.is_empty(),
            Value::Number(n) => n.as_f64() != Some(0.0),
            Value::Bool(b) => *b,
            _ => true,
        })
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// Headline values of a card, read through the field names different
/// endpoints use for the same quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct CardSummary {
    pub symbol: String,
    pub price: Option<Value>,
    pub change: Value,
    pub change_percent: String,
    pub trend: Trend,
}

impl CardSummary {
    pub fn from_record(record: &Value, index: usize) -> Self {
        let symbol = first_present(record, &["symbol", "01. symbol", "Symbol", "ticker"])
            .map(|v| to_plain_string(Some(v)))
            .unwrap_or_else(|| format!("Item {}", index + 1));
        let price = first_present(record, &["price", "05. price", "Price"]).cloned();
        let change = first_present(record, &["change", "09. change", "Change", "change_amount"])
            .cloned()
            .unwrap_or_else(|| Value::String("0".to_string()));
        let change_percent = first_present(
            record,
            &["change_percent", "10. change percent", "ChangePercent", "change_percentage"],
        )
        .map(|v| to_plain_string(Some(v)))
        .unwrap_or_else(|| "0%".to_string());

        let change_value = to_plain_string(Some(&change)).replace('%', "");
        let trend = match change_value.trim().parse::<f64>() {
            Ok(n) if n >= 0.0 => Trend::Up,
            Ok(n) if n < 0.0 => Trend::Down,
            _ => Trend::Flat,
        };

        Self {
            symbol,
            price,
            change,
            change_percent,
            trend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::SeriesInterval;
    use crate::core::widget::{CardSettings, ChartMode};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned payloads keyed by the `function` parameter, or by
    /// endpoint for custom endpoints.
    struct StaticProvider {
        responses: HashMap<String, ApiResult>,
        calls: Mutex<Vec<Params>>,
    }

    impl StaticProvider {
        fn new(responses: Vec<(&str, ApiResult)>) -> Arc<Self> {
            Arc::new(Self {
                responses: responses
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl FinanceProvider for StaticProvider {
        fn base_url(&self) -> &str {
            "https://api.test/query"
        }

        async fn fetch(&self, endpoint: &str, params: &Params, _api_key: Option<&str>) -> ApiResult {
            self.calls.lock().unwrap().push(params.clone());
            let key = match (params.get("function"), params.get("symbol")) {
                (Some(f), Some(s)) => format!("{f}:{s}"),
                (Some(f), None) => f.clone(),
                _ => endpoint.to_string(),
            };
            self.responses
                .get(&key)
                .or_else(|| params.get("function").and_then(|f| self.responses.get(f)))
                .cloned()
                .unwrap_or_else(|| Err(ApiError::new(format!("No response for {key}"))))
        }
    }

    fn movers() -> Value {
        json!({
            "metadata": "Top gainers, losers, and most actively traded US tickers",
            "last_updated": "2025-01-10 16:15:59 US/Eastern",
            "top_gainers": [
                {"ticker": "AAA", "price": "1.5", "change_amount": "0.5", "change_percentage": "50%", "volume": "100", "extra": "x"},
                {"ticker": "BBB", "price": "2.5", "change_amount": "0.7", "change_percentage": "38%", "volume": "200", "extra": "y"},
                {"ticker": "CCC", "price": "3.5", "change_amount": "0.9", "change_percentage": "35%", "volume": "300", "extra": "z"},
                {"ticker": "DDD", "price": "4.5", "change_amount": "1.1", "change_percentage": "32%", "volume": "400", "extra": "w"}
            ],
            "top_losers": [
                {"ticker": "LLL", "price": "1.0", "change_amount": "-0.5", "change_percentage": "-33%", "volume": "10"},
                {"ticker": "MMM", "price": "2.0", "change_amount": "-0.6", "change_percentage": "-23%", "volume": "20"},
                {"ticker": "NNN", "price": "3.0", "change_amount": "-0.7", "change_percentage": "-19%", "volume": "30"},
                {"ticker": "OOO", "price": "4.0", "change_amount": "-0.8", "change_percentage": "-17%", "volume": "40"}
            ]
        })
    }

    fn series(days: usize) -> Value {
        let mut entries = serde_json::Map::new();
        for day in (1..=days).rev() {
            entries.insert(
                format!("2024-{:02}-{:02}", 1 + (day - 1) / 28, 1 + (day - 1) % 28),
                json!({
                    "1. open": format!("{}.0", day),
                    "2. high": format!("{}.5", day),
                    "3. low": format!("{}.25", day),
                    "4. close": format!("{}.75", day),
                    "5. volume": "1000"
                }),
            );
        }
        json!({
            "Meta Data": {"1. Information": "Daily Prices", "2. Symbol": "AAPL"},
            "Time Series (Daily)": Value::Object(entries)
        })
    }

    fn table_fields(data: &WidgetData) -> (&Vec<Value>, &Vec<String>, &Vec<String>) {
        match data {
            WidgetData::Table {
                rows,
                available_fields,
                display_fields,
            } => (rows, available_fields, display_fields),
            other => panic!("Expected table data, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_default_table_uses_top_gainers_and_first_five_fields() {
        let provider = StaticProvider::new(vec![("TOP_GAINERS_LOSERS", Ok(movers()))]);
        let pipeline = WidgetPipeline::new(provider.clone());
        let widget = WidgetDefinition::new(WidgetKind::Table, "Gainers");

        let load = pipeline.load(&widget).await.unwrap();
        let (rows, available, display) = table_fields(&load.data);

        assert_eq!(rows.len(), 4);
        assert_eq!(available.len(), 6);
        assert_eq!(
            display,
            &vec!["ticker", "price", "change_amount", "change_percentage", "volume"]
        );
        assert_eq!(load.payload, movers());
    }

    #[tokio::test]
    async fn test_table_selected_fields_win() {
        let provider = StaticProvider::new(vec![("TOP_GAINERS_LOSERS", Ok(movers()))]);
        let pipeline = WidgetPipeline::new(provider);
        let widget = WidgetDefinition::new(WidgetKind::Table, "Gainers")
            .with_selected_fields(Some(vec!["extra".to_string(), "ticker".to_string()]));

        let load = pipeline.load(&widget).await.unwrap();
        let (_, _, display) = table_fields(&load.data);
        assert_eq!(display, &vec!["extra", "ticker"]);
    }

    #[tokio::test]
    async fn test_table_custom_endpoint_object_payload() {
        let endpoint = "https://custom.test/rates";
        let provider = StaticProvider::new(vec![(
            endpoint,
            Ok(json!({
                "usd": {"code": "USD", "rate": {"value": 1.0, "date": "2024-01-01"}},
                "eur": {"code": "EUR", "rate": {"value": 0.9, "date": "2024-01-01"}}
            })),
        )]);
        let pipeline = WidgetPipeline::new(provider.clone());
        let widget = WidgetDefinition::new(WidgetKind::Table, "Rates")
            .with_endpoint(Some(endpoint.to_string()));

        let load = pipeline.load(&widget).await.unwrap();
        let (rows, _, display) = table_fields(&load.data);

        assert_eq!(rows.len(), 2);
        assert_eq!(display, &vec!["code", "rate.value", "rate.date"]);
        assert!(provider.calls.lock().unwrap()[0].is_empty());
    }

    #[tokio::test]
    async fn test_table_error_is_returned() {
        let provider = StaticProvider::new(vec![(
            "TOP_GAINERS_LOSERS",
            Err(ApiError::new("Rate limit reached")),
        )]);
        let pipeline = WidgetPipeline::new(provider);
        let widget = WidgetDefinition::new(WidgetKind::Table, "");

        let err = pipeline.load(&widget).await.unwrap_err();
        assert_eq!(err.to_string(), "Rate limit reached");
    }

    #[tokio::test]
    async fn test_card_modes() {
        let provider = StaticProvider::new(vec![
            ("TOP_GAINERS_LOSERS", Ok(movers())),
            ("OVERVIEW:AAPL", Ok(json!({"Symbol": "AAPL", "Name": "Apple Inc"}))),
        ]);
        let pipeline = WidgetPipeline::new(provider);

        let card = |mode| WidgetDefinition::new(WidgetKind::Card(CardSettings::new(mode)), "");
        let records = |load: WidgetLoad| match load.data {
            WidgetData::Cards { records } => records,
            other => panic!("Expected card data, got {other:?}"),
        };

        let gainers = records(pipeline.load(&card(CardMode::Gainers)).await.unwrap());
        assert_eq!(gainers.len(), 4);

        let performance = records(pipeline.load(&card(CardMode::Performance)).await.unwrap());
        let tickers: Vec<_> = performance.iter().map(|r| r["ticker"].as_str().unwrap()).collect();
        assert_eq!(tickers, vec!["AAA", "BBB", "CCC", "LLL", "MMM", "NNN"]);

        let financial = records(pipeline.load(&card(CardMode::Financial)).await.unwrap());
        assert_eq!(financial, vec![json!({"Symbol": "AAPL", "Name": "Apple Inc"})]);
    }

    #[tokio::test]
    async fn test_watchlist_skips_failed_quotes() {
        let provider = StaticProvider::new(vec![
            ("GLOBAL_QUOTE:AAPL", Ok(json!({"Global Quote": {"01. symbol": "AAPL", "05. price": "190.1"}}))),
            ("GLOBAL_QUOTE:MSFT", Err(ApiError::new("Note: rate limit"))),
        ]);
        let pipeline = WidgetPipeline::new(provider.clone());
        let widget = WidgetDefinition::new(
            WidgetKind::Card(CardSettings {
                mode: CardMode::Watchlist,
                symbols: Some(vec!["aapl".to_string(), "msft".to_string()]),
            }),
            "",
        );

        let load = pipeline.load(&widget).await.unwrap();
        assert_eq!(
            load.data,
            WidgetData::Cards {
                records: vec![json!({"01. symbol": "AAPL", "05. price": "190.1"})]
            }
        );
        assert_eq!(provider.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_watchlist_fails_when_every_quote_fails() {
        let provider = StaticProvider::new(vec![(
            "GLOBAL_QUOTE",
            Err(ApiError::new("Invalid API call")),
        )]);
        let pipeline = WidgetPipeline::new(provider);
        let widget = WidgetDefinition::new(
            WidgetKind::Card(CardSettings::new(CardMode::Watchlist)),
            "",
        );

        let err = pipeline.load(&widget).await.unwrap_err();
        assert_eq!(err.message(), "Invalid API call");
    }

    #[tokio::test]
    async fn test_chart_points_are_chronological_and_capped() {
        let provider = StaticProvider::new(vec![("TIME_SERIES_WEEKLY:MSFT", Ok(series(40)))]);
        let pipeline = WidgetPipeline::new(provider.clone());
        let widget = WidgetDefinition::new(
            WidgetKind::Chart(ChartSettings {
                mode: ChartMode::Candle,
                interval: SeriesInterval::Weekly,
                symbol: "MSFT".to_string(),
            }),
            "",
        );

        let load = pipeline.load(&widget).await.unwrap();
        let points = match load.data {
            WidgetData::Chart { points } => points,
            other => panic!("Expected chart data, got {other:?}"),
        };

        assert_eq!(points.len(), CHART_POINTS);
        assert_eq!(points[0].open, 11.0);
        assert_eq!(points[CHART_POINTS - 1].open, 40.0);
        assert_eq!(points[CHART_POINTS - 1].close, 40.75);
        assert_eq!(points[0].volume, 1000.0);
        assert_eq!(provider.calls.lock().unwrap()[0]["outputsize"], "compact");
    }

    #[test]
    fn test_chart_points_invalid_format() {
        let err = chart_points(&json!({"Meta Data": {}})).unwrap_err();
        assert_eq!(err.to_string(), "Invalid data format");
        assert!(chart_points(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_chart_points_aliases_and_missing_values() {
        let payload = json!({"Monthly Adjusted": {
            "2024-02-01": {"Open": 10, "Close": "11"},
            "2024-01-01": {"Open": 9}
        }});
        let points = chart_points(&payload).unwrap();

        assert_eq!(points[0].date, "2024-01-01");
        assert_eq!(points[0].close, 0.0);
        assert_eq!(points[1].open, 10.0);
        assert_eq!(points[1].close, 11.0);
    }

    #[tokio::test]
    async fn test_preview_lists_all_fields() {
        let endpoint = "https://custom.test/list";
        let provider = StaticProvider::new(vec![(
            endpoint,
            Ok(json!([{"a": 1, "b": {"c": 2, "d": 3}, "e": 4, "f": 5, "g": 6, "h": 7}])),
        )]);
        let pipeline = WidgetPipeline::new(provider);
        let widget = WidgetDefinition::new(WidgetKind::Table, "");

        let preview = pipeline.preview(&widget, Some(endpoint), None).await.unwrap();
        assert_eq!(
            preview.available_fields,
            vec!["a", "b.c", "b.d", "e", "f", "g", "h"]
        );
    }

    #[tokio::test]
    async fn test_preview_chart_without_endpoint_uses_time_series() {
        let provider = StaticProvider::new(vec![("TIME_SERIES_DAILY:AAPL", Ok(series(2)))]);
        let pipeline = WidgetPipeline::new(provider);
        let widget = WidgetDefinition::new(WidgetKind::Chart(ChartSettings::default()), "");

        let preview = pipeline.preview(&widget, None, None).await.unwrap();
        assert_eq!(preview.available_fields[0], "Meta Data.1. Information");
    }

    #[test]
    fn test_view_keeps_stale_data_on_error() {
        let mut view = WidgetView::default();
        assert!(view.is_loading());

        let data = WidgetData::Cards {
            records: vec![json!({"symbol": "AAPL"})],
        };
        view.apply(Ok(data.clone()));
        assert_eq!(view.data, Some(data.clone()));
        assert!(view.updated_at.is_some());

        view.apply(Err(ApiError::new("Rate limit reached")));
        assert_eq!(view.data, Some(data));
        assert_eq!(view.error.as_deref(), Some("Rate limit reached"));
        assert!(!view.is_loading());

        view.apply(Ok(WidgetData::Cards { records: vec![] }));
        assert!(view.error.is_none());
    }

    #[test]
    fn test_card_summary_aliases() {
        let quote = json!({"01. symbol": "IBM", "05. price": "182.50", "09. change": "-1.20", "10. change percent": "-0.65%"});
        let summary = CardSummary::from_record(&quote, 0);
        assert_eq!(summary.symbol, "IBM");
        assert_eq!(summary.price, Some(json!("182.50")));
        assert_eq!(summary.change, json!("-1.20"));
        assert_eq!(summary.change_percent, "-0.65%");
        assert_eq!(summary.trend, Trend::Down);

        let mover = json!({"ticker": "AAA", "price": "1.5", "change_amount": "0.5", "change_percentage": "50%"});
        let summary = CardSummary::from_record(&mover, 0);
        assert_eq!(summary.symbol, "AAA");
        assert_eq!(summary.change_percent, "50%");
        assert_eq!(summary.trend, Trend::Up);

        let empty = CardSummary::from_record(&json!({}), 2);
        assert_eq!(empty.symbol, "Item 3");
        assert_eq!(empty.price, None);
        assert_eq!(empty.change, json!("0"));
        assert_eq!(empty.change_percent, "0%");
        assert_eq!(empty.trend, Trend::Up);

        let odd = CardSummary::from_record(&json!({"change": "n/a"}), 0);
        assert_eq!(odd.trend, Trend::Flat);
    }

    #[test]
    fn test_records_from_payload() {
        assert_eq!(records_from_payload(&json!([1, 2])).len(), 2);
        assert_eq!(records_from_payload(&json!({"a": {}, "b": {}})).len(), 2);
        assert!(records_from_payload(&json!("text")).is_empty());
    }
}
