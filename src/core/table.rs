//! Search, column filters, sorting and pagination over fetched rows.
//!
//! Stages run in a fixed order: search, then column filters, then sort. Each
//! stage consumes the output of the previous one.

use crate::core::accessor::{numeric_value, resolve, to_plain_string};
use icu_collator::options::CollatorOptions;
use icu_collator::{Collator, CollatorBorrowed};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// One page of transformed rows.
#[derive(Debug)]
pub struct TablePage<'a> {
    pub rows: Vec<&'a Value>,
    pub current_page: usize,
    pub total_pages: usize,
    pub matching_rows: usize,
}

/// Interactive view state of a table widget.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    search: String,
    column_filters: BTreeMap<String, String>,
    sort: Option<SortSpec>,
    current_page: usize,
    page_size: usize,
}

impl Default for TableView {
    fn default() -> Self {
        Self {
            search: String::new(),
            column_filters: BTreeMap::new(),
            sort: None,
            current_page: 1,
            page_size: PAGE_SIZE,
        }
    }
}

impl TableView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    pub fn column_filter(&self, field: &str) -> Option<&str> {
        self.column_filters.get(field).map(String::as_str)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.current_page = 1;
    }

    /// Sets the filter for one column. An empty value disables the filter.
    pub fn set_column_filter(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.column_filters.remove(field);
        } else {
            self.column_filters
                .insert(field.to_string(), value.to_string());
        }
        self.current_page = 1;
    }

    /// Clicking the sorted column flips its direction; any other column
    /// becomes the new ascending sort. The current page is kept.
    pub fn toggle_sort(&mut self, field: &str) {
        self.sort = match self.sort.take() {
            Some(spec) if spec.field == field => Some(SortSpec {
                direction: spec.direction.flipped(),
                ..spec
            }),
            _ => Some(SortSpec {
                field: field.to_string(),
                direction: SortDirection::Ascending,
            }),
        };
    }

    pub fn set_sort(&mut self, field: &str, direction: SortDirection) {
        self.sort = Some(SortSpec {
            field: field.to_string(),
            direction,
        });
    }

    /// Resets search, filters, sort and pagination.
    pub fn clear(&mut self) {
        self.search.clear();
        self.column_filters.clear();
        self.sort = None;
        self.current_page = 1;
    }

    pub fn has_criteria(&self) -> bool {
        !self.search.is_empty() || !self.column_filters.is_empty() || self.sort.is_some()
    }

    /// Jumps to `page`, clamped to the pages available for `row_count` rows.
    pub fn set_page(&mut self, page: usize, row_count: usize) {
        self.current_page = page.clamp(1, self.total_pages(row_count).max(1));
    }

    pub fn next_page(&mut self, row_count: usize) {
        self.set_page(self.current_page + 1, row_count);
    }

    pub fn prev_page(&mut self, row_count: usize) {
        self.set_page(self.current_page.saturating_sub(1), row_count);
    }

    pub fn total_pages(&self, row_count: usize) -> usize {
        row_count.div_ceil(self.page_size)
    }

    /// Runs search, column filters and sort over `rows`.
    pub fn apply<'a>(&self, rows: &'a [Value], fields: &[String]) -> Vec<&'a Value> {
        let mut result: Vec<&Value> = rows.iter().collect();

        if !self.search.is_empty() {
            let needle = self.search.to_lowercase();
            result.retain(|row| {
                fields
                    .iter()
                    .any(|field| cell_text(row, field).contains(&needle))
            });
        }

        for (field, filter) in &self.column_filters {
            let needle = filter.to_lowercase();
            result.retain(|row| cell_text(row, field).contains(&needle));
        }

        if let Some(spec) = &self.sort {
            let collator = Collator::try_new(Default::default(), CollatorOptions::default()).ok();
            let mut keyed: Vec<(SortKey, &Value)> = result
                .into_iter()
                .map(|row| (SortKey::of(resolve(row, &spec.field)), row))
                .collect();
            keyed.sort_by(|(a, _), (b, _)| {
                let ordering = a.compare(b, collator.as_ref());
                match spec.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
            result = keyed.into_iter().map(|(_, row)| row).collect();
        }

        result
    }

    /// Transforms `rows` and slices out the current page.
    pub fn page<'a>(&self, rows: &'a [Value], fields: &[String]) -> TablePage<'a> {
        let matching = self.apply(rows, fields);
        let total_pages = self.total_pages(matching.len());
        let start = (self.current_page - 1) * self.page_size;

        TablePage {
            matching_rows: matching.len(),
            rows: matching
                .into_iter()
                .skip(start)
                .take(self.page_size)
                .collect(),
            current_page: self.current_page,
            total_pages,
        }
    }
}

fn cell_text(row: &Value, field: &str) -> String {
    to_plain_string(resolve(row, field)).to_lowercase()
}

/// Sort key of one cell. Numbers order before text so that columns mixing
/// both still sort totally.
#[derive(Debug)]
enum SortKey {
    Number(f64),
    Text(String),
}

impl SortKey {
    fn of(cell: Option<&Value>) -> Self {
        match numeric_value(cell) {
            Some(n) => SortKey::Number(n),
            None => SortKey::Text(to_plain_string(cell).to_lowercase()),
        }
    }

    fn compare(&self, other: &Self, collator: Option<&CollatorBorrowed<'_>>) -> Ordering {
        match (self, other) {
            (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
            (SortKey::Text(x), SortKey::Text(y)) => match collator {
                Some(collator) => collator.compare(x, y),
                None => x.cmp(y),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Value> {
        vec![
            json!({"ticker": "AAPL", "price": "189.5", "meta": {"sector": "Tech"}}),
            json!({"ticker": "xom", "price": "101.25", "meta": {"sector": "Energy"}}),
            json!({"ticker": "MSFT", "price": "412", "meta": {"sector": "Tech"}}),
            json!({"ticker": "GOOGL", "price": "9.99", "meta": {"sector": "Tech"}}),
            json!({"ticker": "ABC", "price": "n/a", "meta": null}),
        ]
    }

    fn fields() -> Vec<String> {
        vec!["ticker".to_string(), "price".to_string(), "meta.sector".to_string()]
    }

    fn tickers(rows: &[&Value]) -> Vec<String> {
        rows.iter()
            .map(|row| row["ticker"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_empty_search_is_pass_through() {
        let data = rows();
        let mut view = TableView::new();
        view.set_search("");

        assert_eq!(view.apply(&data, &fields()).len(), data.len());
    }

    #[test]
    fn test_search_matches_any_displayed_field_case_insensitive() {
        let data = rows();
        let mut view = TableView::new();

        view.set_search("TECH");
        assert_eq!(tickers(&view.apply(&data, &fields())), vec!["AAPL", "MSFT", "GOOGL"]);

        view.set_search("XO");
        assert_eq!(tickers(&view.apply(&data, &fields())), vec!["xom"]);

        // Fields that are not displayed are not searched
        view.set_search("tech");
        assert!(view.apply(&data, &["ticker".to_string()]).is_empty());
    }

    #[test]
    fn test_column_filters_are_anded() {
        let data = rows();
        let mut view = TableView::new();

        view.set_column_filter("meta.sector", "tech");
        view.set_column_filter("ticker", "o");
        assert_eq!(tickers(&view.apply(&data, &fields())), vec!["GOOGL"]);
    }

    #[test]
    fn test_clearing_filter_restores_row_count() {
        let data = rows();
        let mut view = TableView::new();
        let before = view.apply(&data, &fields()).len();

        view.set_column_filter("meta.sector", "energy");
        assert_eq!(view.apply(&data, &fields()).len(), 1);

        view.set_column_filter("meta.sector", "");
        assert_eq!(view.apply(&data, &fields()).len(), before);
    }

    #[test]
    fn test_sort_numeric_when_both_sides_parse() {
        let data: Vec<Value> = rows().into_iter().take(4).collect();
        let mut view = TableView::new();

        view.toggle_sort("price");
        assert_eq!(
            tickers(&view.apply(&data, &fields())),
            vec!["GOOGL", "xom", "AAPL", "MSFT"]
        );
    }

    #[test]
    fn test_sort_strings_case_insensitive() {
        let data = rows();
        let mut view = TableView::new();

        view.set_sort("ticker", SortDirection::Ascending);
        assert_eq!(
            tickers(&view.apply(&data, &fields())),
            vec!["AAPL", "ABC", "GOOGL", "MSFT", "xom"]
        );
    }

    #[test]
    fn test_sort_mixed_column_puts_numbers_first() {
        let values = ["9", "10", "12.5%", "5x", "100", "3", "2a", "b", "1e3", "0"];
        let data: Vec<Value> = (0..64)
            .map(|i| json!({"v": values[(i * 7) % values.len()]}))
            .collect();
        let fields = vec!["v".to_string()];
        let mut view = TableView::new();

        view.toggle_sort("v");
        let sorted: Vec<&str> = view
            .apply(&data, &fields)
            .iter()
            .map(|row| row["v"].as_str().unwrap())
            .collect();
        let mut distinct = sorted.clone();
        distinct.dedup();
        assert_eq!(
            distinct,
            vec!["0", "3", "9", "10", "100", "1e3", "12.5%", "2a", "5x", "b"]
        );

        view.toggle_sort("v");
        let descending: Vec<&str> = view
            .apply(&data, &fields)
            .iter()
            .map(|row| row["v"].as_str().unwrap())
            .collect();
        assert_eq!(descending.first(), Some(&"b"));
        assert_eq!(descending.last(), Some(&"0"));
    }

    #[test]
    fn test_sort_text_by_locale_order() {
        let data: Vec<Value> = ["zebra", "éclair", "Apple", "~x", "dog"]
            .iter()
            .map(|name| json!({"name": name}))
            .collect();
        let fields = vec!["name".to_string()];
        let mut view = TableView::new();

        view.toggle_sort("name");
        let sorted: Vec<&str> = view
            .apply(&data, &fields)
            .iter()
            .map(|row| row["name"].as_str().unwrap())
            .collect();
        assert_eq!(sorted, vec!["~x", "Apple", "dog", "éclair", "zebra"]);
    }

    #[test]
    fn test_sort_descending_reverses_ascending() {
        let data = rows();
        let mut view = TableView::new();

        view.toggle_sort("ticker");
        let ascending = tickers(&view.apply(&data, &fields()));
        view.toggle_sort("ticker");
        assert_eq!(view.sort().unwrap().direction, SortDirection::Descending);
        let mut descending = tickers(&view.apply(&data, &fields()));

        descending.reverse();
        assert_eq!(ascending, descending);
    }

    #[test]
    fn test_toggle_sort_on_new_field_starts_ascending() {
        let mut view = TableView::new();
        view.toggle_sort("price");
        view.toggle_sort("price");
        view.toggle_sort("ticker");

        assert_eq!(
            view.sort(),
            Some(&SortSpec {
                field: "ticker".to_string(),
                direction: SortDirection::Ascending
            })
        );
    }

    #[test]
    fn test_search_and_filter_reset_page_but_sort_does_not() {
        let data: Vec<Value> = (0..35).map(|i| json!({"n": i})).collect();
        let mut view = TableView::new();

        view.set_page(3, data.len());
        assert_eq!(view.current_page(), 3);
        view.toggle_sort("n");
        assert_eq!(view.current_page(), 3);

        view.set_search("1");
        assert_eq!(view.current_page(), 1);

        view.set_page(2, data.len());
        view.set_column_filter("n", "2");
        assert_eq!(view.current_page(), 1);
    }

    #[test]
    fn test_pagination() {
        let data: Vec<Value> = (0..23).map(|i| json!({"n": i})).collect();
        let fields = vec!["n".to_string()];
        let mut view = TableView::new();

        let page = view.page(&data, &fields);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.rows.len(), PAGE_SIZE);
        assert_eq!(page.matching_rows, 23);

        view.next_page(data.len());
        view.next_page(data.len());
        view.next_page(data.len());
        let page = view.page(&data, &fields);
        assert_eq!(page.current_page, 3);
        assert_eq!(page.rows.len(), 3);
        assert_eq!(page.rows[0]["n"], 20);

        view.prev_page(data.len());
        assert_eq!(view.current_page(), 2);
        view.set_page(0, data.len());
        assert_eq!(view.current_page(), 1);
    }

    #[test]
    fn test_page_of_empty_rows() {
        let view = TableView::new();
        let page = view.page(&[], &["n".to_string()]);

        assert_eq!(page.total_pages, 0);
        assert!(page.rows.is_empty());
        assert_eq!(page.current_page, 1);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut view = TableView::new();
        view.set_search("a");
        view.set_column_filter("ticker", "b");
        view.toggle_sort("ticker");
        assert!(view.has_criteria());

        view.clear();
        assert!(!view.has_criteria());
        assert_eq!(view, TableView::new());
    }
}
