//! Finance data client abstractions and core types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Query parameters of an upstream request. Sorted, so two requests with the
/// same parameters compare equal regardless of insertion order.
pub type Params = BTreeMap<String, String>;

/// Uniform failure shape of every fetch: transport errors, HTTP errors and
/// provider errors embedded in a successful response all carry one message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type ApiResult = Result<Value, ApiError>;

#[async_trait]
pub trait FinanceProvider: Send + Sync {
    /// Default endpoint used by the typed requests in [`FinanceApi`].
    fn base_url(&self) -> &str;

    /// Fetches `endpoint` with `params`. `api_key` overrides the provider's
    /// default credential.
    async fn fetch(&self, endpoint: &str, params: &Params, api_key: Option<&str>) -> ApiResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesInterval {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl SeriesInterval {
    pub fn function_name(&self) -> &'static str {
        match self {
            SeriesInterval::Daily => "TIME_SERIES_DAILY",
            SeriesInterval::Weekly => "TIME_SERIES_WEEKLY",
            SeriesInterval::Monthly => "TIME_SERIES_MONTHLY",
        }
    }
}

impl Display for SeriesInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SeriesInterval::Daily => "daily",
                SeriesInterval::Weekly => "weekly",
                SeriesInterval::Monthly => "monthly",
            }
        )
    }
}

impl FromStr for SeriesInterval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(SeriesInterval::Daily),
            "weekly" => Ok(SeriesInterval::Weekly),
            "monthly" => Ok(SeriesInterval::Monthly),
            _ => Err(anyhow::anyhow!("Invalid series interval: {}", s)),
        }
    }
}

/// Typed requests against a [`FinanceProvider`], bound to one credential.
///
/// Each method only shapes parameters; caching and error handling belong to
/// the provider.
pub struct FinanceApi<'a> {
    provider: &'a dyn FinanceProvider,
    api_key: Option<&'a str>,
}

impl<'a> FinanceApi<'a> {
    pub fn new(provider: &'a dyn FinanceProvider, api_key: Option<&'a str>) -> Self {
        Self { provider, api_key }
    }

    pub async fn fetch(&self, endpoint: &str, params: &Params) -> ApiResult {
        self.provider.fetch(endpoint, params, self.api_key).await
    }

    async fn call(&self, function: &str, extra: &[(&str, String)]) -> ApiResult {
        let mut params = Params::new();
        params.insert("function".to_string(), function.to_string());
        for (key, value) in extra {
            params.insert(key.to_string(), value.clone());
        }
        self.fetch(self.provider.base_url(), &params).await
    }

    pub async fn quote(&self, symbol: &str) -> ApiResult {
        self.call("GLOBAL_QUOTE", &[("symbol", symbol.to_uppercase())])
            .await
    }

    pub async fn time_series(&self, symbol: &str, interval: SeriesInterval) -> ApiResult {
        self.call(
            interval.function_name(),
            &[
                ("symbol", symbol.to_uppercase()),
                ("outputsize", "compact".to_string()),
            ],
        )
        .await
    }

    pub async fn top_gainers_losers(&self) -> ApiResult {
        self.call("TOP_GAINERS_LOSERS", &[]).await
    }

    pub async fn search_symbol(&self, keywords: &str) -> ApiResult {
        self.call("SYMBOL_SEARCH", &[("keywords", keywords.to_uppercase())])
            .await
    }

    pub async fn company_overview(&self, symbol: &str) -> ApiResult {
        self.call("OVERVIEW", &[("symbol", symbol.to_uppercase())])
            .await
    }
}
