use crate::core::cache::Cache;
use crate::core::provider::{ApiResult, FinanceProvider, Params};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

pub type ResponseCache = Cache<String, Value>;

/// Cache key for a request: the endpoint plus its sorted parameters.
/// Credentials are not part of the request identity.
pub fn cache_key(endpoint: &str, params: &Params) -> String {
    let params = serde_json::to_string(params).unwrap_or_default();
    format!("{endpoint}:{params}")
}

// Caching for FinanceProvider
pub struct CachingProvider<T: FinanceProvider> {
    inner: T,
    cache: Arc<ResponseCache>,
}

impl<T: FinanceProvider> CachingProvider<T> {
    pub fn new(inner: T, cache: Arc<ResponseCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }
}

#[async_trait]
impl<T: FinanceProvider> FinanceProvider for CachingProvider<T> {
    fn base_url(&self) -> &str {
        self.inner.base_url()
    }

    async fn fetch(&self, endpoint: &str, params: &Params, api_key: Option<&str>) -> ApiResult {
        let key = cache_key(endpoint, params);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        // Concurrent misses for the same key may both reach the provider;
        // the later write wins.
        let payload = self.inner.fetch(endpoint, params, api_key).await?;
        debug!("Caching response for {}", key);
        self.cache.put(key, payload.clone()).await;
        Ok(payload)
    }
}
