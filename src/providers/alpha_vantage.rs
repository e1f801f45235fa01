use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::provider::{ApiError, ApiResult, FinanceProvider, Params};

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Top-level keys the provider uses to report errors inside a successful
/// HTTP response.
const IN_BAND_ERROR_KEYS: [&str; 3] = ["Error Message", "Note", "Information"];

/// Finds an error the provider embedded in an otherwise successful payload.
/// Any set marker counts; `null`, `false`, `0` and `""` do not.
pub fn in_band_error(payload: &Value) -> Option<String> {
    IN_BAND_ERROR_KEYS.iter().find_map(|key| match payload.get(*key)? {
        Value::Null | Value::Bool(false) => None,
        Value::String(message) if message.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    })
}

// AlphaVantageProvider implementation for FinanceProvider
pub struct AlphaVantageProvider {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl AlphaVantageProvider {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("finboard/0.1")
            .timeout(timeout)
            .build()?;
        Ok(AlphaVantageProvider {
            base_url: base_url.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            timeout,
            client,
        })
    }

    fn request_url(
        &self,
        endpoint: &str,
        params: &Params,
        api_key: Option<&str>,
    ) -> Result<Url, ApiError> {
        let mut url = Url::parse(endpoint)
            .map_err(|e| ApiError::new(format!("Invalid endpoint {endpoint}: {e}")))?;

        let api_key = api_key.or(self.api_key.as_deref());
        if !params.is_empty() || api_key.is_some() {
            let mut query = url.query_pairs_mut();
            query.extend_pairs(params.iter());
            if let Some(key) = api_key {
                query.append_pair("apikey", key);
            }
        }
        Ok(url)
    }

    fn transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::new(format!(
                "Request timed out after {}s",
                self.timeout.as_secs_f64()
            ))
        } else {
            ApiError::new(format!("Request error: {e}"))
        }
    }
}

#[async_trait]
impl FinanceProvider for AlphaVantageProvider {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(name = "FinanceFetch", skip(self, params, api_key), fields(endpoint = %endpoint))]
    async fn fetch(&self, endpoint: &str, params: &Params, api_key: Option<&str>) -> ApiResult {
        let url = self.request_url(endpoint, params, api_key)?;
        debug!(?params, "Requesting finance data");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| format!("HTTP error: {status}"));
            warn!(%status, "Finance API returned an error status");
            return Err(ApiError::new(message));
        }

        let payload: Value = serde_json::from_str(&text)
            .map_err(|e| ApiError::new(format!("Failed to parse JSON response: {e}")))?;

        if let Some(message) = in_band_error(&payload) {
            warn!(%message, "Finance API reported an error in the response body");
            return Err(ApiError::new(message));
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn provider(server: &MockServer, api_key: Option<&str>) -> AlphaVantageProvider {
        AlphaVantageProvider::new(
            &format!("{}/query", server.uri()),
            api_key.map(str::to_string),
            DEFAULT_TIMEOUT,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_successful_fetch_sends_params_and_default_key() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("function", "GLOBAL_QUOTE"))
            .and(query_param("symbol", "AAPL"))
            .and(query_param("apikey", "default-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"Global Quote": {"01. symbol": "AAPL"}})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server, Some("default-key"));
        let result = provider
            .fetch(
                provider.base_url(),
                &params(&[("function", "GLOBAL_QUOTE"), ("symbol", "AAPL")]),
                None,
            )
            .await
            .unwrap();

        assert_eq!(result["Global Quote"]["01. symbol"], "AAPL");
    }

    #[tokio::test]
    async fn test_widget_key_overrides_default_key() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/query"))
            .and(query_param("apikey", "widget-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server, Some("default-key"));
        let result = provider
            .fetch(provider.base_url(), &Params::new(), Some("widget-key"))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_no_key_sends_no_apikey_param() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/custom"))
            .and(query_param_is_missing("apikey"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"a": 1}])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server, None);
        let result = provider
            .fetch(&format!("{}/custom", mock_server.uri()), &Params::new(), None)
            .await
            .unwrap();
        assert_eq!(result, json!([{"a": 1}]));
    }

    #[tokio::test]
    async fn test_in_band_error_message() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Error Message": "Invalid API call. Please retry or visit the documentation."
            })))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server, None);
        let result = provider
            .fetch(provider.base_url(), &Params::new(), None)
            .await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "Invalid API call. Please retry or visit the documentation."
        );
    }

    #[tokio::test]
    async fn test_in_band_rate_limit_note() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."
            })))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server, None);
        let err = provider
            .fetch(provider.base_url(), &Params::new(), None)
            .await
            .unwrap_err();
        assert!(err.message().starts_with("Thank you for using Alpha Vantage!"));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server, None);
        let err = provider
            .fetch(provider.base_url(), &Params::new(), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP error: 500 Internal Server Error");
    }

    #[tokio::test]
    async fn test_http_error_uses_body_message() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({"message": "Forbidden key"})),
            )
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server, None);
        let err = provider
            .fetch(provider.base_url(), &Params::new(), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Forbidden key");
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&mock_server)
            .await;

        let provider = provider(&mock_server, None);
        let err = provider
            .fetch(provider.base_url(), &Params::new(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to parse JSON response"));
    }

    #[tokio::test]
    async fn test_timeout_is_reported_as_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"late": true}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let provider = AlphaVantageProvider::new(
            &format!("{}/query", mock_server.uri()),
            None,
            Duration::from_millis(50),
        )
        .unwrap();
        let err = provider
            .fetch(provider.base_url(), &Params::new(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Request timed out"));
    }

    #[tokio::test]
    async fn test_invalid_endpoint() {
        let provider = AlphaVantageProvider::new("not a url", None, DEFAULT_TIMEOUT).unwrap();
        let err = provider
            .fetch("not a url", &Params::new(), None)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid endpoint not a url"));
    }

    #[test]
    fn test_in_band_error_detection() {
        assert_eq!(
            in_band_error(&json!({"Information": "Rate limit reached"})),
            Some("Rate limit reached".to_string())
        );
        assert_eq!(in_band_error(&json!({"Note": ""})), None);
        assert_eq!(in_band_error(&json!({"Meta Data": {"1. Information": "x"}})), None);
        assert_eq!(in_band_error(&json!([1, 2])), None);
    }

    #[test]
    fn test_in_band_error_accepts_any_set_marker() {
        assert_eq!(
            in_band_error(&json!({"Error Message": {"code": 42}})),
            Some(r#"{"code":42}"#.to_string())
        );
        assert_eq!(in_band_error(&json!({"Note": true})), Some("true".to_string()));
        assert_eq!(in_band_error(&json!({"Note": 5})), Some("5".to_string()));
        assert_eq!(
            in_band_error(&json!({"Note": null, "Information": ["slow down"]})),
            Some(r#"["slow down"]"#.to_string())
        );
        assert_eq!(
            in_band_error(&json!({"Note": false, "Error Message": 0, "Information": null})),
            None
        );
    }
}
