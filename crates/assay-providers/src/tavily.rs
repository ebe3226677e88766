//! Tavily web search.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use assay_core::{Error, ProviderFault, SearchConfig, SearchProvider, SearchQuery, SearchResult};

use crate::transport_fault;

pub struct TavilySearch {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TavilySearch {
    /// Fails with a configuration error when the credential is missing.
    pub fn new(config: &SearchConfig) -> Result<Self, Error> {
        let api_key = config.require_api_key()?.to_string();
        let client = Client::builder()
            .user_agent(concat!("assay/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn build_request<'a>(&self, query: &'a SearchQuery) -> TavilySearchRequest<'a> {
        TavilySearchRequest {
            query: &query.query,
            search_depth: query.depth.as_str(),
            max_results: query.max_results,
        }
    }

    fn parse_response(&self, body: &str, max_results: usize) -> Result<Vec<SearchResult>, ProviderFault> {
        let response: TavilySearchResponse =
            serde_json::from_str(body).map_err(|e| ProviderFault::malformed(e.to_string()))?;

        Ok(response
            .results
            .into_iter()
            .take(max_results)
            .map(|r| SearchResult {
                title: r.title,
                content: r.content,
                url: r.url,
                score: r.score,
            })
            .collect())
    }

    fn parse_error(&self, status: u16, body: &str) -> ProviderFault {
        #[derive(Deserialize)]
        struct ErrorResponse {
            detail: ErrorDetail,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            error: String,
        }

        let message = serde_json::from_str::<ErrorResponse>(body)
            .map(|e| e.detail.error)
            .unwrap_or_else(|_| body.to_string());
        ProviderFault::from_status(status, message)
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, ProviderFault> {
        let api_request = self.build_request(query);
        debug!("Tavily request: {:?}", api_request);

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(transport_fault)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_fault)?;
        if !status.is_success() {
            return Err(self.parse_error(status.as_u16(), &body));
        }

        let results = self.parse_response(&body, query.max_results)?;
        debug!(count = results.len(), "Tavily results");
        Ok(results)
    }
}

// Tavily API types

#[derive(Debug, Serialize)]
struct TavilySearchRequest<'a> {
    query: &'a str,
    search_depth: &'static str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilySearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    #[serde(default)]
    content: String,
    url: Option<String>,
    score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assay_core::SearchDepth;

    fn search() -> TavilySearch {
        TavilySearch::new(&SearchConfig::default().with_api_key("tvly-test")).unwrap()
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let err = TavilySearch::new(&SearchConfig::default()).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("TAVILY_API_KEY"));
    }

    #[test]
    fn test_provider_creation() {
        let config = SearchConfig {
            base_url: "http://localhost:8080/".to_string(),
            ..SearchConfig::default().with_api_key("k")
        };
        let provider = TavilySearch::new(&config).unwrap();
        assert_eq!(provider.name(), "tavily");
        assert_eq!(provider.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_build_request() {
        let query = SearchQuery::new("白银 价格走势");
        let body = serde_json::to_value(search().build_request(&query)).unwrap();

        assert_eq!(body["query"], "白银 价格走势");
        assert_eq!(body["search_depth"], "advanced");
        assert_eq!(body["max_results"], 5);
        assert!(body.get("api_key").is_none());

        let basic = SearchQuery::new("x").with_depth(SearchDepth::Basic);
        let body = serde_json::to_value(search().build_request(&basic)).unwrap();
        assert_eq!(body["search_depth"], "basic");
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "query": "q",
            "answer": null,
            "response_time": 1.2,
            "results": [
                {"title": "A", "url": "https://a.example", "content": "alpha", "score": 0.91, "raw_content": null},
                {"title": "B", "url": "https://b.example", "content": "beta", "score": 0.5}
            ]
        }"#;
        let results = search().parse_response(body, 5).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "A");
        assert_eq!(results[0].content, "alpha");
        assert_eq!(results[0].url.as_deref(), Some("https://a.example"));
        assert_eq!(results[1].score, Some(0.5));
    }

    #[test]
    fn test_parse_response_caps_results() {
        let items: Vec<String> = (0..8)
            .map(|i| format!(r#"{{"title": "t{i}", "content": "c{i}"}}"#))
            .collect();
        let body = format!(r#"{{"results": [{}]}}"#, items.join(","));
        let results = search().parse_response(&body, 5).unwrap();

        assert_eq!(results.len(), 5);
        assert_eq!(results[4].title, "t4");
    }

    #[test]
    fn test_parse_response_malformed() {
        let fault = search().parse_response("<html>bad gateway</html>", 5).unwrap_err();
        assert!(matches!(fault, ProviderFault::Malformed(_)));
    }

    #[test]
    fn test_parse_error() {
        let provider = search();
        let fault = provider.parse_error(401, r#"{"detail": {"error": "Unauthorized: missing or invalid API key."}}"#);
        assert_eq!(
            fault,
            ProviderFault::Auth("Unauthorized: missing or invalid API key.".to_string())
        );

        assert!(matches!(provider.parse_error(429, "{}"), ProviderFault::RateLimit(_)));
        assert_eq!(
            provider.parse_error(500, "oops"),
            ProviderFault::api(500, "oops")
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_fault() {
        let config = SearchConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 5,
            ..SearchConfig::default().with_api_key("tvly-test")
        };
        let provider = TavilySearch::new(&config).unwrap();
        let fault = provider.search(&SearchQuery::new("鲜花店")).await.unwrap_err();
        assert!(matches!(fault, ProviderFault::Network(_) | ProviderFault::Timeout(_)));
    }

    #[tokio::test]
    async fn test_silent_server_is_timeout_fault() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Hold the connection open without ever answering.
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let config = SearchConfig {
            base_url: format!("http://{}", addr),
            timeout_secs: 1,
            ..SearchConfig::default().with_api_key("tvly-test")
        };
        let provider = TavilySearch::new(&config).unwrap();
        let fault = provider.search(&SearchQuery::new("鲜花店")).await.unwrap_err();
        assert!(matches!(fault, ProviderFault::Timeout(_)), "got {:?}", fault);
    }
}
