// src/api/mod.rs
use crate::types::{HarvestError, PageRequest, QueryMode};
use async_trait::async_trait;
use log::debug;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

mod export;
mod normalize;

pub use export::ExportJobClient;
pub use normalize::{normalize, normalize_envelope};

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    /// Decode a raw body, keeping it as text when it is not JSON.
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text),
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(text) => serde_json::from_str(&text).ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub status_text: String,
    pub body: ResponseBody,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs exactly one HTTP exchange. No retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, HarvestError>;
}

/// Source of raw result pages for the harvest loop.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Value, HarvestError>;
}

/// RapidDNS endpoints on top of a [`Transport`].
pub struct RapidDnsClient<T: Transport> {
    transport: T,
    base_url: String,
    api_keys: Vec<String>,
}

impl<T: Transport> RapidDnsClient<T> {
    pub fn new(transport: T, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_keys: Vec::new(),
        }
    }

    pub fn with_api_keys(mut self, keys: Vec<String>) -> Self {
        self.api_keys = keys.into_iter().filter(|k| !k.trim().is_empty()).collect();
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_keys.is_empty()
    }

    fn get_random_api_key(&self) -> Option<&String> {
        if self.api_keys.is_empty() {
            None
        } else {
            use rand::seq::SliceRandom;
            self.api_keys.choose(&mut rand::thread_rng())
        }
    }

    /// Base URL joined with already-encoded path segments.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, HarvestError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| HarvestError::ConfigError(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| HarvestError::ConfigError(format!("Base URL cannot have a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn headers(&self, json_body: bool) -> Vec<(String, String)> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if json_body {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        if let Some(key) = self.get_random_api_key() {
            headers.push(("X-API-KEY".to_string(), key.clone()));
        }
        headers
    }

    pub(crate) async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HarvestError> {
        debug!("{} {}", request.method, request.url);
        self.transport.execute(request).await
    }

    /// Map 401/403 and other non-2xx statuses onto errors.
    pub(crate) fn check_status(&self, response: &ApiResponse) -> Result<(), HarvestError> {
        if response.is_success() {
            return Ok(());
        }
        match response.status {
            401 | 403 => Err(HarvestError::AuthError(if self.has_api_key() {
                "Invalid API key or plan limit reached".to_string()
            } else {
                "API key required for this request, add one to the configuration".to_string()
            })),
            status => Err(HarvestError::RequestFailed {
                status,
                message: response.status_text.clone(),
            }),
        }
    }

    /// GET with status check, returning the decoded body.
    pub(crate) async fn get_json(&self, url: Url) -> Result<Value, HarvestError> {
        let response = self
            .send(ApiRequest {
                method: Method::GET,
                url,
                body: None,
                headers: self.headers(false),
            })
            .await?;
        self.check_status(&response)?;
        // Undecodable bodies become null, which no envelope matches.
        Ok(response.body.into_json().unwrap_or(Value::Null))
    }

    pub fn page_url(&self, request: &PageRequest) -> Result<Url, HarvestError> {
        let mut url = match request.mode {
            QueryMode::Search => self.endpoint(&["search", request.query.as_str()])?,
            QueryMode::Advanced => self.endpoint(&["search", "query", request.query.as_str()])?,
        };
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("page", &request.page.to_string());
            pairs.append_pair("pagesize", &request.page_size.to_string());
            if request.mode == QueryMode::Search {
                if let Some(search_type) = request.type_filter.as_deref().filter(|t| !t.is_empty()) {
                    pairs.append_pair("search_type", search_type);
                }
            }
        }
        Ok(url)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for Arc<F> {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Value, HarvestError> {
        (**self).fetch_page(request).await
    }
}

#[async_trait]
impl<T: Transport> PageFetcher for RapidDnsClient<T> {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Value, HarvestError> {
        let url = self.page_url(request)?;
        self.get_json(url).await
    }
}
