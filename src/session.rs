// src/session.rs
use crate::api::{ApiRequest, ApiResponse, ResponseBody, Transport};
use crate::types::{Config, HarvestError};
use async_trait::async_trait;
use governor::{Jitter, Quota};
use log::debug;
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// reqwest-backed [`Transport`].
#[derive(Clone)]
pub struct Session {
    pub client: Client,
    url_proxy: Option<String>,
    rate_limiter: Option<Arc<governor::DefaultDirectRateLimiter>>,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        // Build HTTP client
        let mut client_builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10);

        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| HarvestError::ConfigError(format!("Invalid proxy URL: {}", e)))?;
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder
            .build()
            .map_err(|e| HarvestError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let rate_limiter = config
            .rate_limit
            .and_then(NonZeroU32::new)
            .map(|limit| Arc::new(governor::RateLimiter::direct(Quota::per_second(limit))));

        let url_proxy = if config.use_url_proxy && !config.url_proxy.is_empty() {
            Some(config.url_proxy.clone())
        } else {
            None
        };

        Ok(Session {
            client,
            url_proxy,
            rate_limiter,
        })
    }

    /// The URL actually requested: the target itself, or the encoded target
    /// appended to the prefix proxy.
    pub fn effective_url(&self, target: &str) -> String {
        match &self.url_proxy {
            Some(prefix) => format!("{}{}", prefix, urlencoding::encode(target)),
            None => target.to_string(),
        }
    }

    async fn wait_for_rate_limit(&self) {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50))).await;
        }
    }
}

#[async_trait]
impl Transport for Session {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, HarvestError> {
        self.wait_for_rate_limit().await;

        let url = self.effective_url(request.url.as_str());
        debug!("Sending {} {}", request.method, url);

        let mut builder = self.client.request(request.method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HarvestError::NetworkError(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HarvestError::NetworkError(e.to_string()))?;

        Ok(ApiResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: ResponseBody::from_text(text),
        })
    }
}
