// src/api/export.rs
use crate::api::{normalize_envelope, ApiRequest, RapidDnsClient, Transport};
use crate::types::{ExportJob, ExportStatus, HarvestError};
use log::{info, warn};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct ExportRequest<'a> {
    query_type: &'a str,
    query_input: &'a str,
    max_results: u64,
    compress: bool,
}

/// Bulk export jobs: one submit call, then caller-driven polling.
pub struct ExportJobClient<'a, T: Transport> {
    client: &'a RapidDnsClient<T>,
}

impl<'a, T: Transport> ExportJobClient<'a, T> {
    pub fn new(client: &'a RapidDnsClient<T>) -> Self {
        Self { client }
    }

    pub async fn submit(&self, query_type: &str, query_input: &str) -> Result<String, HarvestError> {
        let query_input = query_input.trim();
        if query_input.is_empty() {
            return Err(HarvestError::EmptyQuery("export input is empty".to_string()));
        }
        if !self.client.has_api_key() {
            warn!("Submitting export without an API key, the service usually requires one");
        }

        let body = serde_json::to_value(ExportRequest {
            query_type,
            query_input,
            max_results: 0,
            compress: true,
        })
        .map_err(|e| HarvestError::Unknown(e.into()))?;

        let response = self
            .client
            .send(ApiRequest {
                method: Method::POST,
                url: self.client.endpoint(&["export-data"])?,
                body: Some(body),
                headers: self.client.headers(true),
            })
            .await?;

        if matches!(response.status, 401 | 403) {
            self.client.check_status(&response)?;
        }

        let status_text = response.status_text.clone();
        let raw = response.body.into_json().unwrap_or(Value::Null);
        let export_id = normalize_envelope(&raw).and_then(|container| match container.get("export_id") {
            Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        });

        match export_id {
            Some(id) => {
                info!("Export started: {}", id);
                Ok(id)
            }
            None => {
                let message = server_message(&raw).unwrap_or_else(|| {
                    if status_text.is_empty() {
                        "Unknown error".to_string()
                    } else {
                        status_text
                    }
                });
                Err(HarvestError::RemoteError(format!("Failed to start export: {}", message)))
            }
        }
    }

    pub async fn poll(&self, job_id: &str) -> Result<ExportJob, HarvestError> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(HarvestError::EmptyQuery("export id is empty".to_string()));
        }

        let raw = self.client.get_json(self.client.endpoint(&["export-data", job_id])?).await?;
        let data = normalize_envelope(&raw).ok_or_else(|| {
            HarvestError::RemoteError(format!(
                "No status data for export {}{}",
                job_id,
                server_message(&raw).map(|m| format!(": {}", m)).unwrap_or_default()
            ))
        })?;

        let status = ExportStatus::parse(data.get("status").and_then(Value::as_str).unwrap_or_default());
        let progress_percent = data
            .get("progress_percent")
            .and_then(|p| p.as_f64().or_else(|| p.as_str().and_then(|s| s.parse().ok())))
            .map(|p| p.clamp(0.0, 100.0) as u8)
            .unwrap_or(0);
        let download_url = if status == ExportStatus::Completed {
            data.get("download_url").and_then(Value::as_str).map(str::to_string)
        } else {
            None
        };

        Ok(ExportJob {
            id: job_id.to_string(),
            status,
            progress_percent,
            download_url,
        })
    }
}

fn server_message(raw: &Value) -> Option<String> {
    ["msg", "message"]
        .iter()
        .find_map(|field| raw.get(*field).and_then(Value::as_str))
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedTransport;
    use serde_json::json;

    fn client(transport: ScriptedTransport) -> RapidDnsClient<ScriptedTransport> {
        RapidDnsClient::new(transport, "https://rapiddns.io/api").with_api_keys(vec!["key".to_string()])
    }

    #[tokio::test]
    async fn test_submit_decodes_string_data() {
        let transport = ScriptedTransport::default();
        transport.push_json(200, json!({"data": "{\"export_id\":\"abc123\"}"}));
        let client = client(transport);

        let id = ExportJobClient::new(&client).submit("subdomain", "example.com").await.unwrap();
        assert_eq!(id, "abc123");

        let seen = client.transport().seen();
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(seen[0].url.as_str(), "https://rapiddns.io/api/export-data");
        assert_eq!(
            seen[0].body,
            Some(json!({"query_type": "subdomain", "query_input": "example.com", "max_results": 0, "compress": true}))
        );
    }

    #[tokio::test]
    async fn test_submit_without_id_reports_server_message() {
        let transport = ScriptedTransport::default();
        transport.push_json(200, json!({"status": 400, "msg": "quota exceeded"}));
        let client = client(transport);

        match ExportJobClient::new(&client).submit("subdomain", "example.com").await {
            Err(HarvestError::RemoteError(msg)) => assert!(msg.contains("quota exceeded")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_submit_auth_failure() {
        let transport = ScriptedTransport::default();
        transport.push_json(401, json!({"msg": "no"}));
        let client = client(transport);
        let result = ExportJobClient::new(&client).submit("subdomain", "example.com").await;
        assert!(matches!(result, Err(HarvestError::AuthError(_))));
    }

    #[tokio::test]
    async fn test_submit_rejects_empty_input_without_request() {
        let client = client(ScriptedTransport::default());
        let result = ExportJobClient::new(&client).submit("subdomain", "  ").await;
        assert!(matches!(result, Err(HarvestError::EmptyQuery(_))));
        assert!(client.transport().seen().is_empty());
    }

    #[tokio::test]
    async fn test_poll_completed() {
        let transport = ScriptedTransport::default();
        transport.push_json(
            200,
            json!({"data": {"status": "completed", "progress_percent": 100, "download_url": "https://rapiddns.io/d/abc.zip"}}),
        );
        let client = client(transport);

        let job = ExportJobClient::new(&client).poll("abc123").await.unwrap();
        assert_eq!(job.status, ExportStatus::Completed);
        assert_eq!(job.progress_percent, 100);
        assert_eq!(job.download_url.as_deref(), Some("https://rapiddns.io/d/abc.zip"));
        assert_eq!(client.transport().seen()[0].url.as_str(), "https://rapiddns.io/api/export-data/abc123");
    }

    #[tokio::test]
    async fn test_poll_running_hides_download_and_defaults_progress() {
        let transport = ScriptedTransport::default();
        transport.push_json(200, json!({"message": "{\"data\": 1, \"status\": \"running\", \"download_url\": \"x\"}"}));
        let client = client(transport);

        let job = ExportJobClient::new(&client).poll("abc123").await.unwrap();
        assert_eq!(job.status, ExportStatus::Running);
        assert_eq!(job.progress_percent, 0);
        assert_eq!(job.download_url, None);
    }

    #[tokio::test]
    async fn test_poll_without_envelope_is_remote_error() {
        let transport = ScriptedTransport::default();
        transport.push_json(200, json!({"msg": "task not found"}));
        let client = client(transport);

        match ExportJobClient::new(&client).poll("missing").await {
            Err(HarvestError::RemoteError(msg)) => assert!(msg.contains("task not found")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
