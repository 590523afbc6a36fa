//! HTTP client for the external log-parsing service.

use log::{debug, info, warn};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde_json::Value;

use crate::config::Config;
use crate::error::ClientError;
use crate::export::ExportFormat;
use crate::models::{parse_analysis_result, AnalysisResult};
use crate::request::{AnalysisRequest, InlinePayload};

/// The parser service as seen by the session and the export dispatcher.
///
/// Implemented over HTTP by [`HttpBackend`]; tests substitute an in-memory
/// implementation.
pub trait Backend: Send + Sync {
    /// Run one analysis. Errors are already normalized into [`ClientError`].
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ClientError>;

    /// Fetch an export artifact for the given form parameters as opaque bytes.
    fn export(&self, format: ExportFormat, payload: &InlinePayload) -> Result<Vec<u8>, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: Config,
}

impl HttpBackend {
    pub fn new(config: Config) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Backend for HttpBackend {
    fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ClientError> {
        let url = self.config.endpoint(request.endpoint());
        let builder = match request {
            AnalysisRequest::Inline(payload) => {
                info!("Submitting analysis to {} ({} bytes of log)", url, payload.log.len());
                self.client.post(&url).json(payload)
            }
            AnalysisRequest::Upload(payload) => {
                info!(
                    "Uploading {} ({} bytes) to {}",
                    payload.file_name,
                    payload.bytes.len(),
                    url
                );
                let part = Part::bytes(payload.bytes.clone()).file_name(payload.file_name.clone());
                let mut form = Form::new().part("file", part);
                for (name, value) in &payload.fields {
                    form = form.text(*name, value.clone());
                }
                form = form.text("flags", payload.flags_json.clone());
                self.client.post(&url).multipart(form)
            }
        };

        let response = check_status(builder.send()?)?;
        let body = response.text()?;
        debug!("Analysis response: {} bytes", body.len());
        let result = parse_analysis_result(&body)?;
        info!(
            "Analysis received: {} timeline events, {} anomalies",
            result.timeline.len(),
            result.anomalies.len()
        );
        Ok(result)
    }

    fn export(&self, format: ExportFormat, payload: &InlinePayload) -> Result<Vec<u8>, ClientError> {
        let url = self.config.endpoint(&format.endpoint());
        info!("Requesting {} export from {}", format.extension(), url);
        let response = check_status(self.client.post(&url).json(payload).send()?)?;
        Ok(response.bytes()?.to_vec())
    }
}

fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let err = error_from_body(status.as_u16(), &body);
    warn!("Request failed ({}): {}", status.as_u16(), err.display_message());
    Err(err)
}

/// Map a non-2xx response to an error, preferring the body's `detail` field.
pub fn error_from_body(status: u16, body: &str) -> ClientError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned());
    match detail {
        Some(Value::String(detail)) if !detail.is_empty() => ClientError::Api { status, detail },
        Some(Value::Null) | Some(Value::String(_)) | None => {
            ClientError::Transport(format!("Request failed with status code {}", status))
        }
        Some(other) => ClientError::Api {
            status,
            detail: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string_becomes_api_error() {
        let err = error_from_body(500, r#"{"detail": "list index out of range"}"#);
        assert!(matches!(err, ClientError::Api { status: 500, .. }));
        assert_eq!(err.display_message(), "list index out of range");
    }

    #[test]
    fn test_missing_detail_falls_back_to_status_message() {
        let err = error_from_body(502, "<html>Bad Gateway</html>");
        assert_eq!(err.display_message(), "Request failed with status code 502");

        let err = error_from_body(404, r#"{"error": "nope"}"#);
        assert_eq!(err.display_message(), "Request failed with status code 404");
    }

    #[test]
    fn test_structured_detail_is_rendered_as_json() {
        let err = error_from_body(422, r#"{"detail": [{"loc": ["body", "log"], "msg": "field required"}]}"#);
        assert!(err.display_message().contains("field required"));
    }
}
