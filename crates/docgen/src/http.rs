use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

use crate::backend::{
    ArtifactBytes, DocumentBackend, EditResponse, GenerateResponse, Payload, UploadReceipt,
};
use crate::config::ClientConfig;
use crate::error::{DocgenError, TransportError};
use crate::model::{DocumentFormat, DocumentId, Template, TemplateId, UploadRequest};

/// REST client for the document-generation service.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, DocgenError> {
        if base.cannot_be_a_base() {
            return Err(DocgenError::Config(format!(
                "base url {base} cannot carry request paths"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| DocgenError::Config(format!("failed to build http client: {err}")))?;
        Ok(Self { client, base })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, DocgenError> {
        Self::new(config.base_url.clone(), config.request_timeout())
    }

    /// Joins path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str], trailing_slash: bool) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                TransportError::InvalidRequest(format!("base url {} has no path", self.base))
            })?;
            path.pop_if_empty().extend(segments);
            if trailing_slash {
                path.push("");
            }
        }
        Ok(url)
    }

    /// Sends the request and treats every non-success status as a rejection,
    /// lifting the backend's `error`/`detail` message into the reason.
    async fn execute(&self, request: RequestBuilder) -> Result<Response, TransportError> {
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(url = %response.url(), %status, "backend responded");
        if status.is_success() {
            return Ok(response);
        }
        let reason = match response.bytes().await {
            Ok(body) => extract_reason(&body),
            Err(_) => None,
        };
        Err(TransportError::Rejected { status, reason })
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = self.execute(request).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl DocumentBackend for HttpBackend {
    async fn list_templates(&self) -> Result<Vec<Template>, TransportError> {
        let url = self.endpoint(&["templates"], true)?;
        tracing::debug!(%url, "listing templates");
        self.execute_json(self.client.get(url)).await
    }

    async fn create_template(&self, name: &str) -> Result<Template, TransportError> {
        let url = self.endpoint(&["templates"], true)?;
        tracing::debug!(%url, name, "registering template metadata");
        self.execute_json(self.client.post(url).json(&json!({ "name": name })))
            .await
    }

    async fn upload_template(
        &self,
        request: UploadRequest,
    ) -> Result<UploadReceipt, TransportError> {
        let url = self.endpoint(&["upload-template"], true)?;
        tracing::debug!(
            %url,
            name = %request.name,
            bytes = request.file_bytes.len(),
            "uploading template file"
        );
        let file = Part::bytes(request.file_bytes).file_name(request.file_name);
        let form = Form::new()
            .part("file", file)
            .text("name", request.name)
            .text("description", request.description);
        self.execute_json(self.client.post(url).multipart(form))
            .await
    }

    async fn generate(
        &self,
        template_id: &TemplateId,
        payload: Payload,
    ) -> Result<GenerateResponse, TransportError> {
        let url = self.endpoint(&["generate", template_id.as_str()], true)?;
        tracing::debug!(%url, fields = payload.len(), "requesting generation");
        self.execute_json(self.client.post(url).json(&payload)).await
    }

    async fn edit(
        &self,
        document_id: &DocumentId,
        payload: Payload,
    ) -> Result<EditResponse, TransportError> {
        let url = self.endpoint(&["edit-document", document_id.as_str()], true)?;
        tracing::debug!(%url, fields = payload.len(), "requesting edit");
        self.execute_json(self.client.post(url).json(&payload)).await
    }

    async fn download(
        &self,
        document_id: &DocumentId,
        format: DocumentFormat,
    ) -> Result<ArtifactBytes, TransportError> {
        let mut url = self.endpoint(&["documents", document_id.as_str()], false)?;
        url.query_pairs_mut().append_pair("format", format.as_str());
        tracing::debug!(%url, "downloading artifact");
        let response = self.execute(self.client.get(url)).await?;
        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(disposition_file_name);
        let bytes = response.bytes().await?.to_vec();
        Ok(ArtifactBytes { bytes, file_name })
    }
}

/// Pulls a human-readable reason out of an error body: `{"error": ...}`,
/// `{"detail": "..."}` or FastAPI-style `{"detail": [{"msg": ...}]}`.
fn extract_reason(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Some(error.to_string());
    }
    match value.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}

fn disposition_file_name(header: &str) -> Option<String> {
    header.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        if !key.eq_ignore_ascii_case("filename") {
            return None;
        }
        let name = value.trim().trim_matches('"');
        // Only the final path component is kept.
        let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
        if matches!(name, "" | "." | "..") {
            None
        } else {
            Some(name.to_string())
        }
    })
}
