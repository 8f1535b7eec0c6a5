use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::TransportError;
use crate::model::{DocumentFormat, DocumentId, Template, TemplateId, UploadRequest};

/// JSON object sent as a generation or edit body.
pub type Payload = Map<String, Value>;

/// Body returned by `POST /generate/{template_id}/`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub document_id: Option<DocumentId>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body returned by `POST /edit-document/{document_id}/`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EditResponse {
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body returned by `POST /upload-template/`.
#[derive(Clone, Debug, Deserialize)]
pub struct UploadReceipt {
    pub template_id: TemplateId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Raw artifact bytes plus the file name suggested by the backend, if any.
#[derive(Clone, Debug, Default)]
pub struct ArtifactBytes {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
}

/// The document-generation service as seen by the client components.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn list_templates(&self) -> Result<Vec<Template>, TransportError>;

    async fn create_template(&self, name: &str) -> Result<Template, TransportError>;

    async fn upload_template(&self, request: UploadRequest)
    -> Result<UploadReceipt, TransportError>;

    async fn generate(
        &self,
        template_id: &TemplateId,
        payload: Payload,
    ) -> Result<GenerateResponse, TransportError>;

    async fn edit(
        &self,
        document_id: &DocumentId,
        payload: Payload,
    ) -> Result<EditResponse, TransportError>;

    async fn download(
        &self,
        document_id: &DocumentId,
        format: DocumentFormat,
    ) -> Result<ArtifactBytes, TransportError>;
}

#[async_trait]
impl<T> DocumentBackend for Arc<T>
where
    T: DocumentBackend + ?Sized,
{
    async fn list_templates(&self) -> Result<Vec<Template>, TransportError> {
        (**self).list_templates().await
    }

    async fn create_template(&self, name: &str) -> Result<Template, TransportError> {
        (**self).create_template(name).await
    }

    async fn upload_template(
        &self,
        request: UploadRequest,
    ) -> Result<UploadReceipt, TransportError> {
        (**self).upload_template(request).await
    }

    async fn generate(
        &self,
        template_id: &TemplateId,
        payload: Payload,
    ) -> Result<GenerateResponse, TransportError> {
        (**self).generate(template_id, payload).await
    }

    async fn edit(
        &self,
        document_id: &DocumentId,
        payload: Payload,
    ) -> Result<EditResponse, TransportError> {
        (**self).edit(document_id, payload).await
    }

    async fn download(
        &self,
        document_id: &DocumentId,
        format: DocumentFormat,
    ) -> Result<ArtifactBytes, TransportError> {
        (**self).download(document_id, format).await
    }
}
