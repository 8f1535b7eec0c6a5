//! Document lifecycle: generate, edit, and download one document at a time.
//!
//! The controller encodes the state graph
//!
//! ```text
//! NoDocument -> Generating -> Generated
//! Generated  -> Generating -> Generated   (regenerate)
//! Generated  -> Editing    -> Generated
//! Generated  -> Downloading -> Generated
//! Generating -> NoDocument                (failed first generation)
//! Generated  -> NoDocument                (discard on template change)
//! ```
//!
//! Every operation takes `&mut self`, so two lifecycle calls can never be in
//! flight against the same controller. An in-flight call can be aborted from
//! elsewhere through an [`AbortHandle`].

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::backend::{DocumentBackend, GenerateResponse};
use crate::error::{DocgenError, TransportError};
use crate::form::FormValues;
use crate::model::{
    DocumentFormat, DocumentId, DocumentRecord, DownloadedArtifact, TemplateId, default_file_name,
};
use crate::schema::FormSchema;

/// Payload key carrying the template identifier on generation requests.
pub const TEMPLATE_ID_FIELD: &str = "template_id";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    NoDocument,
    Generating,
    Generated,
    Editing,
    Downloading,
}

impl DocumentState {
    /// Whether `from -> to` is an edge of the lifecycle graph.
    pub fn can_transition(self, to: DocumentState) -> bool {
        use DocumentState::*;
        matches!(
            (self, to),
            (NoDocument, Generating)
                | (Generated, Generating)
                | (Generating, Generated)
                | (Generating, NoDocument)
                | (Generated, Editing)
                | (Editing, Generated)
                | (Generated, Downloading)
                | (Downloading, Generated)
                | (Generated, NoDocument)
                | (NoDocument, NoDocument)
        )
    }
}

/// Cancels whichever lifecycle call is currently in flight.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle {
    inflight: Arc<Mutex<Option<CancellationToken>>>,
}

impl AbortHandle {
    /// Returns `true` when a call was in flight and has been cancelled.
    pub fn abort(&self) -> bool {
        match self.inflight.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

struct ActiveDocument {
    record: DocumentRecord,
    schema: Arc<FormSchema>,
}

pub struct DocumentLifecycleController<B> {
    backend: B,
    active: Option<ActiveDocument>,
    state: watch::Sender<DocumentState>,
    abort: AbortHandle,
}

impl<B> DocumentLifecycleController<B>
where
    B: DocumentBackend,
{
    pub fn new(backend: B) -> Self {
        let (state, _) = watch::channel(DocumentState::NoDocument);
        Self {
            backend,
            active: None,
            state,
            abort: AbortHandle::default(),
        }
    }

    pub fn state(&self) -> DocumentState {
        *self.state.borrow()
    }

    /// Receives every state change, including the transient busy states.
    pub fn subscribe(&self) -> watch::Receiver<DocumentState> {
        self.state.subscribe()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn record(&self) -> Option<&DocumentRecord> {
        self.active.as_ref().map(|active| &active.record)
    }

    /// Generates a document from `values` and makes it the active record,
    /// replacing any previous one.
    pub async fn generate(
        &mut self,
        template_id: &TemplateId,
        schema: Arc<FormSchema>,
        values: FormValues,
    ) -> Result<DocumentRecord, DocgenError> {
        let values = values.restrict_to(&schema);
        let mut payload = values
            .to_payload(&schema)
            .map_err(DocgenError::GenerationFailed)?;
        payload.insert(
            TEMPLATE_ID_FIELD.to_string(),
            Value::String(template_id.to_string()),
        );

        let prior = self.state();
        self.transition(DocumentState::Generating);
        let outcome = self
            .run_abortable(self.backend.generate(template_id, payload))
            .await;

        let accepted = match outcome {
            None => Err(DocgenError::Aborted("document generation".to_string())),
            Some(result) => result
                .map_err(|err| DocgenError::GenerationFailed(err.to_string()))
                .and_then(accept_generated),
        };
        let (document_id, artifact_path) = match accepted {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::warn!(template_id = %template_id, error = %err, "generation failed");
                self.transition(prior);
                return Err(err);
            }
        };

        let record = DocumentRecord {
            document_id,
            source_template_id: template_id.clone(),
            artifact_path,
            last_values: values,
        };
        tracing::info!(
            document_id = %record.document_id,
            template_id = %template_id,
            artifact = %record.artifact_path,
            "document generated"
        );
        self.active = Some(ActiveDocument {
            record: record.clone(),
            schema,
        });
        self.transition(DocumentState::Generated);
        Ok(record)
    }

    /// Re-renders the active document with new values and returns the new artifact path.
    pub async fn edit(
        &mut self,
        document_id: &DocumentId,
        values: FormValues,
    ) -> Result<String, DocgenError> {
        let schema = self.require_active(document_id)?.schema.clone();
        let values = values.restrict_to(&schema);
        let payload = values.to_payload(&schema).map_err(DocgenError::EditFailed)?;

        self.transition(DocumentState::Editing);
        let outcome = self
            .run_abortable(self.backend.edit(document_id, payload))
            .await;
        self.transition(DocumentState::Generated);

        let accepted = match outcome {
            None => Err(DocgenError::Aborted("document edit".to_string())),
            Some(Err(err)) => Err(DocgenError::EditFailed(err.to_string())),
            Some(Ok(response)) => match (response.error, response.file_path) {
                (Some(error), _) => Err(DocgenError::EditFailed(error)),
                (None, Some(path)) if !path.trim().is_empty() => Ok(path),
                (None, _) => Err(DocgenError::EditFailed(
                    "malformed response: missing file_path".to_string(),
                )),
            },
        };
        let artifact_path = match accepted {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(document_id = %document_id, error = %err, "edit failed");
                return Err(err);
            }
        };

        let Some(active) = self.active.as_mut() else {
            return Err(DocgenError::NoActiveDocument(Some(document_id.to_string())));
        };
        active.record.artifact_path = artifact_path.clone();
        active.record.last_values = values;
        tracing::info!(document_id = %document_id, artifact = %artifact_path, "document edited");
        Ok(artifact_path)
    }

    /// Parses `format` and downloads the active document in it.
    ///
    /// An unknown format fails with [`DocgenError::UnsupportedFormat`] before
    /// anything else is checked.
    pub async fn request_download(
        &mut self,
        document_id: &DocumentId,
        format: &str,
    ) -> Result<DownloadedArtifact, DocgenError> {
        let format: DocumentFormat = format.parse()?;
        self.download(document_id, format).await
    }

    pub async fn download(
        &mut self,
        document_id: &DocumentId,
        format: DocumentFormat,
    ) -> Result<DownloadedArtifact, DocgenError> {
        self.require_active(document_id)?;

        self.transition(DocumentState::Downloading);
        let outcome = self
            .run_abortable(self.backend.download(document_id, format))
            .await;
        self.transition(DocumentState::Generated);

        let artifact = match outcome {
            None => Err(DocgenError::Aborted("document download".to_string())),
            Some(Err(err)) => Err(DocgenError::DownloadFailed(err.to_string())),
            Some(Ok(artifact)) if artifact.bytes.is_empty() => Err(DocgenError::DownloadFailed(
                "backend returned an empty artifact".to_string(),
            )),
            Some(Ok(artifact)) => Ok(artifact),
        }
        .inspect_err(|err| {
            tracing::warn!(document_id = %document_id, %format, error = %err, "download failed");
        })?;

        tracing::info!(
            document_id = %document_id,
            %format,
            bytes = artifact.bytes.len(),
            "document downloaded"
        );
        Ok(DownloadedArtifact {
            document_id: document_id.clone(),
            format,
            file_name: artifact
                .file_name
                .unwrap_or_else(|| default_file_name(document_id, format)),
            bytes: artifact.bytes,
        })
    }

    /// Drops the active document and returns to `NoDocument`.
    pub fn discard(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!(document_id = %active.record.document_id, "discarding document");
        }
        self.transition(DocumentState::NoDocument);
    }

    fn require_active(&self, document_id: &DocumentId) -> Result<&ActiveDocument, DocgenError> {
        self.active
            .as_ref()
            .filter(|active| &active.record.document_id == document_id)
            .ok_or_else(|| DocgenError::NoActiveDocument(Some(document_id.to_string())))
    }

    fn transition(&self, to: DocumentState) {
        let from = self.state();
        debug_assert!(
            from.can_transition(to),
            "invalid lifecycle transition {from:?} -> {to:?}"
        );
        tracing::trace!(?from, ?to, "lifecycle transition");
        self.state.send_replace(to);
    }

    /// Runs a backend call that the [`AbortHandle`] can cancel; `None` means aborted.
    async fn run_abortable<F, T>(&self, call: F) -> Option<Result<T, TransportError>>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        let token = CancellationToken::new();
        *self.abort.inflight.lock() = Some(token.clone());
        let outcome = tokio::select! {
            _ = token.cancelled() => None,
            result = call => Some(result),
        };
        *self.abort.inflight.lock() = None;
        outcome
    }
}

fn accept_generated(response: GenerateResponse) -> Result<(DocumentId, String), DocgenError> {
    if let Some(error) = response.error {
        return Err(DocgenError::GenerationFailed(error));
    }
    let document_id = response.document_id.ok_or_else(|| {
        DocgenError::GenerationFailed("malformed response: missing document_id".to_string())
    })?;
    match response.file_path {
        Some(path) if !path.trim().is_empty() => Ok((document_id, path)),
        _ => Err(DocgenError::GenerationFailed(
            "malformed response: missing file_path".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_states_only_return_to_generated_or_no_document() {
        use DocumentState::*;
        for busy in [Editing, Downloading] {
            assert!(busy.can_transition(Generated));
            assert!(!busy.can_transition(NoDocument));
            assert!(!busy.can_transition(Generating));
        }
        assert!(Generating.can_transition(NoDocument));
        assert!(!NoDocument.can_transition(Editing));
        assert!(!NoDocument.can_transition(Downloading));
        assert!(!NoDocument.can_transition(Generated));
    }

    #[test]
    fn abort_without_inflight_call_is_a_no_op() {
        let handle = AbortHandle::default();
        assert!(!handle.abort());
    }

    #[test]
    fn generated_response_requires_id_and_path() {
        let ok = accept_generated(GenerateResponse {
            document_id: Some(DocumentId::new("1")),
            file_path: Some("generated/1.docx".into()),
            error: None,
        })
        .unwrap();
        assert_eq!(ok.0, DocumentId::new("1"));

        let missing_path = accept_generated(GenerateResponse {
            document_id: Some(DocumentId::new("1")),
            ..Default::default()
        })
        .unwrap_err();
        assert!(missing_path.to_string().contains("file_path"));

        let backend_error = accept_generated(GenerateResponse {
            error: Some("template file missing".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(
            backend_error.to_string(),
            "document generation failed: template file missing"
        );
    }
}
