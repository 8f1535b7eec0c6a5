#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docgen::{
    ArtifactBytes, DocumentBackend, DocumentFormat, DocumentId, DocumentState, EditResponse,
    GenerateResponse, Payload, Template, TemplateId, TransportError, UploadReceipt,
    UploadRequest,
};
use tokio::sync::{Notify, watch};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    ListTemplates,
    CreateTemplate(String),
    Upload {
        name: String,
        description: String,
        file_name: String,
        bytes: usize,
    },
    Generate {
        template_id: TemplateId,
        payload: Payload,
    },
    Edit {
        document_id: DocumentId,
        payload: Payload,
    },
    Download {
        document_id: DocumentId,
        format: DocumentFormat,
    },
}

/// Scriptable in-memory backend that records every call it receives.
#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    templates: Mutex<Vec<Template>>,
    catalog_down: AtomicBool,
    hang: AtomicBool,
    started: Arc<Notify>,
    next_id: AtomicU64,
    calls: Mutex<Vec<Call>>,
    observed: Mutex<Vec<DocumentState>>,
    state_watch: Mutex<Option<watch::Receiver<DocumentState>>>,
    generate_script: Mutex<VecDeque<Result<GenerateResponse, TransportError>>>,
    edit_script: Mutex<VecDeque<Result<EditResponse, TransportError>>>,
    download_script: Mutex<VecDeque<Result<ArtifactBytes, TransportError>>>,
    upload_script: Mutex<VecDeque<Result<UploadReceipt, TransportError>>>,
}

pub fn template(id: &str, name: &str) -> Template {
    Template {
        id: TemplateId::new(id),
        name: name.to_string(),
        description: None,
    }
}

impl FakeBackend {
    pub fn with_templates(templates: Vec<Template>) -> Self {
        let backend = Self::default();
        *backend.inner.templates.lock().unwrap() = templates;
        backend
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.inner.calls.lock().unwrap().len()
    }

    pub fn set_catalog_down(&self, down: bool) {
        self.inner.catalog_down.store(down, Ordering::SeqCst);
    }

    /// Makes lifecycle calls block forever after signalling [`Self::started`].
    pub fn set_hang(&self, hang: bool) {
        self.inner.hang.store(hang, Ordering::SeqCst);
    }

    pub fn started(&self) -> Arc<Notify> {
        self.inner.started.clone()
    }

    /// Records the controller state seen at the moment each lifecycle call arrives.
    pub fn observe(&self, receiver: watch::Receiver<DocumentState>) {
        *self.inner.state_watch.lock().unwrap() = Some(receiver);
    }

    pub fn observed_states(&self) -> Vec<DocumentState> {
        self.inner.observed.lock().unwrap().clone()
    }

    pub fn script_generate(&self, result: Result<GenerateResponse, TransportError>) {
        self.inner.generate_script.lock().unwrap().push_back(result);
    }

    pub fn script_edit(&self, result: Result<EditResponse, TransportError>) {
        self.inner.edit_script.lock().unwrap().push_back(result);
    }

    pub fn script_download(&self, result: Result<ArtifactBytes, TransportError>) {
        self.inner.download_script.lock().unwrap().push_back(result);
    }

    pub fn script_upload(&self, result: Result<UploadReceipt, TransportError>) {
        self.inner.upload_script.lock().unwrap().push_back(result);
    }

    fn record(&self, call: Call) {
        self.inner.calls.lock().unwrap().push(call);
        if let Some(state_watch) = self.inner.state_watch.lock().unwrap().as_ref() {
            let state = *state_watch.borrow();
            self.inner.observed.lock().unwrap().push(state);
        }
    }

    fn next_id(&self) -> u64 {
        self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn maybe_hang(&self) {
        if self.inner.hang.load(Ordering::SeqCst) {
            self.inner.started.notify_one();
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl DocumentBackend for FakeBackend {
    async fn list_templates(&self) -> Result<Vec<Template>, TransportError> {
        self.record(Call::ListTemplates);
        if self.inner.catalog_down.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable("connection refused".into()));
        }
        Ok(self.inner.templates.lock().unwrap().clone())
    }

    async fn create_template(&self, name: &str) -> Result<Template, TransportError> {
        self.record(Call::CreateTemplate(name.to_string()));
        let id = 100 + self.next_id();
        Ok(template(&id.to_string(), name))
    }

    async fn upload_template(
        &self,
        request: UploadRequest,
    ) -> Result<UploadReceipt, TransportError> {
        self.record(Call::Upload {
            name: request.name.clone(),
            description: request.description.clone(),
            file_name: request.file_name.clone(),
            bytes: request.file_bytes.len(),
        });
        let scripted = self.inner.upload_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(UploadReceipt {
                template_id: TemplateId::new((100 + self.next_id()).to_string()),
                name: None,
                description: None,
            })
        })
    }

    async fn generate(
        &self,
        template_id: &TemplateId,
        payload: Payload,
    ) -> Result<GenerateResponse, TransportError> {
        self.record(Call::Generate {
            template_id: template_id.clone(),
            payload,
        });
        self.maybe_hang().await;
        let scripted = self.inner.generate_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            let id = self.next_id();
            Ok(GenerateResponse {
                document_id: Some(DocumentId::new(id.to_string())),
                file_path: Some(format!("generated/document-{id}.docx")),
                error: None,
            })
        })
    }

    async fn edit(
        &self,
        document_id: &DocumentId,
        payload: Payload,
    ) -> Result<EditResponse, TransportError> {
        self.record(Call::Edit {
            document_id: document_id.clone(),
            payload,
        });
        self.maybe_hang().await;
        let scripted = self.inner.edit_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(EditResponse {
                file_path: Some(format!(
                    "generated/document-{document_id}-v{}.docx",
                    self.next_id()
                )),
                error: None,
            })
        })
    }

    async fn download(
        &self,
        document_id: &DocumentId,
        format: DocumentFormat,
    ) -> Result<ArtifactBytes, TransportError> {
        self.record(Call::Download {
            document_id: document_id.clone(),
            format,
        });
        self.maybe_hang().await;
        let scripted = self.inner.download_script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(ArtifactBytes {
                bytes: format!("{format} bytes of {document_id}").into_bytes(),
                file_name: None,
            })
        })
    }
}
