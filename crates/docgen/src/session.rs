use std::sync::Arc;

use tokio::sync::watch;

use crate::backend::DocumentBackend;
use crate::catalog::TemplateCatalog;
use crate::error::DocgenError;
use crate::form::{FormStateStore, FormValues};
use crate::lifecycle::{AbortHandle, DocumentLifecycleController, DocumentState};
use crate::model::{
    DocumentId, DocumentRecord, DownloadedArtifact, FieldDescriptor, Template, UploadRequest,
};
use crate::schema::{FormSchema, SchemaRegistry};

/// All state of one operator session: the catalog, the selected template and
/// its form, and the document built from it.
///
/// Changing the selection is the only way to swap schemas, and it always
/// resets the form and discards the current document.
pub struct DocumentSession<B> {
    catalog: TemplateCatalog<B>,
    schemas: SchemaRegistry,
    form: FormStateStore,
    lifecycle: DocumentLifecycleController<B>,
    selected: Option<Template>,
}

impl<B> DocumentSession<B>
where
    B: DocumentBackend + Clone,
{
    pub fn new(backend: B, schemas: SchemaRegistry) -> Self {
        Self {
            catalog: TemplateCatalog::new(backend.clone()),
            schemas,
            form: FormStateStore::new(),
            lifecycle: DocumentLifecycleController::new(backend),
            selected: None,
        }
    }

    /// Loads the template catalog. Meant to run once when the session starts.
    pub async fn initialize(&mut self) -> Result<&[Template], DocgenError> {
        self.catalog.load().await
    }

    pub fn catalog(&self) -> &TemplateCatalog<B> {
        &self.catalog
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn selected(&self) -> Option<&Template> {
        self.selected.as_ref()
    }

    /// Selects a cached template by id or name and returns its schema, or
    /// `None` when no schema is registered for it (the form then has no fields).
    pub fn select_template(
        &mut self,
        identity: &str,
    ) -> Result<Option<Arc<FormSchema>>, DocgenError> {
        let template = self
            .catalog
            .find(identity)
            .cloned()
            .ok_or_else(|| DocgenError::UnknownTemplate(identity.trim().to_string()))?;
        let schema = self.schemas.resolve(&template.name);
        tracing::info!(
            template_id = %template.id,
            name = %template.name,
            fields = schema.as_ref().map_or(0, |schema| schema.fields().len()),
            "template selected"
        );
        self.replace_selection(template, schema.clone());
        Ok(schema)
    }

    fn replace_selection(&mut self, template: Template, schema: Option<Arc<FormSchema>>) {
        self.lifecycle.abort_handle().abort();
        self.lifecycle.discard();
        self.form.reset_for(schema);
        self.selected = Some(template);
    }

    /// Fields to render for the current selection; empty when nothing is selected
    /// or the template has no registered schema.
    pub fn fields(&self) -> &[FieldDescriptor] {
        self.form
            .schema()
            .map(|schema| schema.fields())
            .unwrap_or_default()
    }

    pub fn set_field(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DocgenError> {
        if self.selected.is_none() {
            return Err(DocgenError::NoTemplateSelected);
        }
        self.form.set_field(key, value)
    }

    pub fn reset_form(&mut self) {
        self.form.reset();
    }

    pub fn values(&self) -> FormValues {
        self.form.snapshot()
    }

    /// Generates a document from the current form values.
    pub async fn generate(&mut self) -> Result<DocumentRecord, DocgenError> {
        let template = self
            .selected
            .as_ref()
            .ok_or(DocgenError::NoTemplateSelected)?;
        let schema = self.form.schema().cloned().ok_or_else(|| {
            DocgenError::GenerationFailed(format!(
                "template '{}' has no registered form",
                template.name
            ))
        })?;
        let template_id = template.id.clone();
        let values = self.form.snapshot();
        self.lifecycle.generate(&template_id, schema, values).await
    }

    /// Re-renders the active document with the current form values.
    pub async fn edit(&mut self) -> Result<String, DocgenError> {
        let document_id = self.active_document_id()?;
        let values = self.form.snapshot();
        self.lifecycle.edit(&document_id, values).await
    }

    /// Downloads the active document in `format` (`docx` or `pdf`).
    pub async fn download(&mut self, format: &str) -> Result<DownloadedArtifact, DocgenError> {
        let format = format.parse()?;
        let document_id = self.active_document_id()?;
        self.lifecycle.download(&document_id, format).await
    }

    /// Uploads a new template file and adds it to the catalog.
    pub async fn register_template(
        &mut self,
        request: UploadRequest,
    ) -> Result<Template, DocgenError> {
        self.catalog.register(request).await
    }

    /// Registers template metadata only and adds it to the catalog.
    pub async fn create_template(&mut self, name: &str) -> Result<Template, DocgenError> {
        self.catalog.create(name).await
    }

    pub fn document(&self) -> Option<&DocumentRecord> {
        self.lifecycle.record()
    }

    pub fn state(&self) -> DocumentState {
        self.lifecycle.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<DocumentState> {
        self.lifecycle.subscribe()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.lifecycle.abort_handle()
    }

    fn active_document_id(&self) -> Result<DocumentId, DocgenError> {
        self.lifecycle
            .record()
            .map(|record| record.document_id.clone())
            .ok_or(DocgenError::NoActiveDocument(None))
    }
}
