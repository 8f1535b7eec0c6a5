use docgen::{
    DocumentFormat, DocumentId, DocumentRecord, DocumentState, FieldDescriptor, FormValues,
    Template,
};
use serde::Serialize;

pub mod fields;
pub mod generate;
pub mod register;
pub mod shell;
pub mod templates;
pub mod upload;

/// A downloaded artifact after it has been written to disk.
#[derive(Debug, Serialize)]
pub struct SavedArtifact {
    pub document_id: DocumentId,
    pub format: DocumentFormat,
    pub path: String,
    pub bytes: usize,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandResult {
    TemplateList {
        templates: Vec<Template>,
    },
    FieldList {
        template: String,
        fields: Vec<FieldDescriptor>,
    },
    TemplateSelected {
        template: Template,
        fields: Vec<FieldDescriptor>,
    },
    FieldSet {
        key: String,
        value: String,
    },
    FormState {
        template: Option<Template>,
        state: DocumentState,
        values: FormValues,
        #[serde(skip_serializing_if = "Option::is_none")]
        document: Option<DocumentRecord>,
    },
    FormReset {
        fields: usize,
    },
    DocumentGenerated {
        template: Template,
        record: DocumentRecord,
        #[serde(skip_serializing_if = "Option::is_none")]
        download: Option<SavedArtifact>,
    },
    DocumentEdited {
        document_id: DocumentId,
        artifact_path: String,
    },
    DocumentDownloaded {
        artifact: SavedArtifact,
    },
    TemplateRegistered {
        template: Template,
        uploaded: bool,
    },
    SessionClosed {
        actions: usize,
    },
}
