pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod form;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod schema;
pub mod session;
pub mod upload;

pub use backend::{
    ArtifactBytes, DocumentBackend, EditResponse, GenerateResponse, Payload, UploadReceipt,
};
pub use catalog::TemplateCatalog;
pub use config::ClientConfig;
pub use error::{DocgenError, TransportError};
pub use form::{FormStateStore, FormValues};
pub use http::HttpBackend;
pub use lifecycle::{AbortHandle, DocumentLifecycleController, DocumentState, TEMPLATE_ID_FIELD};
pub use model::{
    DocumentFormat, DocumentId, DocumentRecord, DownloadedArtifact, FieldDescriptor, InputKind,
    Template, TemplateId, UploadRequest,
};
pub use schema::{FormSchema, SchemaRegistry};
pub use session::DocumentSession;
pub use upload::TemplateUploadCoordinator;
