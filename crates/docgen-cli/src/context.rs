use std::path::PathBuf;

use docgen::{ClientConfig, DocumentSession, HttpBackend, SchemaRegistry, TemplateCatalog};

use crate::error::CliError;
use crate::util::Verbosity;

pub struct CliSession {
    pub config: ClientConfig,
    pub backend: HttpBackend,
    pub schemas: SchemaRegistry,
    pub verbosity: Verbosity,
}

impl CliSession {
    pub fn bootstrap(
        config_override: Option<PathBuf>,
        base_url_override: Option<String>,
        verbosity: Verbosity,
    ) -> Result<Self, CliError> {
        let config =
            ClientConfig::resolve(config_override.as_deref(), base_url_override.as_deref())?;
        let backend = HttpBackend::from_config(&config)?;
        let schemas = config.schema_registry()?;

        Ok(Self {
            config,
            backend,
            schemas,
            verbosity,
        })
    }

    /// A fresh operator session against the configured backend.
    pub fn document_session(&self) -> DocumentSession<HttpBackend> {
        DocumentSession::new(self.backend.clone(), self.schemas.clone())
    }

    pub fn catalog(&self) -> TemplateCatalog<HttpBackend> {
        TemplateCatalog::new(self.backend.clone())
    }

    /// Maps a schema alias such as `sales-contract` to the template name the
    /// catalog knows; ids and unknown names pass through unchanged.
    pub fn catalog_identity(&self, raw: &str) -> String {
        self.schemas
            .resolve(raw)
            .map(|schema| schema.template().to_string())
            .unwrap_or_else(|| raw.trim().to_string())
    }
}
