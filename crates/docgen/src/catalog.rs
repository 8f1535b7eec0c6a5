use std::collections::BTreeSet;

use crate::backend::DocumentBackend;
use crate::error::DocgenError;
use crate::model::{Template, UploadRequest};
use crate::upload::TemplateUploadCoordinator;

/// Session-wide cache of the templates known to the backend.
///
/// The cache never holds two entries with the same id, and every successful
/// registration appends exactly one entry.
pub struct TemplateCatalog<B> {
    backend: B,
    uploads: TemplateUploadCoordinator<B>,
    templates: Vec<Template>,
    loaded: bool,
}

impl<B> TemplateCatalog<B>
where
    B: DocumentBackend + Clone,
{
    pub fn new(backend: B) -> Self {
        Self {
            uploads: TemplateUploadCoordinator::new(backend.clone()),
            backend,
            templates: Vec::new(),
            loaded: false,
        }
    }

    /// Fetches the template list, replacing the cache. On failure the previous
    /// cache is kept and [`DocgenError::CatalogUnavailable`] is returned.
    pub async fn load(&mut self) -> Result<&[Template], DocgenError> {
        let fetched = self
            .backend
            .list_templates()
            .await
            .map_err(|err| DocgenError::CatalogUnavailable(err.to_string()))?;

        let mut seen = BTreeSet::new();
        let mut templates = Vec::with_capacity(fetched.len());
        for template in fetched {
            if seen.insert(template.id.clone()) {
                templates.push(template);
            } else {
                tracing::warn!(
                    template_id = %template.id,
                    name = %template.name,
                    "dropping duplicate template from catalog"
                );
            }
        }

        tracing::info!(count = templates.len(), "template catalog loaded");
        self.templates = templates;
        self.loaded = true;
        Ok(&self.templates)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Looks a cached template up by id first, then by name.
    pub fn find(&self, identity: &str) -> Option<&Template> {
        let identity = identity.trim();
        self.templates
            .iter()
            .find(|template| template.id.as_str() == identity)
            .or_else(|| {
                self.templates
                    .iter()
                    .find(|template| template.name == identity)
            })
    }

    /// Uploads a new template and appends it to the cache.
    pub async fn register(&mut self, request: UploadRequest) -> Result<Template, DocgenError> {
        let template = self.uploads.submit(request).await?;
        self.append(template)
    }

    /// Registers template metadata without a file and appends the result.
    pub async fn create(&mut self, name: &str) -> Result<Template, DocgenError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DocgenError::RegistrationRejected(
                "template name is required".to_string(),
            ));
        }
        let template = self
            .backend
            .create_template(name)
            .await
            .map_err(|err| DocgenError::RegistrationRejected(err.to_string()))?;
        self.append(template)
    }

    fn append(&mut self, template: Template) -> Result<Template, DocgenError> {
        if self.templates.iter().any(|known| known.id == template.id) {
            return Err(DocgenError::RegistrationRejected(format!(
                "backend returned already registered template id {}",
                template.id
            )));
        }
        if self.templates.iter().any(|known| known.name == template.name) {
            tracing::warn!(
                template_id = %template.id,
                name = %template.name,
                "registered template shares its name with an existing entry"
            );
        }
        tracing::info!(template_id = %template.id, name = %template.name, "template registered");
        self.templates.push(template.clone());
        Ok(template)
    }
}
