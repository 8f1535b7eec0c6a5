use crate::backend::DocumentBackend;
use crate::error::DocgenError;
use crate::model::{Template, UploadRequest};

/// Packages a new template (metadata plus file) into the multipart upload.
pub struct TemplateUploadCoordinator<B> {
    backend: B,
}

impl<B> TemplateUploadCoordinator<B>
where
    B: DocumentBackend,
{
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Validates the request locally, uploads it, and builds the resulting [`Template`].
    ///
    /// A blank name or an empty file fails with [`DocgenError::UploadRejected`]
    /// before anything is sent; a backend refusal becomes
    /// [`DocgenError::RegistrationRejected`].
    pub async fn submit(&self, mut request: UploadRequest) -> Result<Template, DocgenError> {
        request.name = request.name.trim().to_string();
        if request.name.is_empty() {
            return Err(DocgenError::UploadRejected(
                "template name is required".to_string(),
            ));
        }
        if request.file_bytes.is_empty() {
            return Err(DocgenError::UploadRejected(
                "template file is required".to_string(),
            ));
        }
        if request.file_name.trim().is_empty() {
            request.file_name = format!("{}.docx", request.name);
        }

        let name = request.name.clone();
        let description = Some(request.description.trim().to_string()).filter(|d| !d.is_empty());
        let receipt = self
            .backend
            .upload_template(request)
            .await
            .map_err(|err| DocgenError::RegistrationRejected(err.to_string()))?;

        tracing::info!(template_id = %receipt.template_id, %name, "template uploaded");
        Ok(Template {
            id: receipt.template_id,
            name: receipt.name.unwrap_or(name),
            description: receipt.description.or(description),
        })
    }
}
