use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DocgenError;
use crate::form::FormValues;

/// Identifiers arrive from the backend either as JSON strings or integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

/// Opaque template identifier issued by the backend.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "RawId")]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<RawId> for TemplateId {
    fn from(raw: RawId) -> Self {
        Self(raw.into())
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a generated document.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "RawId")]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<RawId> for DocumentId {
    fn from(raw: RawId) -> Self {
        Self(raw.into())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered document blueprint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    #[default]
    Text,
    Number,
    File,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InputKind::Text => "text",
            InputKind::Number => "number",
            InputKind::File => "file",
        };
        f.write_str(label)
    }
}

/// A single input of a form schema.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub input_kind: InputKind,
}

impl FieldDescriptor {
    pub fn text(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            input_kind: InputKind::Text,
        }
    }

    pub fn number(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            input_kind: InputKind::Number,
        }
    }
}

/// Download formats accepted by the document endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Docx,
    Pdf,
}

impl DocumentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFormat::Docx => "docx",
            DocumentFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = DocgenError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "docx" => Ok(DocumentFormat::Docx),
            "pdf" => Ok(DocumentFormat::Pdf),
            _ => Err(DocgenError::UnsupportedFormat(raw.to_string())),
        }
    }
}

/// Metadata plus template file submitted when registering a new template.
/// Taken by value so a request is consumed exactly once.
#[derive(Clone, Debug, Default)]
pub struct UploadRequest {
    pub name: String,
    pub description: String,
    pub file_name: String,
    pub file_bytes: Vec<u8>,
}

impl UploadRequest {
    /// Builds a request from a template file on disk, using its file name for the upload part.
    pub fn from_path(
        name: impl Into<String>,
        description: impl Into<String>,
        path: &Path,
    ) -> Result<Self, DocgenError> {
        let file_bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "template.docx".to_string());
        Ok(Self {
            name: name.into(),
            description: description.into(),
            file_name,
            file_bytes,
        })
    }
}

/// The document produced by the last successful generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    pub document_id: DocumentId,
    pub source_template_id: TemplateId,
    pub artifact_path: String,
    pub last_values: FormValues,
}

/// Bytes of a rendered document ready to be written locally.
#[derive(Clone, Debug)]
pub struct DownloadedArtifact {
    pub document_id: DocumentId,
    pub format: DocumentFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DownloadedArtifact {
    /// Writes the artifact under `dir` using its suggested file name.
    pub fn save_into(&self, dir: &Path) -> Result<PathBuf, DocgenError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Fallback file name when the backend does not suggest one.
pub fn default_file_name(document_id: &DocumentId, format: DocumentFormat) -> String {
    format!("document-{document_id}.{format}")
}
