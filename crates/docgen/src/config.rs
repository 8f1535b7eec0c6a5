use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::DocgenError;
use crate::model::FieldDescriptor;
use crate::schema::{FormSchema, SchemaRegistry};

pub const BASE_URL_ENV: &str = "DOCGEN_BASE_URL";
pub const CONFIG_PATH_ENV: &str = "DOCGEN_CONFIG";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client settings, read from YAML:
///
/// ```yaml
/// base_url: http://127.0.0.1:8000
/// request_timeout_secs: 30
/// download_dir: ./documents
/// schemas:
///   Договор аренды:
///     - { key: tenant_name, label: Арендатор }
///     - { key: rent, label: Плата, input_kind: number }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub base_url: Url,
    pub request_timeout_secs: u64,
    pub download_dir: PathBuf,
    pub schemas: BTreeMap<String, Vec<FieldDescriptor>>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            download_dir: PathBuf::from("."),
            schemas: BTreeMap::new(),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base url is valid")
}

impl ClientConfig {
    /// Parses a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self, DocgenError> {
        let raw = fs::read_to_string(path)
            .map_err(|err| DocgenError::Config(format!("{}: {err}", path.display())))?;
        Self::from_yaml(&raw).map_err(|err| err.context(path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self, DocgenError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(raw)?;
        if config.request_timeout_secs == 0 {
            return Err(DocgenError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }

    /// Resolves settings with precedence: explicit overrides, then environment,
    /// then the config file, then defaults.
    pub fn resolve(
        config_path: Option<&Path>,
        base_url_override: Option<&str>,
    ) -> Result<Self, DocgenError> {
        let env_path = env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match config_path.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        let env_base = env::var(BASE_URL_ENV).ok();
        if let Some(raw) = base_url_override.or(env_base.as_deref()) {
            config.base_url = Url::parse(raw.trim()).map_err(|err| {
                DocgenError::Config(format!("invalid base url '{raw}': {err}"))
            })?;
        }
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Built-in schemas plus the ones declared under `schemas`.
    pub fn schema_registry(&self) -> Result<SchemaRegistry, DocgenError> {
        let mut registry = SchemaRegistry::with_builtin();
        for (name, fields) in &self.schemas {
            let schema = FormSchema::new(name.clone(), fields.clone())?;
            registry.register(name.clone(), schema)?;
        }
        Ok(registry)
    }
}
