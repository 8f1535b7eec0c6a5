use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::DocgenError;
use crate::model::FieldDescriptor;

pub const SALES_CONTRACT: &str = "Договор купли-продажи";
pub const SALES_CONTRACT_ALIAS: &str = "sales-contract";
pub const LEGAL_SERVICES_CONTRACT: &str = "Договор оказания юридических услуг";
pub const LEGAL_SERVICES_CONTRACT_ALIAS: &str = "legal-services-contract";

/// Ordered field set for one template. Order drives display only; payloads are keyed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSchema {
    template: String,
    fields: Vec<FieldDescriptor>,
}

impl FormSchema {
    /// Builds a schema, rejecting duplicate field keys.
    pub fn new(
        template: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, DocgenError> {
        let template = template.into();
        let mut seen = std::collections::BTreeSet::new();
        for field in &fields {
            if !seen.insert(field.key.as_str()) {
                return Err(DocgenError::SchemaConflict(format!(
                    "{template}: duplicate field key {}",
                    field.key
                )));
            }
        }
        Ok(Self { template, fields })
    }

    /// Name of the template the schema was registered for.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.field(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.key.as_str())
    }
}

/// Open registry mapping template names to form schemas.
///
/// Entries are only ever added; an existing mapping cannot be replaced, so a
/// name resolves to the same schema for the lifetime of the registry.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<FormSchema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the sales and legal-services contract schemas.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for (names, schema) in builtin_schemas() {
            let schema = Arc::new(schema);
            for name in names {
                registry.schemas.insert(name.to_string(), schema.clone());
            }
        }
        registry
    }

    /// Adds a mapping for `name`. Fails when the name is already mapped.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        schema: FormSchema,
    ) -> Result<Arc<FormSchema>, DocgenError> {
        let name = name.into();
        if self.schemas.contains_key(&name) {
            return Err(DocgenError::SchemaConflict(name));
        }
        let schema = Arc::new(schema);
        self.schemas.insert(name, schema.clone());
        Ok(schema)
    }

    /// Resolves a template identity to its schema; `None` means render no fields.
    pub fn resolve(&self, identity: &str) -> Option<Arc<FormSchema>> {
        self.schemas.get(identity.trim()).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn builtin_schemas() -> Vec<([&'static str; 2], FormSchema)> {
    let sales = FormSchema {
        template: SALES_CONTRACT.to_string(),
        fields: vec![
            FieldDescriptor::text("seller_name", "Продавец"),
            FieldDescriptor::text("buyer_name", "Покупатель"),
            FieldDescriptor::text("item", "Предмет"),
            FieldDescriptor::number("price", "Цена"),
        ],
    };
    let legal = FormSchema {
        template: LEGAL_SERVICES_CONTRACT.to_string(),
        fields: vec![
            FieldDescriptor::text("contract_date", "Дата договора"),
            FieldDescriptor::text("lawyer_name", "ФИО юриста"),
            FieldDescriptor::text("client_name", "ФИО клиента"),
            FieldDescriptor::text("client_passport_series", "Серия паспорта"),
            FieldDescriptor::text("client_passport_number", "Номер паспорта"),
            FieldDescriptor::text("client_passport_issued_by", "Кем выдан"),
            FieldDescriptor::text("client_passport_issued_date", "Дата выдачи"),
            FieldDescriptor::text("client_address", "Адрес клиента"),
        ],
    };
    vec![
        ([SALES_CONTRACT, SALES_CONTRACT_ALIAS], sales),
        ([LEGAL_SERVICES_CONTRACT, LEGAL_SERVICES_CONTRACT_ALIAS], legal),
    ]
}
