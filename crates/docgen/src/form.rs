use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::DocgenError;
use crate::model::InputKind;
use crate::schema::FormSchema;

/// Operator-entered values keyed by field key. Numbers stay textual until submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormValues(BTreeMap<String, String>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keeps exactly the schema's keys, filling absent ones with empty strings.
    pub fn restrict_to(&self, schema: &FormSchema) -> FormValues {
        schema
            .keys()
            .map(|key| (key, self.get(key).unwrap_or_default()))
            .collect()
    }

    /// Converts the values into the JSON body sent to the backend.
    ///
    /// Number fields are coerced here; an empty or unparsable number is
    /// reported as the error string so the caller can wrap it in its own kind.
    pub fn to_payload(&self, schema: &FormSchema) -> Result<Map<String, Value>, String> {
        let mut payload = Map::new();
        for field in schema.fields() {
            let raw = self.get(&field.key).unwrap_or_default();
            let value = match field.input_kind {
                InputKind::Number => Value::Number(parse_number(raw).ok_or_else(|| {
                    format!("field {} expects a number, got '{raw}'", field.key)
                })?),
                InputKind::Text | InputKind::File => Value::String(raw.to_string()),
            };
            payload.insert(field.key.clone(), value);
        }
        Ok(payload)
    }
}

impl<K, V> FromIterator<(K, V)> for FormValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn parse_number(raw: &str) -> Option<Number> {
    let trimmed = raw.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(Number::from(int));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
}

/// Holds the in-progress values for the active schema.
#[derive(Debug, Default)]
pub struct FormStateStore {
    schema: Option<Arc<FormSchema>>,
    values: BTreeMap<String, String>,
}

impl FormStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active schema, if a known template is selected.
    pub fn schema(&self) -> Option<&Arc<FormSchema>> {
        self.schema.as_ref()
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set_field(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), DocgenError> {
        let key = key.into();
        let schema = self.schema.as_ref().ok_or(DocgenError::NoTemplateSelected)?;
        if !schema.contains(&key) {
            return Err(DocgenError::UnknownField {
                key,
                template: schema.template().to_string(),
            });
        }
        self.values.insert(key, value.into());
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Clears every stored value.
    pub fn reset(&mut self) {
        self.values.clear();
    }

    /// Replaces the schema and clears all values; `None` leaves an empty form.
    pub fn reset_for(&mut self, schema: Option<Arc<FormSchema>>) {
        self.schema = schema;
        self.values.clear();
    }

    /// Current values with every schema key present (unset keys as empty strings).
    pub fn snapshot(&self) -> FormValues {
        let Some(schema) = &self.schema else {
            return FormValues::new();
        };
        schema
            .keys()
            .map(|key| {
                let value = self.values.get(key).cloned().unwrap_or_default();
                (key.to_string(), value)
            })
            .collect()
    }
}
