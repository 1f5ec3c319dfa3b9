//! Add-to-cart request bodies.
//!
//! Product forms submit form-encoded fields; programmatic adds (bundles,
//! subscription upgrades) submit JSON. Both are resolved once, here, into a
//! [`CartRequest`] carrying the section-rendering parameters.

use serde_json::{Map, Value};

use crate::shopify::{CartItemInput, CartRequest};

/// Ordered form fields, with the multi-value semantics of browser `FormData`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    fields: Vec<(String, String)>,
}

impl FormPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload for a single variant.
    #[must_use]
    pub fn variant(id: theme_widgets_core::VariantId, quantity: u32) -> Self {
        Self::new()
            .with("id", id.to_string())
            .with("quantity", quantity.to_string())
    }

    /// Builder-style append.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    /// Append a field, keeping existing fields with the same name.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.fields.push((name.to_string(), value.into()));
    }

    /// Remove every field named `name`.
    pub fn delete(&mut self, name: &str) {
        self.fields.retain(|(n, _)| n != name);
    }

    /// First value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A JSON add body (`{"items": [...]}` plus any extra keys).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonPayload(Map<String, Value>);

impl JsonPayload {
    /// Body adding `items`.
    #[must_use]
    pub fn items(items: &[CartItemInput]) -> Self {
        let mut map = Map::new();
        map.insert(
            "items".to_string(),
            serde_json::to_value(items).unwrap_or_else(|_| Value::Array(Vec::new())),
        );
        Self(map)
    }

    /// Wrap an arbitrary JSON object.
    #[must_use]
    pub const fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Body of an add call.
#[derive(Debug, Clone, PartialEq)]
pub enum AddPayload {
    Form(FormPayload),
    Json(JsonPayload),
}

impl From<FormPayload> for AddPayload {
    fn from(payload: FormPayload) -> Self {
        Self::Form(payload)
    }
}

impl From<JsonPayload> for AddPayload {
    fn from(payload: JsonPayload) -> Self {
        Self::Json(payload)
    }
}

impl AddPayload {
    /// Attach `sections_url` and `sections`.
    ///
    /// Form bodies carry sections as one comma-joined field; JSON bodies as an array.
    #[must_use]
    pub fn normalize(self, sections_url: &str, sections: &[&str]) -> CartRequest {
        match self {
            Self::Form(mut form) => {
                form.append("sections_url", sections_url);
                form.append("sections", sections.join(","));
                CartRequest::Form(form.fields)
            }
            Self::Json(JsonPayload(mut map)) => {
                map.insert(
                    "sections_url".to_string(),
                    Value::String(sections_url.to_string()),
                );
                map.insert(
                    "sections".to_string(),
                    Value::Array(
                        sections
                            .iter()
                            .map(|s| Value::String((*s).to_string()))
                            .collect(),
                    ),
                );
                CartRequest::Json(Value::Object(map))
            }
        }
    }
}
