//! Item Forms
//!
//! What an edit card holds before submit: raw strings for every field.
//! Resolving a form against its schema produces the `Item` to upsert.

use std::collections::BTreeMap;

use super::error::{SyncError, SyncResult};
use super::image::ImageRef;
use super::item::{FieldValue, Item, ItemId};
use super::schema::{ContentSchema, FieldSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemForm {
    pub id: ItemId,
    pub sort_id: i64,
    pub text: BTreeMap<String, String>,
    /// Image inputs: data URI, hosted URL, or placeholder
    pub images: BTreeMap<String, String>,
}

impl ItemForm {
    pub fn new(id: ItemId, sort_id: i64) -> Self {
        Self {
            id,
            sort_id,
            text: BTreeMap::new(),
            images: BTreeMap::new(),
        }
    }

    /// Prefill a form from an item, as a card does when it is mounted
    pub fn from_item(item: &Item) -> Self {
        let mut form = Self::new(item.id.clone(), item.sort_id);
        for (name, value) in &item.fields {
            match value {
                FieldValue::Text(text) => {
                    form.text.insert(name.clone(), text.clone());
                }
                FieldValue::Image(image) => {
                    form.images.insert(name.clone(), image.to_source());
                }
            }
        }
        form
    }

    pub fn with_text(mut self, name: &str, value: &str) -> Self {
        self.text.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_image(mut self, name: &str, value: &str) -> Self {
        self.images.insert(name.to_string(), value.to_string());
        self
    }

    /// Build the item to submit.
    ///
    /// Text is trimmed and blank values fall back to the field default.
    /// Fails as a whole on an unknown field or an undecodable image.
    pub fn resolve(&self, schema: &ContentSchema) -> SyncResult<Item> {
        for name in self.text.keys() {
            match schema.field(name) {
                Some(FieldSpec::Text { .. }) => {}
                _ => return Err(unknown_field(schema, name, "text")),
            }
        }
        for name in self.images.keys() {
            match schema.field(name) {
                Some(FieldSpec::Image { .. }) => {}
                _ => return Err(unknown_field(schema, name, "image")),
            }
        }

        let mut fields = BTreeMap::new();
        for field in &schema.fields {
            match field {
                FieldSpec::Text { name, default } => {
                    let value = self
                        .text
                        .get(name)
                        .map(|text| text.trim())
                        .filter(|text| !text.is_empty())
                        .unwrap_or(default.as_str());
                    fields.insert(name.clone(), FieldValue::Text(value.to_string()));
                }
                FieldSpec::Image { name, .. } => {
                    let image = match self.images.get(name) {
                        Some(raw) => ImageRef::parse(raw)?,
                        None => ImageRef::None,
                    };
                    fields.insert(name.clone(), FieldValue::Image(image));
                }
            }
        }

        Ok(Item {
            id: self.id.clone(),
            sort_id: self.sort_id,
            fields,
        })
    }
}

fn unknown_field(schema: &ContentSchema, name: &str, kind: &str) -> SyncError {
    SyncError::InvalidForm(format!("{} has no {} field {}", schema.name, kind, name))
}
