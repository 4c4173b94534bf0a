//! Content Item
//!
//! One record of a content type, with its identity, position and fields.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::StoreError;
use super::image::ImageRef;
use super::schema::{ContentSchema, FieldSpec};

/// Identifier assigned by the backend, kept in the JSON type it arrived in
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteId {
    Int(i64),
    Str(String),
}

impl RemoteId {
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(RemoteId::Int),
            Value::String(s) if !s.is_empty() => Some(RemoteId::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            RemoteId::Int(n) => Value::from(*n),
            RemoteId::Str(s) => Value::from(s.as_str()),
        }
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteId::Int(n) => write!(f, "{}", n),
            RemoteId::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Identity of an item in a collection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemId {
    /// Added locally, not created on the backend yet
    Draft(u32),
    Persisted(RemoteId),
}

impl ItemId {
    pub fn is_draft(&self) -> bool {
        matches!(self, ItemId::Draft(_))
    }

    pub fn remote(&self) -> Option<&RemoteId> {
        match self {
            ItemId::Persisted(id) => Some(id),
            ItemId::Draft(_) => None,
        }
    }
}

impl From<RemoteId> for ItemId {
    fn from(id: RemoteId) -> Self {
        ItemId::Persisted(id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Draft(n) => write!(f, "draft-{}", n),
            ItemId::Persisted(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Image(ImageRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    /// Position in display order
    pub sort_id: i64,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Item {
    /// New local item with every field at its default
    pub fn draft(schema: &ContentSchema, draft_no: u32, sort_id: i64) -> Self {
        let fields = schema
            .fields
            .iter()
            .map(|field| match field {
                FieldSpec::Text { name, default } => {
                    (name.clone(), FieldValue::Text(default.clone()))
                }
                FieldSpec::Image { name, .. } => (name.clone(), FieldValue::Image(ImageRef::None)),
            })
            .collect();
        Self {
            id: ItemId::Draft(draft_no),
            sort_id,
            fields,
        }
    }

    /// Decode one fetched record.
    ///
    /// `position` is the record's index in the response, used when the
    /// record carries no `sort_id`.
    pub fn from_record(
        schema: &ContentSchema,
        position: usize,
        record: &Value,
    ) -> Result<Self, StoreError> {
        let object = record.as_object().ok_or_else(|| {
            StoreError::Decode(format!("{} record {} is not an object", schema.name, position))
        })?;

        let id = object
            .get("id")
            .and_then(RemoteId::from_json)
            .ok_or_else(|| {
                StoreError::Decode(format!("{} record {} has no id", schema.name, position))
            })?;

        let sort_id = match object.get("sort_id") {
            None | Some(Value::Null) => position as i64 + schema.sort_base.offset(),
            Some(value) => sort_id_from_json(value).ok_or_else(|| {
                StoreError::Decode(format!("{} record {} has a bad sort_id", schema.name, id))
            })?,
        };

        let mut fields = BTreeMap::new();
        for field in &schema.fields {
            match field {
                FieldSpec::Text { name, .. } => {
                    let text = match object.get(name) {
                        Some(Value::String(s)) => s.clone(),
                        None | Some(Value::Null) => String::new(),
                        Some(other) => other.to_string(),
                    };
                    fields.insert(name.clone(), FieldValue::Text(text));
                }
                FieldSpec::Image { name, wire_key, wire } => {
                    let image = match object.get(wire_key).and_then(Value::as_str) {
                        None | Some("") => ImageRef::None,
                        Some(raw) => ImageRef::from_wire(raw, *wire).map_err(|e| {
                            StoreError::Decode(format!(
                                "{} record {} field {}: {}",
                                schema.name, id, wire_key, e
                            ))
                        })?,
                    };
                    fields.insert(name.clone(), FieldValue::Image(image));
                }
            }
        }

        Ok(Self {
            id: ItemId::Persisted(id),
            sort_id,
            fields,
        })
    }

    pub fn is_draft(&self) -> bool {
        self.id.is_draft()
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn image(&self, name: &str) -> Option<&ImageRef> {
        match self.fields.get(name) {
            Some(FieldValue::Image(image)) => Some(image),
            _ => None,
        }
    }

    pub fn set_text(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), FieldValue::Text(value.into()));
    }

    pub fn set_image(&mut self, name: &str, image: ImageRef) {
        self.fields.insert(name.to_string(), FieldValue::Image(image));
    }

    /// Label for list views: the first non-empty text field, else the type and id
    pub fn title(&self, schema: &ContentSchema) -> String {
        schema
            .text_fields()
            .find_map(|(name, _)| self.text(name).filter(|text| !text.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", schema.name, self.id))
    }
}

fn sort_id_from_json(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_draft_uses_defaults() {
        let item = Item::draft(&ContentSchema::home(), 1, 4);
        assert!(item.is_draft());
        assert_eq!(item.sort_id, 4);
        assert_eq!(item.text("header"), Some("New Header"));
        assert_eq!(item.image("image"), Some(&ImageRef::None));
    }

    #[test]
    fn test_from_record_base64_image() {
        let record = json!({
            "id": 7,
            "sort_id": 2,
            "header": "Welcome",
            "paragraph_1": null,
            "image": "R0lG"
        });
        let item = Item::from_record(&ContentSchema::home(), 0, &record).unwrap();
        assert_eq!(item.id, ItemId::Persisted(RemoteId::Int(7)));
        assert_eq!(item.sort_id, 2);
        assert_eq!(item.text("header"), Some("Welcome"));
        assert_eq!(item.text("paragraph_1"), Some(""));
        assert_eq!(
            item.image("image"),
            Some(&ImageRef::Inline {
                bytes: b"GIF".to_vec(),
                mime: "image/png".to_string()
            })
        );
    }

    #[test]
    fn test_from_record_hosted_image_and_string_id() {
        let record = json!({
            "id": "a1",
            "title": "Castle",
            "image_main_url": "https://cdn.example.com/castle.png",
            "image_1_url": null
        });
        let item = Item::from_record(&ContentSchema::game(), 3, &record).unwrap();
        assert_eq!(item.id.to_string(), "a1");
        // No sort_id: position plus base
        assert_eq!(item.sort_id, 4);
        assert_eq!(
            item.image("image_main"),
            Some(&ImageRef::Hosted("https://cdn.example.com/castle.png".to_string()))
        );
        assert_eq!(item.image("image_1"), Some(&ImageRef::None));
    }

    #[test]
    fn test_from_record_rejects_missing_id() {
        let err = Item::from_record(&ContentSchema::phone(), 0, &json!({"number": "1"}));
        assert!(matches!(err, Err(StoreError::Decode(_))));
    }

    #[test]
    fn test_title_falls_back_to_id() {
        let record = json!({"id": 3, "image": null});
        let item = Item::from_record(&ContentSchema::gallery(), 0, &record).unwrap();
        assert_eq!(item.title(&ContentSchema::gallery()), "gallery 3");
    }

    #[test]
    fn test_remote_id_serializes_untagged() {
        assert_eq!(serde_json::to_value(RemoteId::Int(3)).unwrap(), json!(3));
        assert_eq!(serde_json::to_value(RemoteId::Str("x".into())).unwrap(), json!("x"));
    }
}
