//! Content Schemas
//!
//! Describes one content type of the site: where it lives on the backend,
//! which fields it carries, and how its ordering is numbered.

/// First `sort_id` handed out when a collection is renumbered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBase {
    Zero,
    #[default]
    One,
}

impl SortBase {
    pub fn offset(self) -> i64 {
        match self {
            SortBase::Zero => 0,
            SortBase::One => 1,
        }
    }
}

/// How an image field comes back from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageWire {
    /// Bare base64 string of the image bytes
    Base64,
    /// URL of an already hosted image
    Url,
}

/// One field of a content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSpec {
    Text {
        name: String,
        /// Used for new items and when the field is submitted blank
        default: String,
    },
    Image {
        /// Multipart part name used on upload
        name: String,
        /// Key holding the image in fetched records
        wire_key: String,
        wire: ImageWire,
    },
}

impl FieldSpec {
    pub fn name(&self) -> &str {
        match self {
            FieldSpec::Text { name, .. } | FieldSpec::Image { name, .. } => name,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, FieldSpec::Image { .. })
    }
}

/// Schema of one content type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSchema {
    pub name: String,
    /// Endpoint base path, e.g. `/home`
    pub base_path: String,
    pub fields: Vec<FieldSpec>,
    pub sort_base: SortBase,
}

impl ContentSchema {
    pub fn new(name: &str, base_path: &str) -> Self {
        Self {
            name: name.to_string(),
            base_path: base_path.to_string(),
            fields: Vec::new(),
            sort_base: SortBase::default(),
        }
    }

    pub fn with_text(mut self, name: &str, default: &str) -> Self {
        self.fields.push(FieldSpec::Text {
            name: name.to_string(),
            default: default.to_string(),
        });
        self
    }

    pub fn with_image(mut self, name: &str, wire_key: &str, wire: ImageWire) -> Self {
        self.fields.push(FieldSpec::Image {
            name: name.to_string(),
            wire_key: wire_key.to_string(),
            wire,
        });
        self
    }

    pub fn with_sort_base(mut self, sort_base: SortBase) -> Self {
        self.sort_base = sort_base;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name() == name)
    }

    pub fn text_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().filter_map(|field| match field {
            FieldSpec::Text { name, default } => Some((name.as_str(), default.as_str())),
            FieldSpec::Image { .. } => None,
        })
    }

    pub fn image_fields(&self) -> impl Iterator<Item = (&str, &str, ImageWire)> {
        self.fields.iter().filter_map(|field| match field {
            FieldSpec::Image { name, wire_key, wire } => {
                Some((name.as_str(), wire_key.as_str(), *wire))
            }
            FieldSpec::Text { .. } => None,
        })
    }

    // ========================
    // Built-in Content Types
    // ========================

    pub fn home() -> Self {
        Self::new("home", "/home")
            .with_text("header", "New Header")
            .with_text("paragraph_1", "Enter first paragraph here...")
            .with_text("paragraph_2", "Enter second paragraph here...")
            .with_text("action", "Click here")
            .with_image("image", "image", ImageWire::Base64)
    }

    pub fn about() -> Self {
        Self::new("about", "/about")
            .with_text("title", "New About Section")
            .with_text("paragraph_1", "Enter first paragraph here...")
            .with_text("paragraph_2", "Enter second paragraph here...")
            .with_text("paragraph_3", "Enter third paragraph here...")
            .with_image("image", "image_url", ImageWire::Url)
    }

    pub fn game() -> Self {
        Self::new("game", "/games")
            .with_text("title", "New Game Title")
            .with_text("description_1", "Enter first description here...")
            .with_text("description_2", "Enter second description here...")
            .with_text("url", "https://example.com")
            .with_text("background_color", "#ffffff")
            .with_text("text_color", "#000000")
            .with_image("image_main", "image_main_url", ImageWire::Url)
            .with_image("image_1", "image_1_url", ImageWire::Url)
            .with_image("image_2", "image_2_url", ImageWire::Url)
            .with_image("image_3", "image_3_url", ImageWire::Url)
    }

    pub fn gallery() -> Self {
        Self::new("gallery", "/gallery").with_image("image", "image", ImageWire::Base64)
    }

    pub fn social() -> Self {
        Self::new("social", "/social")
            .with_text("url", "")
            .with_image("image", "image", ImageWire::Base64)
    }

    pub fn phone() -> Self {
        Self::new("phone", "/phone")
            .with_text("number", "")
            .with_image("image", "image", ImageWire::Base64)
    }

    /// Every reorderable content type
    pub fn all() -> Vec<Self> {
        vec![
            Self::home(),
            Self::about(),
            Self::game(),
            Self::gallery(),
            Self::social(),
            Self::phone(),
        ]
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|schema| schema.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let game = ContentSchema::by_name("game").unwrap();
        assert_eq!(game.base_path, "/games");
        assert_eq!(game.image_fields().count(), 4);
        assert_eq!(game.text_fields().count(), 6);
        assert!(ContentSchema::by_name("settings").is_none());
    }

    #[test]
    fn test_builtins_number_from_one() {
        assert!(ContentSchema::all()
            .iter()
            .all(|schema| schema.sort_base == SortBase::One));
        assert_eq!(ContentSchema::home().with_sort_base(SortBase::Zero).sort_base.offset(), 0);
    }

    #[test]
    fn test_field_lookup() {
        let about = ContentSchema::about();
        assert!(about.field("image").unwrap().is_image());
        assert!(!about.field("title").unwrap().is_image());
        assert_eq!(
            about.text_fields().find(|(name, _)| *name == "title"),
            Some(("title", "New About Section"))
        );
    }
}
