//! Image References
//!
//! An image field is resolved once into an `ImageRef`, whether it came from
//! the backend (inline base64 or hosted URL) or from the user picking a file
//! (data URI). Uploads are built from it as an `Attachment`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::error::EncodingError;
use super::schema::ImageWire;

/// Marker the presentation layer shows for "no image"
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

/// Mime type given to inline images from the backend, which carry none
pub const INLINE_IMAGE_MIME: &str = "image/png";

const FALLBACK_MIME: &str = "application/octet-stream";

/// Shortest value in a URL field still read as bare base64
const MIN_BARE_BASE64: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageRef {
    #[default]
    None,
    Inline {
        bytes: Vec<u8>,
        mime: String,
    },
    Hosted(String),
}

impl ImageRef {
    /// Interpret what an image input holds.
    ///
    /// Empty or placeholder → `None`, `data:` → decoded inline bytes,
    /// anything else is taken as the URL of a hosted image.
    pub fn parse(raw: &str) -> Result<Self, EncodingError> {
        let raw = raw.trim();
        if raw.is_empty() || raw == PLACEHOLDER_IMAGE {
            return Ok(ImageRef::None);
        }
        if raw.starts_with("data:") {
            let (mime, bytes) = decode_data_uri(raw)?;
            return Ok(ImageRef::Inline { bytes, mime });
        }
        Ok(ImageRef::Hosted(raw.to_string()))
    }

    /// Inline image from a bare base64 string, as some endpoints return them
    pub fn from_base64(payload: &str) -> Result<Self, EncodingError> {
        Ok(ImageRef::Inline {
            bytes: decode_base64(payload)?,
            mime: INLINE_IMAGE_MIME.to_string(),
        })
    }

    /// Resolve an image value fetched from the backend.
    ///
    /// Backends have stored both bare base64 and hosted URLs under the same
    /// field, so the value's own shape decides. `wire` only settles values
    /// that could be either: a leading `/` (also the first base64 symbol of
    /// every JPEG) or a short token that happens to decode.
    pub fn from_wire(raw: &str, wire: ImageWire) -> Result<Self, EncodingError> {
        let raw = raw.trim();
        if raw.is_empty() || raw == PLACEHOLDER_IMAGE || raw.starts_with("data:") {
            return Self::parse(raw);
        }
        if raw.contains("://") || raw.starts_with("//") {
            return Ok(ImageRef::Hosted(raw.to_string()));
        }
        match wire {
            ImageWire::Base64 => match Self::from_base64(raw) {
                Ok(image) => Ok(image),
                Err(_) if raw.starts_with('/') => Ok(ImageRef::Hosted(raw.to_string())),
                Err(e) => Err(e),
            },
            ImageWire::Url => {
                if raw.starts_with('/') || raw.len() < MIN_BARE_BASE64 {
                    return Ok(ImageRef::Hosted(raw.to_string()));
                }
                Ok(Self::from_base64(raw).unwrap_or_else(|_| ImageRef::Hosted(raw.to_string())))
            }
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ImageRef::None)
    }

    /// String the presentation layer can put in an image source.
    ///
    /// `ImageRef::parse` of the result gives back an equal value.
    pub fn to_source(&self) -> String {
        match self {
            ImageRef::None => PLACEHOLDER_IMAGE.to_string(),
            ImageRef::Inline { bytes, mime } => encode_data_uri(mime, bytes),
            ImageRef::Hosted(url) => url.clone(),
        }
    }
}

/// Decode `data:<mime>;base64,<payload>` into its mime type and bytes.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), EncodingError> {
    let rest = uri.strip_prefix("data:").unwrap_or(uri);
    let (header, payload) = rest.split_once(',').ok_or(EncodingError::MissingComma)?;

    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default().trim();
    if !params.any(|param| param.trim().eq_ignore_ascii_case("base64")) {
        return Err(EncodingError::NotBase64);
    }

    let bytes = decode_base64(payload)?;
    let mime = if mime.is_empty() { FALLBACK_MIME } else { mime };
    Ok((mime.to_string(), bytes))
}

/// Standard base64, tolerating line-wrapped payloads
fn decode_base64(payload: &str) -> Result<Vec<u8>, EncodingError> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| EncodingError::InvalidBase64(e.to_string()))
}

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Binary part of a multipart create/update request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Multipart part name
    pub part: String,
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(part: &str, mime: &str, bytes: Vec<u8>) -> Self {
        Self {
            part: part.to_string(),
            filename: format!("{}.{}", part, extension_for(mime)),
            mime: mime.to_string(),
            bytes,
        }
    }
}

/// File extension for a mime type, preferring the subtype when it is a known extension
fn extension_for(mime: &str) -> &str {
    let Some(extensions) = mime_guess::get_mime_extensions_str(mime) else {
        return "bin";
    };
    let subtype = mime.split('/').nth(1).unwrap_or_default();
    extensions
        .iter()
        .find(|ext| **ext == subtype)
        .or_else(|| extensions.first())
        .copied()
        .unwrap_or("bin")
}

/// Best guess at the mime type of a hosted image from its URL
pub fn guess_mime(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
