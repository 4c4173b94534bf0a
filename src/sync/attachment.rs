//! Attachment Encoding
//!
//! Turns a resolved `ImageRef` into the multipart part the backend expects.

use crate::domain::{guess_mime, Attachment, EncodingError, ImageRef};
use crate::remote::ImageFetcher;

/// Attachment for one image field, `None` when there is no image to send.
///
/// Hosted images are downloaded and re-uploaded verbatim.
pub async fn encode_attachment<F>(
    fetcher: &F,
    part: &str,
    image: &ImageRef,
) -> Result<Option<Attachment>, EncodingError>
where
    F: ImageFetcher + ?Sized,
{
    match image {
        ImageRef::None => Ok(None),
        ImageRef::Inline { bytes, mime } => Ok(Some(Attachment::new(part, mime, bytes.clone()))),
        ImageRef::Hosted(url) => {
            let fetched = fetcher
                .fetch_image(url)
                .await
                .map_err(|source| EncodingError::Fetch {
                    url: url.clone(),
                    source,
                })?;
            let mime = fetched.mime.unwrap_or_else(|| guess_mime(url));
            Ok(Some(Attachment::new(part, &mime, fetched.bytes)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{decode_data_uri, StoreError};
    use crate::remote::{MemoryStore, Operation};

    #[tokio::test]
    async fn test_inline_keeps_bytes_and_mime() {
        let store = MemoryStore::new();
        let (mime, bytes) = decode_data_uri("data:image/jpeg;base64,/9j/4A==").unwrap();
        let image = ImageRef::Inline {
            bytes: bytes.clone(),
            mime,
        };

        let attachment = encode_attachment(&store, "image_1", &image).await.unwrap().unwrap();
        assert_eq!(attachment.bytes, bytes);
        assert_eq!(attachment.mime, "image/jpeg");
        assert_eq!(attachment.filename, "image_1.jpeg");
        assert!(store.journal().await.is_empty());
    }

    #[tokio::test]
    async fn test_none_attaches_nothing() {
        let store = MemoryStore::new();
        assert_eq!(encode_attachment(&store, "image", &ImageRef::None).await, Ok(None));
    }

    #[tokio::test]
    async fn test_hosted_is_fetched() {
        let store = MemoryStore::new();
        store
            .host_image("https://cdn.example.com/logo.gif", vec![7, 7], None)
            .await;

        let image = ImageRef::Hosted("https://cdn.example.com/logo.gif".to_string());
        let attachment = encode_attachment(&store, "image", &image).await.unwrap().unwrap();
        assert_eq!(attachment.bytes, vec![7, 7]);
        assert_eq!(attachment.mime, "image/gif");
        assert_eq!(store.journal().await, vec!["GET https://cdn.example.com/logo.gif"]);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_encoding_error() {
        let store = MemoryStore::new();
        store
            .fail_next(Operation::FetchImage, StoreError::Network("offline".into()))
            .await;

        let image = ImageRef::Hosted("https://cdn.example.com/a.png".to_string());
        let err = encode_attachment(&store, "image", &image).await.unwrap_err();
        assert!(matches!(err, EncodingError::Fetch { .. }));
    }
}
