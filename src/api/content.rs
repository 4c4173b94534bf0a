//! Content Collection Bindings
//!
//! `GET/POST {base}`, `PUT/DELETE {base}/{id}` and `PATCH {base}/reorder`
//! for every content type.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Url};
use serde_json::Value;

use super::ApiClient;
use crate::domain::{Attachment, ContentSchema, RemoteId, StoreError};
use crate::remote::{ContentStore, FetchedImage, ImageFetcher, SortEntry, Submission};

pub(super) fn multipart_form(body: Submission) -> Result<Form, StoreError> {
    let mut form = Form::new();
    for (name, value) in body.fields {
        form = form.text(name, value);
    }
    for attachment in body.attachments {
        let (part, file) = attachment_part(attachment)?;
        form = form.part(part, file);
    }
    Ok(form)
}

pub(super) fn attachment_part(attachment: Attachment) -> Result<(String, Part), StoreError> {
    let Attachment {
        part,
        filename,
        mime,
        bytes,
    } = attachment;
    let file = Part::bytes(bytes).file_name(filename).mime_str(&mime)?;
    Ok((part, file))
}

impl ApiClient {
    fn list_request(&self, schema: &ContentSchema) -> Result<RequestBuilder, StoreError> {
        let url = self.endpoint(&schema.base_path, &[])?;
        Ok(self.request(Method::GET, url))
    }

    fn create_request(
        &self,
        schema: &ContentSchema,
        body: Submission,
    ) -> Result<RequestBuilder, StoreError> {
        let url = self.endpoint(&schema.base_path, &[])?;
        Ok(self.authorized(Method::POST, url)?.multipart(multipart_form(body)?))
    }

    fn update_request(
        &self,
        schema: &ContentSchema,
        id: &RemoteId,
        body: Submission,
    ) -> Result<RequestBuilder, StoreError> {
        let url = self.endpoint(&schema.base_path, &[&id.to_string()])?;
        Ok(self.authorized(Method::PUT, url)?.multipart(multipart_form(body)?))
    }

    fn delete_request(
        &self,
        schema: &ContentSchema,
        id: &RemoteId,
    ) -> Result<RequestBuilder, StoreError> {
        let url = self.endpoint(&schema.base_path, &[&id.to_string()])?;
        self.authorized(Method::DELETE, url)
    }

    fn reorder_request(
        &self,
        schema: &ContentSchema,
        order: &[SortEntry],
    ) -> Result<RequestBuilder, StoreError> {
        let url = self.endpoint(&schema.base_path, &["reorder"])?;
        Ok(self.authorized(Method::PATCH, url)?.json(order))
    }

    /// Absolute image URL; relative ones are resolved against the backend
    fn image_url(&self, url: &str) -> Result<Url, StoreError> {
        self.base_url
            .join(url.trim())
            .map_err(|e| StoreError::Network(format!("invalid image URL {}: {}", url, e)))
    }
}

/// A list response must be a JSON array of records
fn records_from(schema: &ContentSchema, body: Value) -> Result<Vec<Value>, StoreError> {
    match body {
        Value::Array(records) => Ok(records),
        other => Err(StoreError::Decode(format!(
            "expected a list of {} records, got {}",
            schema.name, other
        ))),
    }
}

#[async_trait]
impl ImageFetcher for ApiClient {
    async fn fetch_image(&self, url: &str) -> Result<FetchedImage, StoreError> {
        let url = self.image_url(url)?;
        let response = self.send(self.request(Method::GET, url)).await?;
        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .filter(|value| !value.is_empty());
        let bytes = response.bytes().await?.to_vec();
        Ok(FetchedImage { bytes, mime })
    }
}

#[async_trait]
impl ContentStore for ApiClient {
    async fn list(&self, schema: &ContentSchema) -> Result<Vec<Value>, StoreError> {
        let response = self.send(self.list_request(schema)?).await?;
        records_from(schema, response.json::<Value>().await?)
    }

    async fn create(&self, schema: &ContentSchema, body: Submission) -> Result<(), StoreError> {
        self.send(self.create_request(schema, body)?).await?;
        Ok(())
    }

    async fn update(
        &self,
        schema: &ContentSchema,
        id: &RemoteId,
        body: Submission,
    ) -> Result<(), StoreError> {
        self.send(self.update_request(schema, id, body)?).await?;
        Ok(())
    }

    async fn delete(&self, schema: &ContentSchema, id: &RemoteId) -> Result<(), StoreError> {
        self.send(self.delete_request(schema, id)?).await?;
        Ok(())
    }

    async fn reorder(&self, schema: &ContentSchema, order: &[SortEntry]) -> Result<(), StoreError> {
        self.send(self.reorder_request(schema, order)?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::context::Session;
    use reqwest::header::AUTHORIZATION;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client() -> ApiClient {
        ApiClient::new(
            &ClientConfig::new("https://api.example.com"),
            Session::with_token("secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_list_is_anonymous_get() {
        let request = client()
            .list_request(&ContentSchema::game())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.url().as_str(), "https://api.example.com/games");
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_update_is_authorized_multipart() {
        let body = Submission {
            fields: vec![("url".to_string(), "https://x.com".to_string())],
            attachments: vec![Attachment::new("image", "image/png", vec![1, 2])],
        };
        let request = client()
            .update_request(&ContentSchema::social(), &RemoteId::Int(7), body)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.url().path(), "/social/7");
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer secret");
        let content_type = request.headers()[CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
    }

    #[test]
    fn test_delete_path() {
        let request = client()
            .delete_request(&ContentSchema::phone(), &RemoteId::Str("abc".into()))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::DELETE);
        assert_eq!(request.url().path(), "/phone/abc");
    }

    #[test]
    fn test_reorder_sends_json_entries() {
        let order = vec![
            SortEntry { id: RemoteId::Int(3), sort_id: 1 },
            SortEntry { id: RemoteId::Int(1), sort_id: 2 },
        ];
        let request = client()
            .reorder_request(&ContentSchema::home(), &order)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(request.url().path(), "/home/reorder");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");

        let body = request.body().and_then(|body| body.as_bytes()).unwrap();
        let sent: Value = serde_json::from_slice(body).unwrap();
        assert_eq!(
            sent,
            serde_json::json!([{"id": 3, "sort_id": 1}, {"id": 1, "sort_id": 2}])
        );
    }

    #[test]
    fn test_relative_image_url_uses_base() {
        let api = client();
        assert_eq!(
            api.image_url("/uploads/a.png").unwrap().as_str(),
            "https://api.example.com/uploads/a.png"
        );
        assert_eq!(
            api.image_url("https://cdn.example.com/b.jpg").unwrap().as_str(),
            "https://cdn.example.com/b.jpg"
        );
    }

    #[test]
    fn test_bad_mime_is_rejected() {
        let attachment = Attachment {
            part: "image".to_string(),
            filename: "image.bin".to_string(),
            mime: "not a mime".to_string(),
            bytes: vec![],
        };
        assert!(attachment_part(attachment).is_err());
    }

    #[test]
    fn test_reorder_echoes_string_ids() {
        let order = crate::sync::reorder_payload(
            &[RemoteId::Str("3".into()), RemoteId::Str("1".into()), RemoteId::Str("2".into())],
            ContentSchema::home().sort_base,
        );
        let request = client()
            .reorder_request(&ContentSchema::home(), &order)
            .unwrap()
            .build()
            .unwrap();

        let body = request.body().and_then(|body| body.as_bytes()).unwrap();
        let sent: Value = serde_json::from_slice(body).unwrap();
        assert_eq!(
            sent,
            serde_json::json!([
                {"id": "3", "sort_id": 1},
                {"id": "1", "sort_id": 2},
                {"id": "2", "sort_id": 3}
            ])
        );
    }

    #[test]
    fn test_records_must_be_an_array() {
        let schema = ContentSchema::gallery();
        let records = records_from(&schema, serde_json::json!([{"id": 1}])).unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(
            records_from(&schema, serde_json::json!({"error": "nope"})),
            Err(StoreError::Decode(_))
        ));
    }

    /// Serve one canned HTTP response on a local port and return its base URL
    async fn serve_once(status_line: &str, body: &str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}", addr)
    }

    fn local_client(base: &str) -> ApiClient {
        ApiClient::new(&ClientConfig::new(base), Session::anonymous()).unwrap()
    }

    #[tokio::test]
    async fn test_list_maps_server_error_to_status() {
        let base = serve_once("500 Internal Server Error", "boom").await;
        let err = local_client(&base).list(&ContentSchema::home()).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::Status {
                status: 500,
                body: "boom".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_list_rejects_object_body() {
        let base = serve_once("200 OK", r#"{"ok": true}"#).await;
        let err = local_client(&base).list(&ContentSchema::home()).await.unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
    }

    #[tokio::test]
    async fn test_list_returns_records() {
        let base = serve_once("200 OK", r#"[{"id": 1, "sort_id": 1}]"#).await;
        let records = local_client(&base).list(&ContentSchema::phone()).await.unwrap();
        assert_eq!(records, vec![serde_json::json!({"id": 1, "sort_id": 1})]);
    }
}
