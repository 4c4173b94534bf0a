//! Contact Page Bindings

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;

use super::content::attachment_part;
use super::ApiClient;
use crate::domain::{Attachment, RemoteId, StoreError};
use crate::remote::{ContactStore, EmailRecord, MediaRecord};

#[derive(Serialize)]
struct EmailBody<'a> {
    address: &'a str,
}

impl ApiClient {
    fn update_email_request(
        &self,
        id: &RemoteId,
        address: &str,
    ) -> Result<RequestBuilder, StoreError> {
        let url = self.endpoint("/email", &[&id.to_string()])?;
        Ok(self.authorized(Method::PUT, url)?.json(&EmailBody { address }))
    }

    fn upload_media_request(
        &self,
        label: &str,
        image: Attachment,
    ) -> Result<RequestBuilder, StoreError> {
        let mut url = self.endpoint("/media", &[])?;
        url.query_pairs_mut().append_pair("q", label);

        let (_, file) = attachment_part(image)?;
        let form = reqwest::multipart::Form::new()
            .text("label", label.to_string())
            .part("image", file);
        Ok(self.authorized(Method::PUT, url)?.multipart(form))
    }
}

#[async_trait]
impl ContactStore for ApiClient {
    async fn list_emails(&self) -> Result<Vec<EmailRecord>, StoreError> {
        let url = self.endpoint("/email", &[])?;
        let response = self.send(self.request(Method::GET, url)).await?;
        Ok(response.json().await?)
    }

    async fn list_media(&self) -> Result<Vec<MediaRecord>, StoreError> {
        let url = self.endpoint("/media", &[])?;
        let response = self.send(self.request(Method::GET, url)).await?;
        Ok(response.json().await?)
    }

    async fn update_email(&self, id: &RemoteId, address: &str) -> Result<(), StoreError> {
        self.send(self.update_email_request(id, address)?).await?;
        Ok(())
    }

    async fn upload_media(&self, label: &str, image: Attachment) -> Result<(), StoreError> {
        self.send(self.upload_media_request(label, image)?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::context::Session;
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

    fn client() -> ApiClient {
        ApiClient::new(
            &ClientConfig::new("https://api.example.com"),
            Session::with_token("secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_email_update_is_json() {
        let request = client()
            .update_email_request(&RemoteId::Int(1), "hi@example.com")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.url().path(), "/email/1");
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer secret");

        let body = request.body().and_then(|body| body.as_bytes()).unwrap();
        let sent: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(sent, serde_json::json!({"address": "hi@example.com"}));
    }

    #[test]
    fn test_media_upload_targets_label() {
        let image = Attachment::new("image", "image/png", vec![0x89]);
        let request = client()
            .upload_media_request("background_image", image)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(
            request.url().as_str(),
            "https://api.example.com/media?q=background_image"
        );
        let content_type = request.headers()[CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data"));
    }

    #[test]
    fn test_media_record_without_image() {
        let records: Vec<MediaRecord> =
            serde_json::from_str(r#"[{"id": 2, "label": "logo"}]"#).unwrap();
        assert_eq!(records[0].label, "logo");
        assert!(records[0].image_url.is_none());
    }
}
