//! Admin Account Bindings

use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::ApiClient;
use crate::context::Session;
use crate::domain::{StoreError, SyncError, SyncResult};

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: String,
    pub token: String,
}

/// A password change whose confirmation has been checked
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    current_password: String,
    new_password: String,
}

impl PasswordChange {
    pub fn new(current: &str, new: &str, confirm: &str) -> SyncResult<Self> {
        if current.is_empty() || new.is_empty() {
            return Err(SyncError::InvalidForm("passwords must not be empty".into()));
        }
        if new != confirm {
            return Err(SyncError::InvalidForm("new passwords do not match".into()));
        }
        Ok(Self {
            current_password: current.to_string(),
            new_password: new.to_string(),
        })
    }
}

impl std::fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordChange { .. }")
    }
}

impl ApiClient {
    fn login_request(&self, username: &str, password: &str) -> Result<RequestBuilder, StoreError> {
        let url = self.endpoint("/admin", &[])?;
        Ok(self
            .request(Method::POST, url)
            .json(&Credentials { username, password }))
    }

    fn change_password_request(
        &self,
        change: &PasswordChange,
    ) -> Result<RequestBuilder, StoreError> {
        let url = self.endpoint("/admin/password", &[])?;
        Ok(self.authorized(Method::PATCH, url)?.json(change))
    }

    /// Exchange credentials for a session token
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, StoreError> {
        let response = self.send(self.login_request(username, password)?).await?;
        let body: LoginResponse = response.json().await?;
        if body.token.trim().is_empty() {
            return Err(StoreError::Decode("login response carries no token".into()));
        }
        log::info!("logged in as {}: {}", username, body.message);
        Ok(Session::with_token(body.token))
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), StoreError> {
        self.send(self.change_password_request(change)?).await?;
        log::info!("admin password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use reqwest::header::AUTHORIZATION;
    use serde_json::{json, Value};

    fn body_json(request: &reqwest::Request) -> Value {
        let bytes = request.body().and_then(|body| body.as_bytes()).unwrap();
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn test_confirmation_must_match() {
        assert!(matches!(
            PasswordChange::new("old", "new", "neu"),
            Err(SyncError::InvalidForm(_))
        ));
        assert!(PasswordChange::new("old", "", "").is_err());
        assert!(PasswordChange::new("old", "new", "new").is_ok());
    }

    #[test]
    fn test_login_request_shape() {
        let api = ApiClient::new(&ClientConfig::new("https://api.example.com"), Session::anonymous())
            .unwrap();
        let request = api.login_request("admin", "pw").unwrap().build().unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.url().path(), "/admin");
        assert!(request.headers().get(AUTHORIZATION).is_none());
        assert_eq!(body_json(&request), json!({"username": "admin", "password": "pw"}));
    }

    #[test]
    fn test_password_request_shape() {
        let api = ApiClient::new(&ClientConfig::new("https://api.example.com"), Session::with_token("t"))
            .unwrap();
        let change = PasswordChange::new("old", "new", "new").unwrap();
        let request = api.change_password_request(&change).unwrap().build().unwrap();
        assert_eq!(request.method(), Method::PATCH);
        assert_eq!(request.url().path(), "/admin/password");
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer t");
        assert_eq!(
            body_json(&request),
            json!({"currentPassword": "old", "newPassword": "new"})
        );
        assert_eq!(format!("{:?}", change), "PasswordChange { .. }");
    }

    #[test]
    fn test_login_response_message_optional() {
        let body: LoginResponse = serde_json::from_str(r#"{"token": "abc"}"#).unwrap();
        assert_eq!(body.token, "abc");
        assert!(body.message.is_empty());
    }
}
