//! HTTP API Client
//!
//! Bindings to the content backend, organized by domain. One `ApiClient`
//! carries the base URL, the HTTP connection pool and the session it was
//! built with; mutating requests take their bearer token from that session.

mod admin;
mod contact;
mod content;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};

use crate::config::ClientConfig;
use crate::context::Session;
use crate::domain::StoreError;

pub use admin::{LoginResponse, PasswordChange};

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            StoreError::Status {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            StoreError::Network(e.to_string())
        }
    }
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    session: Session,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self, StoreError> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| StoreError::Network(format!("invalid API URL {}: {}", config.api_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Network(format!(
                "API URL {} cannot hold paths",
                config.api_url
            )));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    /// Client built from a config, using the token it carries
    pub fn from_config(config: &ClientConfig) -> Result<Self, StoreError> {
        Self::new(config, config.session())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Same connection pool, different credentials
    pub fn with_session(&self, session: Session) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            session,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base_url` with `path` and extra segments appended, each segment encoded
    fn endpoint(&self, path: &str, extra: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::Network(format!("{} cannot hold paths", self.base_url)))?;
            segments.pop_if_empty();
            for segment in path.split('/').filter(|segment| !segment.is_empty()) {
                segments.push(segment);
            }
            for segment in extra {
                segments.push(segment);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        log::debug!("{} {}", method, url);
        self.http.request(method, url)
    }

    /// Request carrying the session's bearer token
    fn authorized(&self, method: Method, url: Url) -> Result<RequestBuilder, StoreError> {
        let builder = self.request(method, url);
        match self.session.bearer() {
            Some(bearer) => {
                let value = HeaderValue::from_str(&bearer)
                    .map_err(|_| StoreError::Network("token is not a valid header value".into()))?;
                Ok(builder.header(AUTHORIZATION, value))
            }
            None => Ok(builder),
        }
    }

    /// Send a request, turning non-2xx statuses into `StoreError::Status`
    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, body))
    }
}

fn status_error(status: StatusCode, body: String) -> StoreError {
    log::warn!("backend answered {}: {}", status, body);
    StoreError::Status {
        status: status.as_u16(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str, session: Session) -> ApiClient {
        ApiClient::new(&ClientConfig::new(url), session).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let api = client("https://api.example.com/v1/", Session::anonymous());
        let url = api.endpoint("/games", &["12"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/games/12");
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let api = client("https://api.example.com", Session::anonymous());
        let url = api.endpoint("/home", &["a b/c"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/home/a%20b%2Fc");
    }

    #[test]
    fn test_authorized_sets_bearer() {
        let api = client("https://api.example.com", Session::with_token("tok"));
        let url = api.endpoint("/home", &[]).unwrap();
        let request = api.authorized(Method::DELETE, url).unwrap().build().unwrap();
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer tok");
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(ApiClient::new(&ClientConfig::new("not a url"), Session::anonymous()).is_err());
        assert!(ApiClient::new(&ClientConfig::new("mailto:a@b.c"), Session::anonymous()).is_err());
    }

    #[test]
    fn test_status_error_keeps_code_and_body() {
        let err = status_error(StatusCode::UNAUTHORIZED, "token expired".to_string());
        assert_eq!(
            err,
            StoreError::Status {
                status: 401,
                body: "token expired".to_string()
            }
        );
    }

    #[test]
    fn test_with_session_keeps_base() {
        let api = client("https://api.example.com", Session::anonymous());
        let signed_in = api.with_session(Session::with_token("t"));
        assert_eq!(signed_in.base_url(), api.base_url());
        assert!(signed_in.session().is_authenticated());
    }
}
