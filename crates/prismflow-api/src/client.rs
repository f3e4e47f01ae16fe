//! Authenticated JSON client for the control plane
//!
//! Every remote entity answers with JSON. Non-2xx responses carry a
//! `message_list` whose first entry is surfaced in [`ApiError::Status`].
//! A missing entity is reported either as HTTP 404 or as a body mentioning
//! `INVALID_UUID`; both map to [`ApiError::NotFound`].

use crate::error::{ApiError, Result};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const DEFAULT_PORT: u16 = 9440;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings of one control-plane endpoint
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host name, or a full base URL when it contains a scheme
    pub endpoint: String,
    pub port: Option<u16>,
    pub username: String,
    pub password: String,

    /// Skip TLS certificate verification
    pub insecure: bool,

    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            port: None,
            username: username.into(),
            password: password.into(),
            insecure: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Create ClientConfig from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create ClientConfig from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ApiError::MissingEnvVar(key.to_string()))
        };

        let mut config = Self::new(
            required("PRISM_ENDPOINT")?,
            required("PRISM_USERNAME")?,
            required("PRISM_PASSWORD")?,
        );

        if let Some(port) = lookup("PRISM_PORT") {
            config.port = Some(port.parse().map_err(|_| {
                ApiError::InvalidConfig(format!("PRISM_PORT is not a port number: {}", port))
            })?);
        }

        if let Some(insecure) = lookup("PRISM_INSECURE") {
            config.insecure = matches!(
                insecure.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }

        Ok(config)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        if endpoint.contains("://") {
            match self.port {
                Some(port) => format!("{}:{}", endpoint, port),
                None => endpoint.to_string(),
            }
        } else {
            format!("https://{}:{}", endpoint, self.port.unwrap_or(DEFAULT_PORT))
        }
    }
}

/// JSON-over-HTTPS client with basic authentication
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            username: config.username,
            password: config.password,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.client.get(self.url(path)), path).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.client.post(self.url(path)).json(body), path)
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.client.delete(self.url(path)), path).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<T> {
        let response = request
            .basic_auth(&self.username, Some(&self.password))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("{} -> HTTP {}", path, status.as_u16());

        if !status.is_success() {
            return Err(error_from_response(status.as_u16(), path, &body));
        }

        serde_json::from_str(&body).map_err(ApiError::from)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message_list: Vec<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// Map a non-2xx response to an [`ApiError`]
pub(crate) fn error_from_response(status: u16, path: &str, body: &str) -> ApiError {
    if status == 404 || body.contains("INVALID_UUID") {
        return ApiError::NotFound(path.to_string());
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message_list.into_iter().next())
        .and_then(|m| m.message.or(m.reason))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        });

    ApiError::Status { status, message }
}
