//! Strata HTTP Client
//!
//! A type-safe HTTP client for the Strata pipeline registry API.
//!
//! Every request carries the caller's identity in the `x-strata-user` header.
//!
//! # Example
//!
//! ```no_run
//! use strata_client::StrataClient;
//! use strata_core::dto::pipeline::CreatePipeline;
//!
//! # async fn example() -> strata_client::Result<()> {
//! let client = StrataClient::new("http://localhost:8080", "alice");
//!
//! let created = client
//!     .create_pipeline(&CreatePipeline {
//!         fs_name: Some("data".to_string()),
//!         ..Default::default()
//!     })
//!     .await?;
//!
//! println!("Created pipeline: {}", created.pipeline_id);
//! # Ok(())
//! # }
//! ```

pub mod error;
mod pipelines;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Header carrying the name of the calling user
pub const USER_HEADER: &str = "x-strata-user";

/// HTTP client for the Strata registry API
#[derive(Debug, Clone)]
pub struct StrataClient {
    /// Base URL of the server (e.g., "http://localhost:8080")
    base_url: String,
    /// User every request is made as
    user: String,
    client: Client,
}

impl StrataClient {
    /// Create a new client acting as `user`
    ///
    /// # Example
    /// ```
    /// use strata_client::StrataClient;
    ///
    /// let client = StrataClient::new("http://localhost:8080", "alice");
    /// assert_eq!(client.user(), "alice");
    /// ```
    pub fn new(base_url: impl Into<String>, user: impl Into<String>) -> Self {
        Self::with_client(base_url, user, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, user: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user: user.into(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(self.url(path)).header(USER_HEADER, &self.user)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path)).header(USER_HEADER, &self.user)
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).header(USER_HEADER, &self.user)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = Self::check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content (e.g., DELETE operations)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        Self::check_status(response).await?;
        Ok(())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::debug!("Request failed with status {}: {}", status, body);

        Err(ClientError::from_response(status.as_u16(), &body))
    }
}
