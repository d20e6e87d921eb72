use reqwest::{header::AUTHORIZATION, Client as HttpClient, Method, RequestBuilder};
use serde::de::DeserializeOwned;

use super::ProviderToken;
use crate::error::{Error, Result};

/// HTTP client that sends a provider token with every request
///
/// Built by a binding from the token cached for the caller's session.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    http: HttpClient,
    token: ProviderToken,
}

impl AuthenticatedClient {
    pub fn new(http: HttpClient, token: ProviderToken) -> Self {
        Self { http, token }
    }

    pub fn token(&self) -> &ProviderToken {
        &self.token
    }

    /// Start a request with the `Authorization` header already set
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTHORIZATION, self.authorization())
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// GET `url` and decode a JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| Error::External(format!("Request to provider failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "Provider request failed: {} - {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::External(format!("Failed to parse provider response: {}", e)))
    }

    fn authorization(&self) -> String {
        // Providers answer with "bearer" in any case; APIs expect "Bearer"
        let scheme = match self.token.token_type.as_str() {
            "" => "Bearer",
            t if t.eq_ignore_ascii_case("bearer") => "Bearer",
            t => t,
        };
        format!("{} {}", scheme, self.token.access_token)
    }
}
