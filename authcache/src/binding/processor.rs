use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::ProviderBinding;
use crate::provider::AuthenticatedClient;

/// Hook run after a token has been exchanged and cached
///
/// A failure turns the callback response into a 500; the cached token and
/// the session cookie are kept.
#[async_trait]
pub trait PostAuthProcessor: Send + Sync {
    async fn process(
        &self,
        binding: &ProviderBinding,
        client: &AuthenticatedClient,
    ) -> anyhow::Result<()>;
}

/// Receives provider user ids found by [`IdentityLookup`]
#[async_trait]
pub trait IdentitySink: Send + Sync {
    async fn record(&self, binding: &str, id: &str) -> anyhow::Result<()>;
}

/// Post-auth hook that asks the provider who just logged in
///
/// GETs a "current user" endpoint with the fresh token, reads its `id`
/// field (string or number) and passes it to an [`IdentitySink`].
pub struct IdentityLookup {
    url: String,
    sink: Arc<dyn IdentitySink>,
}

impl IdentityLookup {
    pub fn new(url: impl Into<String>, sink: Arc<dyn IdentitySink>) -> Self {
        Self {
            url: url.into(),
            sink,
        }
    }

    /// Facebook Graph API v2.4 `/me`
    pub fn facebook(sink: Arc<dyn IdentitySink>) -> Self {
        Self::new("https://graph.facebook.com/v2.4/me?fields=id", sink)
    }

    /// GitHub REST `/user`
    pub fn github(sink: Arc<dyn IdentitySink>) -> Self {
        Self::new("https://api.github.com/user", sink)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn extract_id(body: &Value) -> Option<String> {
    match body.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[async_trait]
impl PostAuthProcessor for IdentityLookup {
    async fn process(
        &self,
        binding: &ProviderBinding,
        client: &AuthenticatedClient,
    ) -> anyhow::Result<()> {
        let body: Value = client.get_json(&self.url).await?;
        let id = extract_id(&body)
            .ok_or_else(|| anyhow::anyhow!("provider response from {} has no id", self.url))?;

        tracing::debug!(binding = %binding.name(), "Resolved provider user id");
        self.sink.record(binding.name(), &id).await
    }
}
