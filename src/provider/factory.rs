//! # Client Factory
//!
//! Resolves the [`ControlPlane`] client for one resource. Each resource may name a
//! secret holding its own Aiven token (`authSecretRef`); otherwise the operator-wide
//! default token is used.

use crate::controller::store::{ObjectStore, StoreError};
use crate::crd::AuthSecretReference;
use crate::provider::aiven::AivenRest;
use crate::provider::ControlPlane;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use zeroize::Zeroizing;

/// Errors while resolving credentials
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("auth secret {namespace}/{name} not found")]
    SecretNotFound { namespace: String, name: String },

    #[error("key '{key}' missing from auth secret {namespace}/{name}")]
    KeyMissing {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("token in auth secret {namespace}/{name} is not valid UTF-8")]
    InvalidToken { namespace: String, name: String },

    #[error("no authSecretRef set and no default token configured")]
    NoToken,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to build Aiven client: {0}")]
    Client(String),
}

/// Produces the control-plane client used for one resource pass
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn client_for(
        &self,
        namespace: &str,
        auth: Option<&AuthSecretReference>,
    ) -> Result<Arc<dyn ControlPlane>, CredentialsError>;
}

/// Builds [`AivenRest`] clients from tokens stored in Kubernetes secrets
pub struct TokenClientFactory {
    store: Arc<dyn ObjectStore>,
    http: reqwest::Client,
    api_url: String,
    default_token: Option<Zeroizing<String>>,
}

impl fmt::Debug for TokenClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClientFactory")
            .field("api_url", &self.api_url)
            .field("has_default_token", &self.default_token.is_some())
            .finish_non_exhaustive()
    }
}

impl TokenClientFactory {
    #[must_use]
    pub fn new(
        store: Arc<dyn ObjectStore>,
        http: reqwest::Client,
        api_url: impl Into<String>,
        default_token: Option<Zeroizing<String>>,
    ) -> Self {
        Self {
            store,
            http,
            api_url: api_url.into(),
            default_token,
        }
    }

    async fn token(
        &self,
        namespace: &str,
        auth: Option<&AuthSecretReference>,
    ) -> Result<Zeroizing<String>, CredentialsError> {
        let Some(auth) = auth else {
            return self.default_token.clone().ok_or(CredentialsError::NoToken);
        };
        let secret = self
            .store
            .get_secret(namespace, &auth.name)
            .await?
            .ok_or_else(|| CredentialsError::SecretNotFound {
                namespace: namespace.to_string(),
                name: auth.name.clone(),
            })?;

        if let Some(value) = secret.string_data.as_ref().and_then(|d| d.get(&auth.key)) {
            return Ok(Zeroizing::new(value.trim().to_string()));
        }
        let bytes = secret
            .data
            .as_ref()
            .and_then(|d| d.get(&auth.key))
            .ok_or_else(|| CredentialsError::KeyMissing {
                namespace: namespace.to_string(),
                name: auth.name.clone(),
                key: auth.key.clone(),
            })?;
        let token = std::str::from_utf8(&bytes.0).map_err(|_utf8| CredentialsError::InvalidToken {
            namespace: namespace.to_string(),
            name: auth.name.clone(),
        })?;
        Ok(Zeroizing::new(token.trim().to_string()))
    }
}

#[async_trait]
impl ClientFactory for TokenClientFactory {
    async fn client_for(
        &self,
        namespace: &str,
        auth: Option<&AuthSecretReference>,
    ) -> Result<Arc<dyn ControlPlane>, CredentialsError> {
        let token = self.token(namespace, auth).await?;
        let client = AivenRest::new(self.http.clone(), &self.api_url, token)
            .map_err(|e| CredentialsError::Client(format!("{e:#}")))?;
        Ok(Arc::new(client))
    }
}

/// Hands out the same client for every resource
pub struct StaticClientFactory {
    client: Arc<dyn ControlPlane>,
}

impl fmt::Debug for StaticClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticClientFactory").finish_non_exhaustive()
    }
}

impl StaticClientFactory {
    #[must_use]
    pub fn new(client: Arc<dyn ControlPlane>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClientFactory for StaticClientFactory {
    async fn client_for(
        &self,
        _namespace: &str,
        _auth: Option<&AuthSecretReference>,
    ) -> Result<Arc<dyn ControlPlane>, CredentialsError> {
        Ok(Arc::clone(&self.client))
    }
}
