use std::sync::Mutex;
use std::time::SystemTime;

use async_trait::async_trait;
use tracing::debug;

use crate::config::Settings;
use crate::error::{AppError, AppResult};

use super::oauth::AuthService;
use super::token::TokenSet;
use super::token_store::TokenStore;

/// Source of bearer tokens for the mail API.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get_token(&self) -> AppResult<String>;
}

/// Delegated credentials saved by `auth login`, refreshed when expired.
pub struct StoredTokenProvider<S> {
    profile: String,
    settings: Settings,
    store: S,
}

impl<S: TokenStore> StoredTokenProvider<S> {
    pub fn new(profile: impl Into<String>, settings: Settings, store: S) -> Self {
        Self {
            profile: profile.into(),
            settings,
            store,
        }
    }
}

#[async_trait]
impl<S: TokenStore> CredentialProvider for StoredTokenProvider<S> {
    async fn get_token(&self) -> AppResult<String> {
        let token = AuthService::refresh(&self.profile, &self.settings, &self.store).await?;
        Ok(token.access_token)
    }
}

/// App-only credentials, cached in memory until they expire.
pub struct ClientCredentialsProvider {
    settings: Settings,
    cached: Mutex<Option<TokenSet>>,
}

impl ClientCredentialsProvider {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            cached: Mutex::new(None),
        }
    }

    fn cached_token(&self) -> AppResult<Option<String>> {
        let cached = self
            .cached
            .lock()
            .map_err(|_| AppError::Auth("credential cache poisoned".to_string()))?;
        Ok(cached
            .as_ref()
            .filter(|token| !token.is_expired(SystemTime::now()))
            .map(|token| token.access_token.clone()))
    }
}

#[async_trait]
impl CredentialProvider for ClientCredentialsProvider {
    async fn get_token(&self) -> AppResult<String> {
        if let Some(token) = self.cached_token()? {
            return Ok(token);
        }

        debug!("requesting app-only token");
        let token = AuthService::client_credentials(&self.settings).await?;
        let access_token = token.access_token.clone();

        let mut cached = self
            .cached
            .lock()
            .map_err(|_| AppError::Auth("credential cache poisoned".to_string()))?;
        *cached = Some(token);

        Ok(access_token)
    }
}
