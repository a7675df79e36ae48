use crate::api::GraphClient;
use crate::auth::{
    ClientCredentialsProvider, CredentialProvider, FileTokenStore, StoredTokenProvider,
};
use crate::config::{self, AppPaths, AuthMode, LoadedPrompts, Settings};
use crate::error::AppResult;
use crate::llm::{ClassifierClient, HttpCompletionTransport, RetryConfig};
use crate::output::Output;

/// Process-wide state resolved once at startup and borrowed by commands.
#[derive(Debug)]
pub struct AppContext {
    pub profile: String,
    pub verbose: u8,
    pub paths: AppPaths,
    pub settings: Settings,
    pub token_store: FileTokenStore,
    pub output: Output,
}

impl AppContext {
    pub fn bootstrap(profile: String, json: bool, verbose: u8) -> AppResult<Self> {
        let profile = config::resolve_profile(&profile);
        let paths = AppPaths::discover()?;
        let settings = config::load_settings(&paths, &profile)?;
        let token_store = FileTokenStore::new(paths.clone());
        let output = Output::new(json);

        Ok(Self {
            profile,
            verbose,
            paths,
            settings,
            token_store,
            output,
        })
    }

    pub fn credentials(&self) -> Box<dyn CredentialProvider> {
        match self.settings.auth_mode {
            AuthMode::Delegated => Box::new(StoredTokenProvider::new(
                self.profile.clone(),
                self.settings.clone(),
                self.token_store.clone(),
            )),
            AuthMode::App => Box::new(ClientCredentialsProvider::new(self.settings.clone())),
        }
    }

    pub fn graph_client(&self) -> AppResult<GraphClient> {
        Ok(GraphClient::with_base_url(
            self.settings.graph_base_url(),
            self.settings.mailbox_root()?,
        ))
    }

    pub fn classifier(&self) -> AppResult<ClassifierClient<HttpCompletionTransport>> {
        let api_key = self
            .settings
            .completion_api_key(std::env::var(config::settings::COMPLETION_API_KEY_ENV).ok())?;
        let transport = HttpCompletionTransport::new(self.settings.completion_url(), api_key);
        let retry = RetryConfig {
            max_attempts: self.settings.max_attempts(),
            ..RetryConfig::default()
        };

        Ok(ClassifierClient::new(transport, retry))
    }

    pub fn load_prompts(&self) -> AppResult<LoadedPrompts> {
        config::load_prompts(&self.paths, &self.profile)
    }
}
