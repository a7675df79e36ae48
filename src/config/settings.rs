use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::mail::DraftFormat;
use crate::mail::normalize::DEFAULT_EXCERPT_CHARS;

const DEFAULT_REDIRECT_URI: &str = "http://localhost:8787/callback";
const DEFAULT_TENANT: &str = "common";
const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const DEFAULT_COMPLETION_URL: &str = "https://api.x.ai/v1/chat/completions";
const DEFAULT_BATCH_SIZE: u32 = 50;
pub const MAX_BATCH_SIZE: u32 = 1000;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_CLASSIFY_MAX_TOKENS: u32 = 50;
const DEFAULT_REPLY_MAX_TOKENS: u32 = 150;

pub const COMPLETION_API_KEY_ENV: &str = "GROK_API_KEY";

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Signed-in user via `auth login`; mailbox is `/me`.
    #[default]
    Delegated,
    /// Client-credentials grant; mailbox is `/users/{mailbox}`.
    App,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub authority_host: Option<String>,
    #[serde(default)]
    pub auth_mode: AuthMode,
    #[serde(default)]
    pub mailbox: Option<String>,
    #[serde(default)]
    pub graph_base_url: Option<String>,
    #[serde(default)]
    pub completion_url: Option<String>,
    #[serde(default)]
    pub completion_api_key: Option<String>,
    #[serde(default)]
    pub batch_size: Option<u32>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub excerpt_chars: Option<usize>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub classify_max_tokens: Option<u32>,
    #[serde(default)]
    pub reply_max_tokens: Option<u32>,
    #[serde(default)]
    pub draft_format: DraftFormat,
}

impl Settings {
    pub fn client_id(&self) -> AppResult<&str> {
        non_empty(self.client_id.as_deref()).ok_or_else(|| {
            AppError::Config(
                "missing oauth client_id in profile settings. add it to your profile json"
                    .to_string(),
            )
        })
    }

    pub fn client_secret(&self) -> Option<&str> {
        non_empty(self.client_secret.as_deref())
    }

    pub fn tenant_id(&self) -> &str {
        non_empty(self.tenant_id.as_deref()).unwrap_or(DEFAULT_TENANT)
    }

    pub fn authority_host(&self) -> &str {
        non_empty(self.authority_host.as_deref())
            .unwrap_or(DEFAULT_AUTHORITY_HOST)
            .trim_end_matches('/')
    }

    pub fn redirect_uri(&self) -> String {
        self.redirect_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string())
    }

    pub fn graph_base_url(&self) -> &str {
        non_empty(self.graph_base_url.as_deref()).unwrap_or(DEFAULT_GRAPH_BASE_URL)
    }

    /// Path prefix of the mailbox the pipeline works on.
    pub fn mailbox_root(&self) -> AppResult<String> {
        match self.auth_mode {
            AuthMode::Delegated => Ok("me".to_string()),
            AuthMode::App => {
                let mailbox = non_empty(self.mailbox.as_deref()).ok_or_else(|| {
                    AppError::Config(
                        "auth_mode `app` requires `mailbox` (the user principal name to triage)"
                            .to_string(),
                    )
                })?;
                Ok(format!("users/{mailbox}"))
            }
        }
    }

    pub fn completion_url(&self) -> &str {
        non_empty(self.completion_url.as_deref()).unwrap_or(DEFAULT_COMPLETION_URL)
    }

    /// API key for the completion service; the environment wins over the profile.
    pub fn completion_api_key(&self, env_value: Option<String>) -> AppResult<String> {
        env_value
            .filter(|value| !value.trim().is_empty())
            .or_else(|| non_empty(self.completion_api_key.as_deref()).map(ToOwned::to_owned))
            .ok_or_else(|| {
                AppError::Config(format!(
                    "missing completion api key. set {COMPLETION_API_KEY_ENV} or `completion_api_key` in your profile json"
                ))
            })
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
            .unwrap_or(DEFAULT_BATCH_SIZE)
            .clamp(1, MAX_BATCH_SIZE)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
            .filter(|value| *value > 0)
            .unwrap_or(self.batch_size() as usize)
    }

    pub fn excerpt_chars(&self) -> usize {
        self.excerpt_chars.unwrap_or(DEFAULT_EXCERPT_CHARS)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS).max(1)
    }

    pub fn classify_max_tokens(&self) -> u32 {
        self.classify_max_tokens
            .unwrap_or(DEFAULT_CLASSIFY_MAX_TOKENS)
    }

    pub fn reply_max_tokens(&self) -> u32 {
        self.reply_max_tokens.unwrap_or(DEFAULT_REPLY_MAX_TOKENS)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

pub fn load(path: PathBuf) -> AppResult<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let raw = fs::read_to_string(path)?;
    let settings = serde_json::from_str(&raw)?;
    Ok(settings)
}

pub fn save(path: PathBuf, settings: &Settings) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let payload = serde_json::to_string_pretty(settings)?;
    fs::write(&path, payload)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let mut perms = fs::metadata(&path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&path, perms)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_profile_uses_defaults() {
        let settings: Settings = serde_json::from_str("{}").expect("parse");
        assert_eq!(settings.auth_mode, AuthMode::Delegated);
        assert_eq!(settings.tenant_id(), "common");
        assert_eq!(settings.batch_size(), 50);
        assert_eq!(settings.concurrency(), 50);
        assert_eq!(settings.excerpt_chars(), 500);
        assert_eq!(settings.max_attempts(), 3);
        assert_eq!(settings.draft_format, DraftFormat::Text);
        assert_eq!(settings.mailbox_root().expect("root"), "me");
    }

    #[test]
    fn app_mode_requires_mailbox() {
        let mut settings: Settings =
            serde_json::from_str(r#"{"auth_mode":"app"}"#).expect("parse");
        assert!(settings.mailbox_root().is_err());

        settings.mailbox = Some("owner@example.com".to_string());
        assert_eq!(
            settings.mailbox_root().expect("root"),
            "users/owner@example.com"
        );
    }

    #[test]
    fn batch_size_is_clamped() {
        let settings = Settings {
            batch_size: Some(0),
            ..Settings::default()
        };
        assert_eq!(settings.batch_size(), 1);

        let settings = Settings {
            batch_size: Some(50_000),
            ..Settings::default()
        };
        assert_eq!(settings.batch_size(), 1000);
    }

    #[test]
    fn environment_api_key_wins() {
        let settings = Settings {
            completion_api_key: Some("from-profile".to_string()),
            ..Settings::default()
        };
        assert_eq!(
            settings
                .completion_api_key(Some("from-env".to_string()))
                .expect("key"),
            "from-env"
        );
        assert_eq!(
            settings.completion_api_key(Some(" ".to_string())).expect("key"),
            "from-profile"
        );
        assert!(Settings::default().completion_api_key(None).is_err());
    }
}
