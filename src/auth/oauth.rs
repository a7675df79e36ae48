use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use url::Url;

use crate::config::Settings;
use crate::error::{AppError, AppResult};

use super::callback::LoopbackRedirect;
use super::token::TokenSet;
use super::token_store::TokenStore;

const GRAPH_ME_ENDPOINT: &str = "https://graph.microsoft.com/v1.0/me";
const SIGN_IN_WAIT: Duration = Duration::from_secs(180);
const DELEGATED_SCOPES: &str = "offline_access openid email https://graph.microsoft.com/Mail.ReadWrite";
const APP_SCOPE: &str = "https://graph.microsoft.com/.default";

#[derive(Debug, Serialize)]
pub struct AuthLoginResult {
    pub profile: String,
    pub started: bool,
    pub opened_browser: bool,
    pub authorization_url: String,
    pub email: Option<String>,
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub profile: String,
    pub logged_in: bool,
    pub email: Option<String>,
    pub expired: Option<bool>,
    pub expires_in_seconds: Option<i64>,
    pub has_refresh_token: Option<bool>,
    pub note: Option<String>,
}

impl AuthStatus {
    fn signed_out(profile: &str, note: &str) -> Self {
        Self {
            profile: profile.to_string(),
            logged_in: false,
            email: None,
            expired: None,
            expires_in_seconds: None,
            has_refresh_token: None,
            note: Some(note.to_string()),
        }
    }

    fn from_token(profile: &str, token: &TokenSet, now: SystemTime) -> Self {
        Self {
            profile: profile.to_string(),
            logged_in: true,
            email: token.email.clone(),
            expired: Some(token.is_expired(now)),
            expires_in_seconds: token.expires_in_seconds(now),
            has_refresh_token: Some(token.has_refresh_token()),
            note: Some("stored token found".to_string()),
        }
    }
}

/// Sign-in and token upkeep against the Microsoft identity platform.
#[derive(Debug, Default)]
pub struct AuthService;

impl AuthService {
    pub async fn login<S: TokenStore>(
        profile: &str,
        settings: &Settings,
        store: &S,
    ) -> AppResult<AuthLoginResult> {
        let endpoint = TokenEndpoint::from_settings(settings)?;
        let redirect = LoopbackRedirect::parse(&endpoint.redirect_uri)?;
        let pkce = Pkce::generate();
        let state = url_safe_random(32);
        let authorization_url = endpoint.authorization_url(&pkce, &state)?;

        let opened_browser = open_in_browser(&authorization_url);
        if !opened_browser {
            eprintln!("open this URL in your browser to sign in:\n{authorization_url}");
        }

        let code = redirect.receive_code(&state, SIGN_IN_WAIT).await?;
        let mut token = endpoint
            .request(Grant::AuthorizationCode {
                code: &code,
                verifier: &pkce.verifier,
            })
            .await?;
        token.email = mailbox_address(&token.access_token).await;
        store.save(profile, &token)?;

        Ok(AuthLoginResult {
            profile: profile.to_string(),
            started: true,
            opened_browser,
            authorization_url,
            email: token.email,
            note: "signed in; token saved for this profile".to_string(),
        })
    }

    /// Returns the stored token, exchanging its refresh token first when the
    /// access token has expired.
    pub async fn refresh<S: TokenStore>(
        profile: &str,
        settings: &Settings,
        store: &S,
    ) -> AppResult<TokenSet> {
        let endpoint = TokenEndpoint::from_settings(settings)?;

        let Some(current) = store.load(profile)? else {
            return Err(AppError::Auth(
                "not logged in. run `mailtriage auth login`".to_string(),
            ));
        };
        if !current.is_expired(SystemTime::now()) {
            return Ok(current);
        }

        let Some(refresh_token) = current.refresh_token.as_deref() else {
            return Err(AppError::Auth(
                "access token expired and no refresh token is stored. run `mailtriage auth login`"
                    .to_string(),
            ));
        };

        debug!(profile, "refreshing expired access token");
        let mut refreshed = endpoint.request(Grant::RefreshToken(refresh_token)).await?;
        // Rotation is optional on refresh; keep the old token when none comes back.
        refreshed.refresh_token = refreshed.refresh_token.or(current.refresh_token.clone());
        refreshed.email = refreshed.email.or(current.email);

        store.save(profile, &refreshed)?;
        Ok(refreshed)
    }

    /// App-only token for the configured tenant (client-credentials grant).
    pub async fn client_credentials(settings: &Settings) -> AppResult<TokenSet> {
        let endpoint = TokenEndpoint::from_settings(settings)?;
        if endpoint.client_secret.is_none() {
            return Err(AppError::Config(
                "auth_mode `app` requires `client_secret` in profile settings".to_string(),
            ));
        }

        endpoint.request(Grant::ClientCredentials).await
    }

    pub async fn status<S: TokenStore>(profile: &str, store: &S) -> AppResult<AuthStatus> {
        Ok(match store.load(profile)? {
            Some(token) => AuthStatus::from_token(profile, &token, SystemTime::now()),
            None => AuthStatus::signed_out(profile, "no token found"),
        })
    }

    /// Microsoft identity has no token revocation endpoint for public
    /// clients, so logout only forgets the local credentials.
    pub async fn logout<S: TokenStore>(profile: &str, store: &S) -> AppResult<AuthStatus> {
        let had_token = store.load(profile)?.is_some();
        store.clear(profile)?;

        Ok(AuthStatus::signed_out(
            profile,
            if had_token {
                "local credentials removed"
            } else {
                "no local credentials to remove"
            },
        ))
    }
}

enum Grant<'a> {
    AuthorizationCode { code: &'a str, verifier: &'a str },
    RefreshToken(&'a str),
    ClientCredentials,
}

impl Grant<'_> {
    fn name(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken(_) => "refresh_token",
            Self::ClientCredentials => "client_credentials",
        }
    }
}

/// Tenant-scoped authority plus the app registration talking to it.
#[derive(Debug)]
struct TokenEndpoint {
    authority: String,
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: String,
}

impl TokenEndpoint {
    fn from_settings(settings: &Settings) -> AppResult<Self> {
        Ok(Self {
            authority: format!("{}/{}", settings.authority_host(), settings.tenant_id()),
            client_id: settings.client_id()?.to_string(),
            client_secret: settings.client_secret().map(ToOwned::to_owned),
            redirect_uri: settings.redirect_uri(),
        })
    }

    fn authorization_url(&self, pkce: &Pkce, state: &str) -> AppResult<String> {
        let mut url = Url::parse(&format!("{}/oauth2/v2.0/authorize", self.authority))?;
        url.query_pairs_mut().extend_pairs([
            ("client_id", self.client_id.as_str()),
            ("response_type", "code"),
            ("response_mode", "query"),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", DELEGATED_SCOPES),
            ("prompt", "select_account"),
            ("state", state),
            ("code_challenge", pkce.challenge.as_str()),
            ("code_challenge_method", "S256"),
        ]);
        Ok(url.into())
    }

    async fn request(&self, grant: Grant<'_>) -> AppResult<TokenSet> {
        let mut form = vec![
            ("grant_type", grant.name()),
            ("client_id", self.client_id.as_str()),
        ];
        match &grant {
            Grant::AuthorizationCode { code, verifier } => form.extend([
                ("code", *code),
                ("code_verifier", *verifier),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", DELEGATED_SCOPES),
            ]),
            Grant::RefreshToken(refresh_token) => {
                form.extend([("refresh_token", *refresh_token), ("scope", DELEGATED_SCOPES)])
            }
            Grant::ClientCredentials => form.push(("scope", APP_SCOPE)),
        }
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = reqwest::Client::new()
            .post(format!("{}/oauth2/v2.0/token", self.authority))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            let issued: IssuedToken = serde_json::from_str(&body)?;
            return Ok(issued.into_token_set(SystemTime::now()));
        }

        let reason = serde_json::from_str::<RefusedToken>(&body)
            .map(|refused| refused.summary())
            .unwrap_or(body);
        Err(AppError::Auth(format!(
            "{} grant refused ({status}): {reason}",
            grant.name()
        )))
    }
}

#[derive(Debug, Deserialize)]
struct IssuedToken {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    token_type: Option<String>,
    scope: Option<String>,
}

impl IssuedToken {
    fn into_token_set(self, now: SystemTime) -> TokenSet {
        let issued_at = now.duration_since(UNIX_EPOCH).map(|since| since.as_secs());
        TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at_unix: self
                .expires_in
                .zip(issued_at.ok())
                .map(|(lifetime, issued_at)| issued_at.saturating_add(lifetime)),
            token_type: self.token_type,
            scope: self.scope,
            email: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefusedToken {
    error: String,
    #[serde(default)]
    error_description: String,
}

impl RefusedToken {
    /// AADSTS descriptions append trace and correlation ids on later lines.
    fn summary(&self) -> String {
        match self.error_description.lines().next() {
            Some(first) if !first.trim().is_empty() => format!("{} ({})", self.error, first.trim()),
            _ => self.error.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Me {
    mail: Option<String>,
    #[serde(rename = "userPrincipalName")]
    user_principal_name: Option<String>,
}

/// The signed-in mailbox's address; a failed lookup only costs the status line.
async fn mailbox_address(access_token: &str) -> Option<String> {
    let response = reqwest::Client::new()
        .get(GRAPH_ME_ENDPOINT)
        .bearer_auth(access_token)
        .query(&[("$select", "mail,userPrincipalName")])
        .send()
        .await
        .and_then(reqwest::Response::error_for_status);

    let me = match response {
        Ok(response) => response.json::<Me>().await,
        Err(err) => Err(err),
    };
    match me {
        Ok(me) => me.mail.or(me.user_principal_name),
        Err(err) => {
            warn!(error = %err, "could not look up the signed-in address");
            None
        }
    }
}

/// Proof-key pair for the authorization-code grant (S256 method).
struct Pkce {
    verifier: String,
    challenge: String,
}

impl Pkce {
    fn generate() -> Self {
        Self::from_verifier(url_safe_random(64))
    }

    fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

fn url_safe_random(byte_len: usize) -> String {
    let mut bytes = vec![0_u8; byte_len];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn open_in_browser(url: &str) -> bool {
    let (program, leading_args): (&str, &[&str]) = if cfg!(target_os = "macos") {
        ("open", &[])
    } else if cfg!(target_os = "windows") {
        ("cmd", &["/C", "start", ""])
    } else {
        ("xdg-open", &[])
    };

    std::process::Command::new(program)
        .args(leading_args)
        .arg(url)
        .status()
        .is_ok_and(|status| status.success())
}
