//! Loopback receiver for the authorization-code redirect.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time;
use tracing::debug;
use url::Url;

use crate::error::{AppError, AppResult};

const MAX_REQUEST_LINE_BYTES: u64 = 8 * 1024;

/// The `http://host:port/path` the identity platform redirects the browser to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopbackRedirect {
    host: String,
    port: u16,
    path: String,
}

impl LoopbackRedirect {
    pub fn parse(redirect_uri: &str) -> AppResult<Self> {
        let url = Url::parse(redirect_uri)?;
        if url.scheme() != "http" {
            return Err(AppError::Config(format!(
                "redirect_uri `{redirect_uri}` must be a plain http loopback address"
            )));
        }

        let (Some(host), Some(port)) = (url.host_str(), url.port_or_known_default()) else {
            return Err(AppError::Config(format!(
                "redirect_uri `{redirect_uri}` needs a host and port"
            )));
        };

        Ok(Self {
            host: host.to_string(),
            port,
            path: url.path().to_string(),
        })
    }

    /// Listens for one redirect and returns its authorization code once the
    /// `state` round-trips unchanged.
    pub async fn receive_code(&self, expected_state: &str, wait: Duration) -> AppResult<String> {
        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .await
            .map_err(|err| {
                AppError::Auth(format!(
                    "cannot listen for the sign-in redirect on {}:{}: {err}",
                    self.host, self.port
                ))
            })?;

        match time::timeout(wait, self.answer_one(&listener, expected_state)).await {
            Ok(code) => code,
            Err(_) => Err(AppError::Auth(format!(
                "no sign-in redirect arrived within {}s",
                wait.as_secs()
            ))),
        }
    }

    async fn answer_one(&self, listener: &TcpListener, expected_state: &str) -> AppResult<String> {
        let (mut stream, peer) = listener.accept().await?;
        debug!(%peer, "sign-in redirect connected");

        let mut request_line = String::new();
        BufReader::new(&mut stream)
            .take(MAX_REQUEST_LINE_BYTES)
            .read_line(&mut request_line)
            .await?;

        let mut words = request_line.split_whitespace();
        let code = match (words.next(), words.next()) {
            (Some("GET"), Some(target)) => CallbackQuery::parse(target, &self.path)
                .and_then(|query| query.into_code(expected_state)),
            (Some(verb), Some(_)) => Err(AppError::Auth(format!(
                "sign-in redirect arrived as {verb}, expected GET"
            ))),
            _ => Err(AppError::Auth(
                "sign-in redirect request line was unreadable".to_string(),
            )),
        };

        let page = match &code {
            Ok(_) => BrowserPage::Done,
            Err(err) => BrowserPage::Failed(err.to_string()),
        };
        if let Err(err) = page.send(&mut stream).await {
            debug!(error = %err, "could not answer the browser");
        }

        code
    }
}

/// Query parameters carried by the redirect.
#[derive(Debug, Default)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl CallbackQuery {
    fn parse(target: &str, expected_path: &str) -> AppResult<Self> {
        let url = Url::parse("http://localhost/")?.join(target)?;
        if url.path() != expected_path {
            return Err(AppError::Auth(format!(
                "sign-in redirect hit {} instead of {expected_path}",
                url.path()
            )));
        }

        let mut query = Self::default();
        for (key, value) in url.query_pairs() {
            let slot = match key.as_ref() {
                "code" => &mut query.code,
                "state" => &mut query.state,
                "error" => &mut query.error,
                "error_description" => &mut query.error_description,
                _ => continue,
            };
            *slot = Some(value.into_owned());
        }
        Ok(query)
    }

    fn into_code(self, expected_state: &str) -> AppResult<String> {
        if let Some(error) = self.error {
            let detail = self.error_description.unwrap_or_default();
            return Err(AppError::Auth(format!(
                "authorization was refused: {error} {detail}"
            )));
        }

        if self.state.as_deref() != Some(expected_state) {
            return Err(AppError::Auth(
                "sign-in redirect carried an unexpected state; login aborted".to_string(),
            ));
        }

        self.code
            .filter(|code| !code.is_empty())
            .ok_or_else(|| AppError::Auth("sign-in redirect carried no code".to_string()))
    }
}

enum BrowserPage {
    Done,
    Failed(String),
}

impl BrowserPage {
    async fn send(&self, stream: &mut TcpStream) -> AppResult<()> {
        let (status, text) = match self {
            Self::Done => (
                "200 OK",
                "mailtriage is signed in. You can close this tab.",
            ),
            Self::Failed(reason) => ("400 Bad Request", reason.as_str()),
        };

        let body = format!(
            "<!doctype html><title>mailtriage</title><p>{}</p>",
            html_escape::encode_text(text)
        );
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );

        stream.write_all(head.as_bytes()).await?;
        stream.write_all(body.as_bytes()).await?;
        stream.shutdown().await?;
        Ok(())
    }
}
