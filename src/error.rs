use std::io;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("prompt configuration migration failed: {0}")]
    ConfigMigration(String),
    #[error("prompt template error: {0}")]
    Template(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("failed to fetch messages: {0}")]
    Fetch(String),
    #[error("classification failed: {0}")]
    Classification(String),
    #[error("folder resolution failed: {0}")]
    FolderResolution(String),
    #[error("mailbox update failed: {0}")]
    Mutation(String),
    #[error("api error: {0}")]
    Api(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}
