use serde::Serialize;

use crate::mail::DraftFormat;

/// Read-only snapshot of an inbox message taken once per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub body: String,
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderView {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderCreation {
    Created(FolderView),
    /// The store rejected the name because a folder with it already exists.
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftRequest {
    pub subject: String,
    pub body: String,
    pub format: DraftFormat,
    pub to: String,
}
