use async_trait::async_trait;

use crate::error::AppResult;

use super::models::{DraftRequest, FolderCreation, FolderView, Message};

/// Remote mailbox operations the triage pipeline depends on.
///
/// Folder operations are scoped to the children of the Inbox.
#[async_trait]
pub trait MailStore: Send + Sync {
    async fn list_unread(&self, access_token: &str, limit: u32) -> AppResult<Vec<Message>>;

    /// Every child folder of the Inbox, across all result pages.
    async fn list_child_folders(&self, access_token: &str) -> AppResult<Vec<FolderView>>;

    async fn create_child_folder(
        &self,
        access_token: &str,
        display_name: &str,
    ) -> AppResult<FolderCreation>;

    /// Moves a message and returns its id in the destination folder.
    async fn move_message(
        &self,
        access_token: &str,
        message_id: &str,
        folder_id: &str,
    ) -> AppResult<String>;

    async fn mark_read(&self, access_token: &str, message_id: &str) -> AppResult<()>;

    /// Creates an unsent draft and returns its id.
    async fn create_draft(&self, access_token: &str, draft: &DraftRequest) -> AppResult<String>;
}
