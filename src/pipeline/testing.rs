//! In-memory mailbox used by the pipeline tests.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::api::{DraftRequest, FolderCreation, FolderView, MailStore, Message};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct MailboxState {
    inbox: Vec<Message>,
    folders: Vec<FolderView>,
    moved: Vec<(String, String)>,
    marked_read: Vec<String>,
    drafts: Vec<DraftRequest>,
    create_calls: usize,
    tokens_seen: Vec<String>,
}

#[derive(Default)]
pub struct FakeMailStore {
    state: Mutex<MailboxState>,
    fail_fetch: bool,
    fail_create: bool,
    fail_mutations: bool,
}

impl FakeMailStore {
    pub fn with_message(self, id: &str, subject: &str, sender: &str, body: &str) -> Self {
        self.lock().inbox.push(Message {
            id: id.to_string(),
            subject: subject.to_string(),
            sender: sender.to_string(),
            body: body.to_string(),
            is_read: false,
        });
        self
    }

    pub fn with_folder(self, id: &str, display_name: &str) -> Self {
        self.lock().folders.push(FolderView {
            id: id.to_string(),
            display_name: display_name.to_string(),
        });
        self
    }

    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_mutations(mut self) -> Self {
        self.fail_mutations = true;
        self
    }

    pub fn folder_count(&self) -> usize {
        self.lock().folders.len()
    }

    pub fn folder_names(&self) -> Vec<String> {
        self.lock()
            .folders
            .iter()
            .map(|folder| folder.display_name.clone())
            .collect()
    }

    pub fn folder_id(&self, display_name: &str) -> Option<String> {
        self.lock()
            .folders
            .iter()
            .find(|folder| folder.display_name == display_name)
            .map(|folder| folder.id.clone())
    }

    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    pub fn moved(&self) -> Vec<(String, String)> {
        self.lock().moved.clone()
    }

    pub fn marked_read(&self) -> Vec<String> {
        self.lock().marked_read.clone()
    }

    pub fn drafts(&self) -> Vec<DraftRequest> {
        self.lock().drafts.clone()
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.lock().tokens_seen.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MailboxState> {
        self.state.lock().expect("mailbox state")
    }

    fn record_token(&self, access_token: &str) {
        self.lock().tokens_seen.push(access_token.to_string());
    }
}

#[async_trait]
impl MailStore for FakeMailStore {
    async fn list_unread(&self, access_token: &str, limit: u32) -> AppResult<Vec<Message>> {
        self.record_token(access_token);
        if self.fail_fetch {
            return Err(AppError::Api("service unavailable".to_string()));
        }

        Ok(self
            .lock()
            .inbox
            .iter()
            .filter(|message| !message.is_read)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_child_folders(&self, access_token: &str) -> AppResult<Vec<FolderView>> {
        self.record_token(access_token);
        // Snapshot first, then suspend, so concurrent callers can all observe
        // the same listing before any of them creates.
        let snapshot = self.lock().folders.clone();
        tokio::task::yield_now().await;
        Ok(snapshot)
    }

    async fn create_child_folder(
        &self,
        access_token: &str,
        display_name: &str,
    ) -> AppResult<FolderCreation> {
        self.record_token(access_token);
        let mut state = self.lock();
        state.create_calls += 1;

        if self.fail_create {
            return Err(AppError::Api("quota exceeded".to_string()));
        }

        let exists = state
            .folders
            .iter()
            .any(|folder| folder.display_name.eq_ignore_ascii_case(display_name));
        if exists {
            return Ok(FolderCreation::AlreadyExists);
        }

        let folder = FolderView {
            id: format!("folder-{}", state.folders.len() + 1),
            display_name: display_name.to_string(),
        };
        state.folders.push(folder.clone());
        Ok(FolderCreation::Created(folder))
    }

    async fn move_message(
        &self,
        access_token: &str,
        message_id: &str,
        folder_id: &str,
    ) -> AppResult<String> {
        self.record_token(access_token);
        if self.fail_mutations {
            return Err(AppError::Api("move rejected".to_string()));
        }

        let mut state = self.lock();
        state
            .moved
            .push((message_id.to_string(), folder_id.to_string()));
        Ok(format!("{message_id}@{folder_id}"))
    }

    async fn mark_read(&self, access_token: &str, message_id: &str) -> AppResult<()> {
        self.record_token(access_token);
        if self.fail_mutations {
            return Err(AppError::Api("patch rejected".to_string()));
        }

        self.lock().marked_read.push(message_id.to_string());
        Ok(())
    }

    async fn create_draft(&self, access_token: &str, draft: &DraftRequest) -> AppResult<String> {
        self.record_token(access_token);
        if self.fail_mutations {
            return Err(AppError::Api("draft rejected".to_string()));
        }

        let mut state = self.lock();
        state.drafts.push(draft.clone());
        Ok(format!("draft-{}", state.drafts.len()))
    }
}
