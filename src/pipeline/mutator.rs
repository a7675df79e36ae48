use crate::api::{DraftRequest, MailStore};
use crate::error::{AppError, AppResult};
use crate::mail::{DraftFormat, compose};

/// Remote side effects applied to a filed message.
///
/// Every failure comes back as [`AppError::Mutation`]; callers decide whether
/// it is fatal. Nothing is retried here.
pub struct MailboxMutator<'a> {
    store: &'a dyn MailStore,
    access_token: &'a str,
}

impl<'a> MailboxMutator<'a> {
    pub fn new(store: &'a dyn MailStore, access_token: &'a str) -> Self {
        Self {
            store,
            access_token,
        }
    }

    /// Returns the message id in the destination folder.
    pub async fn move_message(&self, message_id: &str, folder_id: &str) -> AppResult<String> {
        self.store
            .move_message(self.access_token, message_id, folder_id)
            .await
            .map_err(|err| AppError::Mutation(format!("move of {message_id} failed: {err}")))
    }

    pub async fn mark_read(&self, message_id: &str) -> AppResult<()> {
        self.store
            .mark_read(self.access_token, message_id)
            .await
            .map_err(|err| AppError::Mutation(format!("mark read of {message_id} failed: {err}")))
    }

    pub async fn create_draft(
        &self,
        subject: &str,
        generated: &str,
        format: DraftFormat,
        recipient: &str,
    ) -> AppResult<String> {
        let draft = DraftRequest {
            subject: compose::reply_subject(subject),
            body: compose::render_draft_body(generated, format),
            format,
            to: recipient.trim().to_string(),
        };

        self.store
            .create_draft(self.access_token, &draft)
            .await
            .map_err(|err| AppError::Mutation(format!("draft to {recipient} failed: {err}")))
    }
}
