use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::api::{MailStore, Message};
use crate::auth::CredentialProvider;
use crate::config::Settings;
use crate::config::prompts::{FALLBACK_CATEGORY, PromptConfiguration};
use crate::error::{AppError, AppResult};
use crate::llm::Completion;
use crate::mail::{DraftFormat, effective_subject, excerpt};
use crate::prompt::{PromptSpec, PromptVars};

use super::mutator::MailboxMutator;
use super::outcome::{ProcessingOutcome, RunReport, Stage};
use super::resolver::FolderResolver;

/// Per-run knobs, fixed before the run starts.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub batch_size: u32,
    pub concurrency: usize,
    pub excerpt_chars: usize,
    pub classify_max_tokens: u32,
    pub reply_max_tokens: u32,
    pub draft_format: DraftFormat,
    pub dry_run: bool,
}

impl RunOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            batch_size: settings.batch_size(),
            concurrency: settings.concurrency(),
            excerpt_chars: settings.excerpt_chars(),
            classify_max_tokens: settings.classify_max_tokens(),
            reply_max_tokens: settings.reply_max_tokens(),
            draft_format: settings.draft_format,
            dry_run: false,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

pub struct Pipeline<'a> {
    credentials: &'a dyn CredentialProvider,
    store: &'a dyn MailStore,
    completion: &'a dyn Completion,
    options: RunOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        credentials: &'a dyn CredentialProvider,
        store: &'a dyn MailStore,
        completion: &'a dyn Completion,
        options: RunOptions,
    ) -> Self {
        Self {
            credentials,
            store,
            completion,
            options,
        }
    }

    /// Runs one triage pass over the unread inbox.
    ///
    /// Only token acquisition, prompt loading and the fetch can fail the run;
    /// every per-message failure is captured in the report. `on_outcome` sees
    /// each outcome as its unit finishes, in completion order.
    pub async fn run<P, F>(&self, load_prompts: P, mut on_outcome: F) -> AppResult<RunReport>
    where
        P: FnOnce() -> AppResult<PromptConfiguration>,
        F: FnMut(&ProcessingOutcome),
    {
        let access_token = self.credentials.get_token().await.map_err(|err| match err {
            AppError::Auth(_) | AppError::Config(_) => err,
            other => AppError::Auth(other.to_string()),
        })?;
        debug!("access token acquired");

        let prompts = load_prompts()?;
        debug!(model = %prompts.model, "prompts loaded");

        let messages = self
            .store
            .list_unread(&access_token, self.options.batch_size)
            .await
            .map_err(|err| match err {
                AppError::Auth(_) => err,
                other => AppError::Fetch(other.to_string()),
            })?;
        info!(count = messages.len(), "fetched unread messages");

        let mut units = stream::iter(messages)
            .map(|message| self.process(&access_token, &prompts, message))
            .buffer_unordered(self.options.concurrency.max(1));

        let mut outcomes = Vec::new();
        while let Some(outcome) = units.next().await {
            on_outcome(&outcome);
            outcomes.push(outcome);
        }

        let report = RunReport::from_outcomes(outcomes, self.options.dry_run);
        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            drafted = report.drafted,
            "run complete"
        );
        Ok(report)
    }

    async fn process(
        &self,
        access_token: &str,
        prompts: &PromptConfiguration,
        message: Message,
    ) -> ProcessingOutcome {
        let subject = effective_subject(&message.subject).to_string();
        let body = excerpt(&message.body, self.options.excerpt_chars);
        let vars = PromptVars {
            subject: &subject,
            sender: &message.sender,
            body: &body,
        };

        let classification = prompts.classification.render(&vars);
        let raw = match self
            .completion
            .classify_or_generate(
                &classification.system,
                &classification.user,
                &prompts.model,
                self.options.classify_max_tokens,
            )
            .await
        {
            Ok(raw) => raw.unwrap_or_default(),
            Err(err) => return failure(&message, &subject, Stage::Classifying, err),
        };
        let category = canonical_category(&raw, prompts.categories());
        debug!(id = %message.id, category = %category, "classified");

        if self.options.dry_run {
            return ProcessingOutcome::Success {
                message_id: message.id,
                subject,
                category,
                folder_id: None,
                draft_created: false,
                warnings: Vec::new(),
            };
        }

        let resolver = FolderResolver::new(self.store, access_token);
        let folder_id = match resolver.resolve_or_create(&category).await {
            Ok(folder_id) => folder_id,
            Err(err) => return failure(&message, &subject, Stage::Filing, err),
        };

        let mutator = MailboxMutator::new(self.store, access_token);
        let mut warnings = Vec::new();

        // Graph hands out a new id once a message changes folders.
        let current_id = match mutator.move_message(&message.id, &folder_id).await {
            Ok(moved_id) => moved_id,
            Err(err) => {
                warn!(id = %message.id, subject = %subject, stage = "move", "{err}");
                warnings.push(err.to_string());
                message.id.clone()
            }
        };

        if let Err(err) = mutator.mark_read(&current_id).await {
            warn!(id = %message.id, subject = %subject, stage = "mark_read", "{err}");
            warnings.push(err.to_string());
        }

        let mut draft_created = false;
        if let Some(spec) = prompts.response_for(&category) {
            let reply = self
                .draft_reply(&mutator, &prompts.model, &subject, &message.sender, &vars, spec)
                .await;
            match reply {
                Ok(()) => draft_created = true,
                Err(err) => {
                    warn!(id = %message.id, subject = %subject, stage = "draft", "{err}");
                    warnings.push(err.to_string());
                }
            }
        }

        ProcessingOutcome::Success {
            message_id: message.id,
            subject,
            category,
            folder_id: Some(folder_id),
            draft_created,
            warnings,
        }
    }

    async fn draft_reply(
        &self,
        mutator: &MailboxMutator<'_>,
        model: &str,
        subject: &str,
        sender: &str,
        vars: &PromptVars<'_>,
        spec: &PromptSpec,
    ) -> AppResult<()> {
        if sender.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "message has no sender address; draft skipped".to_string(),
            ));
        }

        let prompt = spec.render(vars);
        let generated = self
            .completion
            .classify_or_generate(
                &prompt.system,
                &prompt.user,
                model,
                self.options.reply_max_tokens,
            )
            .await?;

        let Some(generated) = generated.filter(|text| !text.trim().is_empty()) else {
            return Err(AppError::Classification(
                "reply generation returned no text; draft skipped".to_string(),
            ));
        };

        mutator
            .create_draft(subject, &generated, self.options.draft_format, sender)
            .await?;
        Ok(())
    }
}

fn failure(message: &Message, subject: &str, stage: Stage, err: AppError) -> ProcessingOutcome {
    warn!(
        id = %message.id,
        subject = %subject,
        stage = stage.as_str(),
        "message skipped: {err}"
    );
    ProcessingOutcome::Failure {
        message_id: message.id.clone(),
        subject: subject.to_string(),
        stage,
        error: err.to_string(),
    }
}

/// Cleans a raw completion into a category label.
///
/// The first line is kept, wrapping quotes/markdown emphasis and trailing
/// punctuation are dropped, and a case-insensitive match against `known`
/// restores the configured spelling.
pub fn canonical_category<'k>(raw: &str, known: impl IntoIterator<Item = &'k str>) -> String {
    let first_line = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();

    let cleaned = strip_decoration(first_line);
    if cleaned.is_empty() {
        return FALLBACK_CATEGORY.to_string();
    }

    let known: Vec<&str> = known.into_iter().collect();
    // "Category: Work" and "Work - meeting request" both name a known folder.
    let labelled = cleaned.rsplit_once(':').map(|(_, value)| value);
    let explained = cleaned.split_once(" - ").map(|(head, _)| head);

    [Some(cleaned), labelled, explained]
        .into_iter()
        .flatten()
        .map(strip_decoration)
        .find_map(|candidate| {
            known
                .iter()
                .find(|name| name.eq_ignore_ascii_case(candidate))
        })
        .map(|name| name.to_string())
        .unwrap_or_else(|| cleaned.to_string())
}

fn strip_decoration(text: &str) -> &str {
    text.trim()
        .trim_start_matches(is_wrapper)
        .trim_end_matches(|ch: char| is_wrapper(ch) || matches!(ch, '.' | '!' | ',' | ';' | ':'))
        .trim()
}

fn is_wrapper(ch: char) -> bool {
    matches!(ch, '"' | '\'' | '`' | '*' | '_')
}
