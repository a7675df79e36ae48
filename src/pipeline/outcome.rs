use serde::Serialize;

/// Step of a processing unit at which a message was abandoned.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Classifying,
    Filing,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classifying => "classifying",
            Self::Filing => "filing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessingOutcome {
    Success {
        message_id: String,
        subject: String,
        category: String,
        /// `None` on dry runs, where nothing is filed.
        folder_id: Option<String>,
        draft_created: bool,
        /// Non-fatal move, mark-read and draft failures.
        warnings: Vec<String>,
    },
    Failure {
        message_id: String,
        subject: String,
        stage: Stage,
        error: String,
    },
}

impl ProcessingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn draft_created(&self) -> bool {
        matches!(
            self,
            Self::Success {
                draft_created: true,
                ..
            }
        )
    }

    pub fn progress_line(&self) -> String {
        match self {
            Self::Success {
                subject,
                category,
                folder_id,
                draft_created,
                warnings,
                ..
            } => {
                let mut line = if folder_id.is_some() {
                    format!("filed \"{subject}\" -> {category}")
                } else {
                    format!("would file \"{subject}\" -> {category}")
                };
                if *draft_created {
                    line.push_str(" (draft created)");
                }
                for warning in warnings {
                    line.push_str(&format!("\n  warning: {warning}"));
                }
                line
            }
            Self::Failure {
                message_id,
                subject,
                stage,
                error,
            } => format!(
                "skipped \"{subject}\" ({message_id}) while {}: {error}",
                stage.as_str()
            ),
        }
    }
}

/// Aggregate of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub fetched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub drafted: usize,
    pub dry_run: bool,
    pub outcomes: Vec<ProcessingOutcome>,
}

impl RunReport {
    pub fn from_outcomes(outcomes: Vec<ProcessingOutcome>, dry_run: bool) -> Self {
        let succeeded = outcomes.iter().filter(|outcome| outcome.is_success()).count();
        let drafted = outcomes
            .iter()
            .filter(|outcome| outcome.draft_created())
            .count();

        Self {
            fetched: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            drafted,
            dry_run,
            outcomes,
        }
    }

    pub fn summary_line(&self) -> String {
        let prefix = if self.dry_run { "dry run: " } else { "" };
        format!(
            "{prefix}{} fetched, {} succeeded, {} failed, {} drafted",
            self.fetched, self.succeeded, self.failed, self.drafted
        )
    }
}
