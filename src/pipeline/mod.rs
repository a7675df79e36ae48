pub mod mutator;
pub mod orchestrator;
pub mod outcome;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use mutator::MailboxMutator;
pub use orchestrator::{Pipeline, RunOptions, canonical_category};
pub use outcome::{ProcessingOutcome, RunReport, Stage};
pub use resolver::FolderResolver;
