pub mod client;
pub mod folders;
pub mod messages;
pub mod models;
pub mod store;

pub use client::GraphClient;
pub use models::{DraftRequest, FolderCreation, FolderView, Message};
pub use store::MailStore;
