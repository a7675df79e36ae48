pub mod auth;
pub mod prompts;
pub mod run;
