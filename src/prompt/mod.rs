pub mod template;

pub use template::{Placeholder, PromptSpec, PromptTemplate, PromptVars, RenderedPrompt};
