use serde::Serialize;

use crate::cli::PromptsCommand;
use crate::config::PromptSource;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::output::json;

#[derive(Debug, Serialize)]
struct PromptsPath {
    profile: String,
    path: String,
}

#[derive(Debug, Serialize)]
struct PromptsCheck {
    profile: String,
    path: String,
    source: PromptSource,
    model: String,
    categories: Vec<String>,
    drafting: Vec<String>,
}

pub async fn run(ctx: &AppContext, command: PromptsCommand) -> AppResult<()> {
    let path = ctx.paths.prompts_file(&ctx.profile);

    match command {
        PromptsCommand::Path => {
            let value = PromptsPath {
                profile: ctx.profile.clone(),
                path: path.display().to_string(),
            };
            ctx.output.emit(&value.path, &value)
        }
        PromptsCommand::Show => {
            let loaded = ctx.load_prompts()?;
            ctx.output.emit(&json::render(&loaded.config)?, &loaded.config)
        }
        PromptsCommand::Check => {
            let loaded = ctx.load_prompts()?;
            let config = &loaded.config;
            let check = PromptsCheck {
                profile: ctx.profile.clone(),
                path: path.display().to_string(),
                source: loaded.source,
                model: config.model.clone(),
                categories: config.categories().map(ToOwned::to_owned).collect(),
                drafting: config
                    .response
                    .iter()
                    .filter(|(_, spec)| spec.is_some())
                    .map(|(name, _)| name.clone())
                    .collect(),
            };

            let note = match check.source {
                PromptSource::Existing => "",
                PromptSource::Created => " (defaults written)",
                PromptSource::Migrated => " (migrated from legacy format)",
            };
            let text = format!(
                "{}: prompts ok, model {}, {} categories, drafting for {}{note}",
                check.profile,
                check.model,
                check.categories.len(),
                if check.drafting.is_empty() {
                    "none".to_string()
                } else {
                    check.drafting.join(", ")
                },
            );
            ctx.output.emit(&text, &check)
        }
    }
}
