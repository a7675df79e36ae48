use tracing::info;

use crate::cli::RunArgs;
use crate::config::settings::MAX_BATCH_SIZE;
use crate::config::{PromptSource, Settings};
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::pipeline::{Pipeline, RunOptions};

pub async fn run(ctx: &AppContext, args: RunArgs) -> AppResult<()> {
    let options = run_options(&ctx.settings, &args)?;

    let credentials = ctx.credentials();
    let store = ctx.graph_client()?;
    let classifier = ctx.classifier()?;
    let pipeline = Pipeline::new(credentials.as_ref(), &store, &classifier, options);

    let report = pipeline
        .run(
            || {
                let loaded = ctx.load_prompts()?;
                if loaded.source == PromptSource::Created {
                    info!(
                        path = %ctx.paths.prompts_file(&ctx.profile).display(),
                        "wrote default prompt configuration"
                    );
                }
                Ok(loaded.config)
            },
            |outcome| ctx.output.progress(&outcome.progress_line()),
        )
        .await?;

    ctx.output.emit(&report.summary_line(), &report)
}

fn run_options(settings: &Settings, args: &RunArgs) -> AppResult<RunOptions> {
    let mut options = RunOptions::from_settings(settings);

    if let Some(limit) = args.limit {
        if limit == 0 {
            return Err(AppError::InvalidInput(
                "--limit must be greater than 0".to_string(),
            ));
        }
        options.batch_size = limit.min(MAX_BATCH_SIZE);
    }
    options.dry_run = args.dry_run;

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(limit: Option<u32>) -> RunArgs {
        RunArgs {
            limit,
            dry_run: false,
        }
    }

    #[test]
    fn limit_overrides_configured_batch_size() {
        let options = run_options(&Settings::default(), &args(Some(7))).expect("options");
        assert_eq!(options.batch_size, 7);
    }

    #[test]
    fn limit_is_capped_like_configured_batch_size() {
        let options = run_options(&Settings::default(), &args(Some(5_000))).expect("options");
        assert_eq!(options.batch_size, MAX_BATCH_SIZE);
    }

    #[test]
    fn zero_limit_is_rejected() {
        let err = run_options(&Settings::default(), &args(Some(0))).expect_err("zero limit");
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
