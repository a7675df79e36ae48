use std::io::{self, IsTerminal, Write};

use crate::auth::AuthService;
use crate::cli::AuthCommand;
use crate::config::{self, AuthMode, Settings};
use crate::context::AppContext;
use crate::error::{AppError, AppResult};

pub async fn run(ctx: &AppContext, command: AuthCommand) -> AppResult<()> {
    match command {
        AuthCommand::Login => {
            if ctx.settings.auth_mode == AuthMode::App {
                return Err(AppError::InvalidInput(
                    "profile uses auth_mode `app`; tokens come from the client credentials grant and no login is needed"
                        .to_string(),
                ));
            }

            let settings = ensure_login_settings(ctx)?;
            let result = AuthService::login(&ctx.profile, &settings, &ctx.token_store).await?;

            let text = if let Some(email) = result.email.as_ref() {
                format!("{}: logged in as {}", result.profile, email)
            } else {
                format!("{}: {}", result.profile, result.note)
            };
            ctx.output.emit(&text, &result)
        }
        AuthCommand::Status => {
            let status = AuthService::status(&ctx.profile, &ctx.token_store).await?;
            let text = if status.logged_in {
                let expiry = match (status.expired, status.has_refresh_token) {
                    (Some(true), Some(true)) => " (expired, refresh available)",
                    (Some(true), _) => " (expired)",
                    (_, Some(true)) => " (refresh available)",
                    _ => "",
                };
                format!(
                    "{}: logged in{}{}",
                    status.profile,
                    status
                        .email
                        .as_ref()
                        .map(|email| format!(" as {email}"))
                        .unwrap_or_default(),
                    expiry,
                )
            } else {
                format!("{}: logged out", status.profile)
            };

            ctx.output.emit(&text, &status)
        }
        AuthCommand::Logout => {
            let status = AuthService::logout(&ctx.profile, &ctx.token_store).await?;
            let text = format!(
                "{}: logged out ({})",
                status.profile,
                status.note.as_deref().unwrap_or_default()
            );
            ctx.output.emit(&text, &status)
        }
    }
}

/// Prompts for the app registration's client id when the profile lacks one
/// and saves it back to the profile.
fn ensure_login_settings(ctx: &AppContext) -> AppResult<Settings> {
    let mut settings = ctx.settings.clone();
    if settings.client_id().is_ok() {
        return Ok(settings);
    }

    let settings_path = ctx.paths.settings_file(&ctx.profile);
    if !io::stdin().is_terminal() {
        return Err(AppError::Config(format!(
            "missing oauth client_id in {}. run `mailtriage auth login` in an interactive terminal to be prompted, or add it manually",
            settings_path.display(),
        )));
    }

    println!(
        "App registration is missing for profile `{}`.",
        ctx.profile
    );
    println!("Settings will be saved to {}.", settings_path.display());

    settings.client_id = Some(prompt_required("Application (client) id: ")?);

    let tenant = prompt_line(&format!("Tenant [{}]: ", settings.tenant_id()))?;
    if !tenant.is_empty() {
        settings.tenant_id = Some(tenant);
    }

    let default_redirect = settings.redirect_uri();
    let redirect_uri = prompt_line(&format!("Redirect uri [{default_redirect}]: "))?;
    settings.redirect_uri = Some(if redirect_uri.is_empty() {
        default_redirect
    } else {
        redirect_uri
    });

    config::save_settings(&ctx.paths, &ctx.profile, &settings)?;
    println!("Saved profile settings to {}.", settings_path.display());

    Ok(settings)
}

fn prompt_required(prompt: &str) -> AppResult<String> {
    loop {
        let value = prompt_line(prompt)?;
        if !value.is_empty() {
            return Ok(value);
        }
        eprintln!("value is required");
    }
}

fn prompt_line(prompt: &str) -> AppResult<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;

    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}
