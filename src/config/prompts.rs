//! Prompt configuration: the classification prompt, per-category reply
//! prompts and the completion model.
//!
//! Older configuration files stored each prompt as a single string with the
//! instructions and the message fields mixed together. Those are split into
//! system/user pairs on first load and written back, so later loads read the
//! structured form directly.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::prompt::{Placeholder, PromptSpec};

pub const DEFAULT_MODEL: &str = "grok-4";
pub const FALLBACK_CATEGORY: &str = "Uncategorized";

const CLASSIFICATION_USER: &str = "Subject: {subject}\nFrom: {sender}\nBody: {body}";
const RESPONSE_USER: &str = "Subject: {subject}\nBody: {body}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptConfiguration {
    #[serde(default = "default_model")]
    pub model: String,
    pub classification: PromptSpec,
    /// Reply prompt per category; `None` disables drafting for it.
    #[serde(default)]
    pub response: BTreeMap<String, Option<PromptSpec>>,
}

impl PromptConfiguration {
    pub fn defaults() -> AppResult<Self> {
        let mut response = BTreeMap::new();
        response.insert(
            "Work".to_string(),
            Some(PromptSpec::new(
                "Draft a professional response. Start with 'Hello,' and end with 'Best regards,'. Be concise.",
                RESPONSE_USER,
            )?),
        );
        response.insert(
            "Personal".to_string(),
            Some(PromptSpec::new(
                "Draft a friendly response. Start with 'Hi,' and end with 'Cheers,'. Be concise.",
                RESPONSE_USER,
            )?),
        );
        response.insert(
            "Urgent".to_string(),
            Some(PromptSpec::new(
                "Draft an urgent response. Highlight key actions.",
                RESPONSE_USER,
            )?),
        );
        response.insert("Promotions".to_string(), None);
        response.insert("Spam".to_string(), None);

        Ok(Self {
            model: DEFAULT_MODEL.to_string(),
            classification: PromptSpec::new(
                "You are a helpful email classifier. Analyze the email and classify it into one category: Work, Personal, Promotions, Spam, Urgent. Return ONLY the category name.",
                CLASSIFICATION_USER,
            )?,
            response,
        })
    }

    /// Reply prompt for `category`, matched exactly first and then ignoring case.
    pub fn response_for(&self, category: &str) -> Option<&PromptSpec> {
        if let Some(entry) = self.response.get(category) {
            return entry.as_ref();
        }

        self.response
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(category))
            .and_then(|(_, entry)| entry.as_ref())
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.response.keys().map(String::as_str)
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptSource {
    Existing,
    Created,
    Migrated,
}

#[derive(Debug, Clone)]
pub struct LoadedPrompts {
    pub config: PromptConfiguration,
    pub source: PromptSource,
}

/// Load the prompt configuration at `path`, writing defaults when the file is
/// absent and migrating the legacy single-string layout in place.
pub fn load_or_init(path: &Path) -> AppResult<LoadedPrompts> {
    if !path.exists() {
        let config = PromptConfiguration::defaults()?;
        save(path, &config)?;
        info!(path = %path.display(), "wrote default prompt configuration");
        return Ok(LoadedPrompts {
            config,
            source: PromptSource::Created,
        });
    }

    let raw = fs::read_to_string(path)?;
    let document: Value = serde_json::from_str(&raw).map_err(|err| {
        AppError::ConfigMigration(format!(
            "{} is not valid JSON: {err}",
            path.display()
        ))
    })?;

    if !is_legacy(&document) {
        let config = serde_json::from_value(document).map_err(|err| {
            AppError::Config(format!(
                "invalid prompt configuration in {}: {err}",
                path.display()
            ))
        })?;
        return Ok(LoadedPrompts {
            config,
            source: PromptSource::Existing,
        });
    }

    let config = migrate(&document).map_err(|err| match err {
        AppError::ConfigMigration(message) => {
            AppError::ConfigMigration(format!("{}: {message}", path.display()))
        }
        other => AppError::ConfigMigration(format!("{}: {other}", path.display())),
    })?;

    let backup = legacy_backup_path(path);
    fs::write(&backup, raw)?;
    save(path, &config)?;
    warn!(
        path = %path.display(),
        backup = %backup.display(),
        "migrated legacy prompt configuration to system/user prompts"
    );

    Ok(LoadedPrompts {
        config,
        source: PromptSource::Migrated,
    })
}

pub fn save(path: &Path, config: &PromptConfiguration) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let payload = serde_json::to_string_pretty(config)?;
    fs::write(path, payload)?;
    Ok(())
}

pub fn legacy_backup_path(path: &Path) -> PathBuf {
    path.with_extension("legacy.json")
}

fn is_legacy(document: &Value) -> bool {
    if document.get("classification").is_some_and(Value::is_string) {
        return true;
    }

    document
        .get("response")
        .and_then(Value::as_object)
        .is_some_and(|entries| entries.values().any(Value::is_string))
}

fn migrate(document: &Value) -> AppResult<PromptConfiguration> {
    let object = document
        .as_object()
        .ok_or_else(|| AppError::ConfigMigration("top level must be an object".to_string()))?;

    let model = match object.get("model") {
        None | Some(Value::Null) => DEFAULT_MODEL.to_string(),
        Some(Value::String(model)) if !model.trim().is_empty() => model.trim().to_string(),
        Some(other) => {
            return Err(AppError::ConfigMigration(format!(
                "`model` must be a non-empty string, got {other}"
            )));
        }
    };

    let classification = object
        .get("classification")
        .ok_or_else(|| AppError::ConfigMigration("missing `classification` prompt".to_string()))
        .and_then(|entry| migrate_entry("classification", entry, CLASSIFICATION_USER))?
        .ok_or_else(|| {
            AppError::ConfigMigration("`classification` prompt cannot be null".to_string())
        })?;

    let mut response = BTreeMap::new();
    match object.get("response") {
        None | Some(Value::Null) => {}
        Some(Value::Object(entries)) => {
            for (category, entry) in entries {
                let spec = migrate_entry(category, entry, RESPONSE_USER)?;
                response.insert(category.clone(), spec);
            }
        }
        Some(other) => {
            return Err(AppError::ConfigMigration(format!(
                "`response` must be an object, got {other}"
            )));
        }
    }

    Ok(PromptConfiguration {
        model,
        classification,
        response,
    })
}

fn migrate_entry(
    purpose: &str,
    entry: &Value,
    default_user: &str,
) -> AppResult<Option<PromptSpec>> {
    let spec = match entry {
        Value::Null => return Ok(None),
        Value::String(text) => {
            let (system, user) = split_legacy_prompt(text, default_user);
            PromptSpec::new(&system, &user)
        }
        Value::Object(_) => serde_json::from_value(entry.clone()).map_err(AppError::from),
        other => {
            return Err(AppError::ConfigMigration(format!(
                "prompt `{purpose}` has unsupported value {other}"
            )));
        }
    };

    spec.map(Some)
        .map_err(|err| AppError::ConfigMigration(format!("prompt `{purpose}`: {err}")))
}

/// Split a legacy prompt at the first line that references a message field.
/// Instructions before it become the system prompt; the rest the user prompt.
fn split_legacy_prompt(text: &str, default_user: &str) -> (String, String) {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if mentions_placeholder(line) {
            let system = text[..offset].trim().to_string();
            let user = text[offset..].trim().to_string();
            return (system, user);
        }
        offset += line.len();
    }

    (text.trim().to_string(), default_user.to_string())
}

fn mentions_placeholder(line: &str) -> bool {
    Placeholder::ALL
        .iter()
        .any(|slot| line.contains(&format!("{{{}}}", slot.name())))
}
