pub mod paths;
pub mod profile;
pub mod prompts;
pub mod settings;

pub use paths::AppPaths;
pub use profile::resolve_profile;
pub use prompts::{LoadedPrompts, PromptConfiguration, PromptSource};
pub use settings::{AuthMode, Settings};

use crate::error::AppResult;

pub fn load_settings(paths: &AppPaths, profile: &str) -> AppResult<Settings> {
    settings::load(paths.settings_file(profile))
}

pub fn save_settings(paths: &AppPaths, profile: &str, settings: &Settings) -> AppResult<()> {
    settings::save(paths.settings_file(profile), settings)
}

pub fn load_prompts(paths: &AppPaths, profile: &str) -> AppResult<LoadedPrompts> {
    prompts::load_or_init(&paths.prompts_file(profile))
}
