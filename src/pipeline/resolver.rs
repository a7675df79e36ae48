use tracing::debug;

use crate::api::{FolderCreation, FolderView, MailStore};
use crate::config::prompts::FALLBACK_CATEGORY;
use crate::error::{AppError, AppResult};

/// Maps category names to Inbox child folders, creating them on first use.
///
/// No local lock guards creation: the store rejects duplicate names and the
/// resolver re-reads the folder list when that happens.
pub struct FolderResolver<'a> {
    store: &'a dyn MailStore,
    access_token: &'a str,
}

impl<'a> FolderResolver<'a> {
    pub fn new(store: &'a dyn MailStore, access_token: &'a str) -> Self {
        Self {
            store,
            access_token,
        }
    }

    pub async fn resolve_or_create(&self, category: &str) -> AppResult<String> {
        let name = folder_name(category);

        if let Some(folder) = self.lookup(name).await? {
            return Ok(folder.id);
        }

        let created = self
            .store
            .create_child_folder(self.access_token, name)
            .await
            .map_err(|err| {
                AppError::FolderResolution(format!("could not create folder `{name}`: {err}"))
            })?;

        match created {
            FolderCreation::Created(folder) => {
                debug!(folder = name, id = %folder.id, "created folder");
                Ok(folder.id)
            }
            FolderCreation::AlreadyExists => {
                debug!(folder = name, "folder created concurrently, re-reading");
                self.lookup(name).await?.map(|folder| folder.id).ok_or_else(|| {
                    AppError::FolderResolution(format!(
                        "folder `{name}` reported as existing but was not listed"
                    ))
                })
            }
        }
    }

    async fn lookup(&self, name: &str) -> AppResult<Option<FolderView>> {
        let folders = self
            .store
            .list_child_folders(self.access_token)
            .await
            .map_err(|err| {
                AppError::FolderResolution(format!("could not list inbox folders: {err}"))
            })?;

        Ok(find_folder(folders, name))
    }
}

pub fn folder_name(category: &str) -> &str {
    let trimmed = category.trim();
    if trimmed.is_empty() {
        FALLBACK_CATEGORY
    } else {
        trimmed
    }
}

fn find_folder(folders: Vec<FolderView>, name: &str) -> Option<FolderView> {
    let wanted = name.to_lowercase();
    folders
        .into_iter()
        .find(|folder| folder.display_name.trim().to_lowercase() == wanted)
}
