//! Tag service

use tracing::{info, instrument};

use crate::config::Settings;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{OwnerId, Tag, TagId};
use crate::storage::{Deadlines, Storage};

/// Service for per-owner tags
pub struct TagService<'a> {
    storage: &'a Storage,
    deadlines: Deadlines,
}

impl<'a> TagService<'a> {
    pub fn new(storage: &'a Storage, settings: &Settings) -> Self {
        Self {
            storage,
            deadlines: Deadlines::new(settings.timeouts),
        }
    }

    /// Create a tag; names are unique per owner
    #[instrument(skip(self), fields(owner = %owner))]
    pub fn create(&self, owner: &OwnerId, name: &str) -> LedgerResult<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::Validation("Tag name cannot be empty".into()));
        }

        let repo = &self.storage.tags;
        let tag = self
            .deadlines
            .write("insert tag", || {
                repo.insert_if_name_free(Tag::new(owner.clone(), name))
            })?
            .ok_or_else(|| LedgerError::Conflict {
                entity_type: "Tag",
                identifier: name.to_string(),
            })?;

        info!(id = %tag.id, "created tag");
        Ok(tag)
    }

    pub fn list(&self, owner: &OwnerId) -> LedgerResult<Vec<Tag>> {
        let repo = &self.storage.tags;
        self.deadlines.read("list tags", || repo.list_for_owner(owner))
    }

    pub fn get(&self, owner: &OwnerId, id: TagId) -> LedgerResult<Tag> {
        let repo = &self.storage.tags;
        self.deadlines
            .read("find tag", || repo.get(id))?
            .filter(|t| &t.owner_id == owner)
            .ok_or_else(|| LedgerError::tag_not_found(id.to_string()))
    }
}
