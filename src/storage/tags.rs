//! Tag repository for JSON storage

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{OwnerId, Tag, TagId};

use super::file_io::{read_json, write_json_atomic};

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct TagData {
    tags: Vec<Tag>,
}

/// Repository for tag persistence
pub struct TagRepository {
    path: PathBuf,
    tags: RwLock<HashMap<TagId, Tag>>,
}

impl TagRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            tags: RwLock::new(HashMap::new()),
        }
    }

    /// Load tags from disk
    pub fn load(&self) -> LedgerResult<()> {
        let file_data: TagData = read_json(&self.path)?;
        let mut tags = self
            .tags
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        tags.clear();
        tags.extend(file_data.tags.into_iter().map(|tag| (tag.id, tag)));
        Ok(())
    }

    fn write_snapshot(path: &Path, tags: &HashMap<TagId, Tag>) -> LedgerResult<()> {
        let mut list: Vec<_> = tags.values().cloned().collect();
        list.sort_by(|a, b| a.owner_id.cmp(&b.owner_id).then_with(|| a.name.cmp(&b.name)));
        write_json_atomic(path, &TagData { tags: list })
    }

    /// Get a tag by ID
    pub fn get(&self, id: TagId) -> LedgerResult<Option<Tag>> {
        let tags = self
            .tags
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(tags.get(&id).cloned())
    }

    /// All tags of an owner, sorted by name
    pub fn list_for_owner(&self, owner: &OwnerId) -> LedgerResult<Vec<Tag>> {
        let tags = self
            .tags
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;

        let mut list: Vec<_> = tags
            .values()
            .filter(|t| &t.owner_id == owner)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    /// Insert `tag` unless its owner already has one with that name
    pub fn insert_if_name_free(&self, tag: Tag) -> LedgerResult<Option<Tag>> {
        let mut tags = self
            .tags
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;

        if tags
            .values()
            .any(|t| t.owner_id == tag.owner_id && t.name == tag.name)
        {
            return Ok(None);
        }

        tags.insert(tag.id, tag.clone());
        if let Err(e) = Self::write_snapshot(&self.path, &tags) {
            tags.remove(&tag.id);
            return Err(e);
        }

        Ok(Some(tag))
    }
}
