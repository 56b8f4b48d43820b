//! Category repository for JSON storage
//!
//! Manages loading and saving categories to categories.json. Name uniqueness
//! is per owner and is checked under the same write lock as the insert.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Category, CategoryId, OwnerId};

use super::file_io::{read_json, write_json_atomic};
use super::CategoryLookup;

/// Serializable category data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct CategoryData {
    categories: Vec<Category>,
}

type Categories = HashMap<CategoryId, Category>;

/// Repository for category persistence
pub struct CategoryRepository {
    path: PathBuf,
    categories: RwLock<Categories>,
}

impl CategoryRepository {
    /// Create a new category repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            categories: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, Categories>> {
        self.categories
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, Categories>> {
        self.categories
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))
    }

    /// Load categories from disk
    pub fn load(&self) -> LedgerResult<()> {
        let file_data: CategoryData = read_json(&self.path)?;
        let mut categories = self.write()?;

        categories.clear();
        for category in file_data.categories {
            categories.insert(category.id, category);
        }

        Ok(())
    }

    fn write_snapshot(&self, categories: &Categories) -> LedgerResult<()> {
        let mut list: Vec<_> = categories.values().cloned().collect();
        list.sort_by(|a, b| {
            a.owner_id
                .cmp(&b.owner_id)
                .then_with(|| a.name.cmp(&b.name))
        });
        write_json_atomic(&self.path, &CategoryData { categories: list })
    }

    fn name_taken(
        categories: &Categories,
        owner: &OwnerId,
        name: &str,
        except: Option<CategoryId>,
    ) -> bool {
        categories
            .values()
            .any(|c| &c.owner_id == owner && c.name == name && Some(c.id) != except)
    }

    /// Get a category by ID regardless of owner
    pub fn get(&self, id: CategoryId) -> LedgerResult<Option<Category>> {
        Ok(self.read()?.get(&id).cloned())
    }

    /// Find an owner's category by exact name
    pub fn find_by_name(&self, owner: &OwnerId, name: &str) -> LedgerResult<Option<Category>> {
        Ok(self
            .read()?
            .values()
            .find(|c| &c.owner_id == owner && c.name == name)
            .cloned())
    }

    /// All categories of an owner, sorted by name
    pub fn list_for_owner(&self, owner: &OwnerId) -> LedgerResult<Vec<Category>> {
        let mut list: Vec<_> = self
            .read()?
            .values()
            .filter(|c| &c.owner_id == owner)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    /// Insert `category` unless its owner already has one with that name
    pub fn insert_if_name_free(&self, category: Category) -> LedgerResult<Option<Category>> {
        let mut categories = self.write()?;

        if Self::name_taken(&categories, &category.owner_id, &category.name, None) {
            return Ok(None);
        }

        categories.insert(category.id, category.clone());
        if let Err(e) = self.write_snapshot(&categories) {
            categories.remove(&category.id);
            return Err(e);
        }

        Ok(Some(category))
    }

    /// Replace a stored category unless the new name collides with a sibling
    ///
    /// Returns `false` on a name collision.
    pub fn replace_if_name_free(&self, category: Category) -> LedgerResult<bool> {
        let mut categories = self.write()?;

        if Self::name_taken(
            &categories,
            &category.owner_id,
            &category.name,
            Some(category.id),
        ) {
            return Ok(false);
        }

        let previous = categories.insert(category.id, category.clone());
        if let Err(e) = self.write_snapshot(&categories) {
            match previous {
                Some(previous) => categories.insert(category.id, previous),
                None => categories.remove(&category.id),
            };
            return Err(e);
        }

        Ok(true)
    }

    /// Delete a category; returns whether it existed
    pub fn delete(&self, id: CategoryId) -> LedgerResult<bool> {
        let mut categories = self.write()?;

        let Some(removed) = categories.remove(&id) else {
            return Ok(false);
        };
        if let Err(e) = self.write_snapshot(&categories) {
            categories.insert(id, removed);
            return Err(e);
        }

        Ok(true)
    }

    /// Count all categories
    pub fn count(&self) -> LedgerResult<usize> {
        Ok(self.read()?.len())
    }
}

impl CategoryLookup for CategoryRepository {
    fn resolve(&self, owner: &OwnerId, id: CategoryId) -> LedgerResult<Option<Category>> {
        Ok(self.get(id)?.filter(|c| &c.owner_id == owner))
    }

    fn name_of(&self, id: CategoryId) -> LedgerResult<Option<String>> {
        Ok(self.get(id)?.map(|c| c.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_repo() -> (TempDir, CategoryRepository) {
        let temp_dir = TempDir::new().unwrap();
        let repo = CategoryRepository::new(temp_dir.path().join("categories.json"));
        repo.load().unwrap();
        (temp_dir, repo)
    }

    fn owner(raw: &str) -> OwnerId {
        OwnerId::new(raw).unwrap()
    }

    #[test]
    fn test_insert_rejects_duplicate_name_per_owner() {
        let (_temp_dir, repo) = create_test_repo();

        let food = Category::new(owner("u1"), "Food", "#f00", "fa-burger");
        assert!(repo.insert_if_name_free(food).unwrap().is_some());

        let again = Category::new(owner("u1"), "Food", "#0f0", "fa-pizza");
        assert!(repo.insert_if_name_free(again).unwrap().is_none());

        let other_owner = Category::new(owner("u2"), "Food", "#0f0", "fa-pizza");
        assert!(repo.insert_if_name_free(other_owner).unwrap().is_some());

        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn test_resolve_is_owner_scoped() {
        let (_temp_dir, repo) = create_test_repo();
        let food = repo
            .insert_if_name_free(Category::new(owner("u1"), "Food", "", ""))
            .unwrap()
            .unwrap();

        assert!(repo.resolve(&owner("u1"), food.id).unwrap().is_some());
        assert!(repo.resolve(&owner("u2"), food.id).unwrap().is_none());
        assert_eq!(repo.name_of(food.id).unwrap().as_deref(), Some("Food"));
        assert!(repo.name_of(CategoryId::new()).unwrap().is_none());
    }

    #[test]
    fn test_replace_checks_siblings_only() {
        let (_temp_dir, repo) = create_test_repo();
        let mut food = repo
            .insert_if_name_free(Category::new(owner("u1"), "Food", "", ""))
            .unwrap()
            .unwrap();
        repo.insert_if_name_free(Category::new(owner("u1"), "Rent", "", ""))
            .unwrap()
            .unwrap();

        food.color = "#123456".into();
        assert!(repo.replace_if_name_free(food.clone()).unwrap());

        food.name = "Rent".into();
        assert!(!repo.replace_if_name_free(food.clone()).unwrap());
        assert_eq!(repo.get(food.id).unwrap().unwrap().name, "Food");
    }

    #[test]
    fn test_delete_and_reload() {
        let (temp_dir, repo) = create_test_repo();
        let food = repo
            .insert_if_name_free(Category::new(owner("u1"), "Food", "", ""))
            .unwrap()
            .unwrap();
        repo.insert_if_name_free(Category::new(owner("u1"), "Rent", "", ""))
            .unwrap();

        assert!(repo.delete(food.id).unwrap());
        assert!(!repo.delete(food.id).unwrap());

        let reloaded = CategoryRepository::new(temp_dir.path().join("categories.json"));
        reloaded.load().unwrap();
        let names: Vec<_> = reloaded
            .list_for_owner(&owner("u1"))
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Rent"]);
    }
}
