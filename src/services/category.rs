//! Category service
//!
//! Provides business logic for per-owner categories: CRUD plus the reserved
//! "Default" category, which is created on first use and can not be renamed
//! or removed.

use tracing::{debug, info, instrument};

use crate::config::Settings;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Category, CategoryId, OwnerId, DEFAULT_CATEGORY_NAME};
use crate::storage::{Deadlines, Storage};

/// Fields of a category that may be changed; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon_name: Option<String>,
}

/// Service for category management
pub struct CategoryService<'a> {
    storage: &'a Storage,
    deadlines: Deadlines,
}

impl<'a> CategoryService<'a> {
    /// Create a new category service
    pub fn new(storage: &'a Storage, settings: &Settings) -> Self {
        Self {
            storage,
            deadlines: Deadlines::new(settings.timeouts),
        }
    }

    /// Make sure `owner` has its reserved category; returns it
    pub fn ensure_default(&self, owner: &OwnerId) -> LedgerResult<Category> {
        let repo = &self.storage.categories;
        if let Some(existing) = self.deadlines.read("find default category", || {
            repo.find_by_name(owner, DEFAULT_CATEGORY_NAME)
        })? {
            return Ok(existing);
        }

        let created = self.deadlines.write("create default category", || {
            repo.insert_if_name_free(Category::default_for(owner.clone()))
        })?;
        match created {
            Some(category) => {
                debug!(owner = %owner, id = %category.id, "created default category");
                Ok(category)
            }
            // Created concurrently between the lookup and the insert
            None => repo
                .find_by_name(owner, DEFAULT_CATEGORY_NAME)?
                .ok_or_else(|| LedgerError::category_not_found(DEFAULT_CATEGORY_NAME)),
        }
    }

    /// Create a new category
    #[instrument(skip(self, color, icon_name), fields(owner = %owner))]
    pub fn create(
        &self,
        owner: &OwnerId,
        name: &str,
        color: &str,
        icon_name: &str,
    ) -> LedgerResult<Category> {
        let name = name.trim();
        Self::check_name_not_reserved(name)?;

        let category = Category::new(owner.clone(), name, color.trim(), icon_name.trim());
        category
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;

        self.ensure_default(owner)?;

        let repo = &self.storage.categories;
        let category = self
            .deadlines
            .write("insert category", || repo.insert_if_name_free(category))?
            .ok_or_else(|| LedgerError::Conflict {
                entity_type: "Category",
                identifier: name.to_string(),
            })?;

        info!(id = %category.id, name = %category.name, "created category");
        Ok(category)
    }

    /// All of the owner's categories, sorted by name
    pub fn list(&self, owner: &OwnerId) -> LedgerResult<Vec<Category>> {
        self.ensure_default(owner)?;
        let repo = &self.storage.categories;
        self.deadlines
            .read("list categories", || repo.list_for_owner(owner))
    }

    /// Get one of the owner's categories
    pub fn get(&self, owner: &OwnerId, id: CategoryId) -> LedgerResult<Category> {
        let repo = &self.storage.categories;
        self.deadlines
            .read("find category", || repo.get(id))?
            .filter(|c| &c.owner_id == owner)
            .ok_or_else(|| LedgerError::category_not_found(id.to_string()))
    }

    /// Change the supplied fields of a category
    #[instrument(skip(self, input), fields(owner = %owner, id = %id))]
    pub fn update(
        &self,
        owner: &OwnerId,
        id: CategoryId,
        input: UpdateCategoryInput,
    ) -> LedgerResult<Category> {
        let mut category = self.get(owner, id)?;
        if category.is_default() {
            return Err(LedgerError::Forbidden(
                "The Default category can not be modified".into(),
            ));
        }

        if let Some(name) = input.name {
            let name = name.trim();
            Self::check_name_not_reserved(name)?;
            category.name = name.to_string();
        }
        if let Some(color) = input.color {
            category.color = color.trim().to_string();
        }
        if let Some(icon_name) = input.icon_name {
            category.icon_name = icon_name.trim().to_string();
        }

        category
            .validate()
            .map_err(|e| LedgerError::Validation(e.to_string()))?;
        category.updated_at = chrono::Utc::now();

        let repo = &self.storage.categories;
        let replaced = self
            .deadlines
            .write("update category", || repo.replace_if_name_free(category.clone()))?;
        if !replaced {
            return Err(LedgerError::Conflict {
                entity_type: "Category",
                identifier: category.name,
            });
        }

        info!("updated category");
        Ok(category)
    }

    /// Delete a category
    ///
    /// Expenses that point at it keep the dangling reference.
    #[instrument(skip(self), fields(owner = %owner, id = %id))]
    pub fn delete(&self, owner: &OwnerId, id: CategoryId) -> LedgerResult<Category> {
        let category = self.get(owner, id)?;
        if category.is_default() {
            return Err(LedgerError::Forbidden(
                "The Default category can not be deleted".into(),
            ));
        }

        let repo = &self.storage.categories;
        if !self.deadlines.write("delete category", || repo.delete(id))? {
            return Err(LedgerError::category_not_found(id.to_string()));
        }

        info!(name = %category.name, "deleted category");
        Ok(category)
    }

    fn check_name_not_reserved(name: &str) -> LedgerResult<()> {
        if name == DEFAULT_CATEGORY_NAME {
            return Err(LedgerError::Validation(format!(
                "Category name '{}' is reserved",
                DEFAULT_CATEGORY_NAME
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use crate::models::{CreateExpenseInput, DEFAULT_CATEGORY_COLOR, DEFAULT_CATEGORY_ICON};
    use crate::services::ExpenseService;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        (temp_dir, storage)
    }

    fn owner(raw: &str) -> OwnerId {
        OwnerId::new(raw).unwrap()
    }

    #[test]
    fn test_list_creates_default_once() {
        let (_temp_dir, storage) = create_test_storage();
        let service = CategoryService::new(&storage, &Settings::default());

        let first = service.list(&owner("u1")).unwrap();
        let second = service.list(&owner("u1")).unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].name, DEFAULT_CATEGORY_NAME);
        assert_eq!(first[0].color, DEFAULT_CATEGORY_COLOR);
        assert_eq!(first[0].icon_name, DEFAULT_CATEGORY_ICON);
        assert_eq!(first, second);
    }

    #[test]
    fn test_create_and_list_sorted() {
        let (_temp_dir, storage) = create_test_storage();
        let service = CategoryService::new(&storage, &Settings::default());

        service.create(&owner("u1"), "Rent", "#00f", "fa-home").unwrap();
        service.create(&owner("u1"), " Food ", "#f00", "fa-burger").unwrap();

        let names: Vec<_> = service
            .list(&owner("u1"))
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Default", "Food", "Rent"]);
        assert_eq!(service.list(&owner("u2")).unwrap().len(), 1);
    }

    #[test]
    fn test_create_rejections() {
        let (_temp_dir, storage) = create_test_storage();
        let service = CategoryService::new(&storage, &Settings::default());
        let u1 = owner("u1");

        assert!(service.create(&u1, "  ", "", "").unwrap_err().is_validation());
        assert!(service.create(&u1, "Default", "", "").unwrap_err().is_validation());

        service.create(&u1, "Food", "", "").unwrap();
        let err = service.create(&u1, "Food", "", "").unwrap_err();
        assert_eq!(err.reason(), "conflict");

        // Same name for another owner is fine
        service.create(&owner("u2"), "Food", "", "").unwrap();
    }

    #[test]
    fn test_get_is_owner_scoped() {
        let (_temp_dir, storage) = create_test_storage();
        let service = CategoryService::new(&storage, &Settings::default());
        let food = service.create(&owner("u1"), "Food", "", "").unwrap();

        assert_eq!(service.get(&owner("u1"), food.id).unwrap().name, "Food");
        assert!(service.get(&owner("u2"), food.id).unwrap_err().is_not_found());
        assert!(service
            .get(&owner("u1"), CategoryId::new())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_update_changes_only_supplied_fields() {
        let (_temp_dir, storage) = create_test_storage();
        let service = CategoryService::new(&storage, &Settings::default());
        let u1 = owner("u1");
        let food = service.create(&u1, "Food", "#f00", "fa-burger").unwrap();
        service.create(&u1, "Rent", "", "").unwrap();

        let updated = service
            .update(
                &u1,
                food.id,
                UpdateCategoryInput {
                    color: Some("#0f0".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Food");
        assert_eq!(updated.color, "#0f0");
        assert_eq!(updated.icon_name, "fa-burger");

        let rename_onto_sibling = UpdateCategoryInput {
            name: Some("Rent".into()),
            ..Default::default()
        };
        assert_eq!(
            service.update(&u1, food.id, rename_onto_sibling).unwrap_err().reason(),
            "conflict"
        );

        let rename_to_default = UpdateCategoryInput {
            name: Some("Default".into()),
            ..Default::default()
        };
        assert!(service
            .update(&u1, food.id, rename_to_default)
            .unwrap_err()
            .is_validation());

        assert_eq!(service.get(&u1, food.id).unwrap().name, "Food");
    }

    #[test]
    fn test_default_category_is_protected() {
        let (_temp_dir, storage) = create_test_storage();
        let service = CategoryService::new(&storage, &Settings::default());
        let u1 = owner("u1");
        let default = service.ensure_default(&u1).unwrap();

        let update = UpdateCategoryInput {
            color: Some("#fff".into()),
            ..Default::default()
        };
        assert_eq!(
            service.update(&u1, default.id, update).unwrap_err().reason(),
            "forbidden"
        );
        assert_eq!(
            service.delete(&u1, default.id).unwrap_err().reason(),
            "forbidden"
        );
    }

    #[test]
    fn test_delete_leaves_expense_reference() {
        let (_temp_dir, storage) = create_test_storage();
        let settings = Settings::default();
        let service = CategoryService::new(&storage, &settings);
        let expenses = ExpenseService::new(&storage, &settings);
        let u1 = owner("u1");

        let food = service.create(&u1, "Food", "", "").unwrap();
        let lunch = expenses
            .create(
                &u1,
                CreateExpenseInput {
                    amount: dec!(12),
                    currency_code: "USD".into(),
                    name: "Lunch".into(),
                    date: Some("2024-03-01".into()),
                    category_id: Some(food.id),
                    ..Default::default()
                },
            )
            .unwrap();

        service.delete(&u1, food.id).unwrap();

        assert!(service.get(&u1, food.id).unwrap_err().is_not_found());
        assert!(service.delete(&u1, food.id).unwrap_err().is_not_found());
        assert_eq!(
            expenses.get(&u1, lunch.id).unwrap().category_id,
            Some(food.id)
        );
    }
}
