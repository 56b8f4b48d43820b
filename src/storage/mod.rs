//! Storage layer for the expense ledger
//!
//! Services talk to expenses through the [`ExpenseStore`] trait and to
//! categories through [`CategoryLookup`]; the JSON file repositories are the
//! shipped implementations. [`Storage`] wires the repositories together.

pub mod categories;
pub mod deadline;
pub mod expenses;
pub mod file_io;
pub mod tags;

pub use categories::CategoryRepository;
pub use deadline::Deadlines;
pub use expenses::ExpenseRepository;
pub use file_io::{read_json, write_json_atomic};
pub use tags::TagRepository;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::paths::LedgerPaths;
use crate::error::LedgerResult;
use crate::models::{Category, CategoryId, Expense, ExpenseId, ExpensePatch, OwnerId};

/// Selects expenses; always scoped to one owner
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseFilter {
    pub owner: OwnerId,
    pub id: Option<ExpenseId>,
    pub category_id: Option<CategoryId>,
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    /// Inclusive lower bound
    pub date_from: Option<NaiveDate>,
    /// Exclusive upper bound
    pub date_before: Option<NaiveDate>,
}

impl ExpenseFilter {
    /// Match every expense of `owner`
    pub fn owned_by(owner: OwnerId) -> Self {
        Self {
            owner,
            id: None,
            category_id: None,
            name: None,
            date: None,
            date_from: None,
            date_before: None,
        }
    }

    pub fn id(mut self, id: ExpenseId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Exact date match
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Half-open range `[from, before)`
    pub fn between(mut self, from: NaiveDate, before: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_before = Some(before);
        self
    }

    /// Whether `expense` satisfies every set criterion
    pub fn matches(&self, expense: &Expense) -> bool {
        expense.owner_id == self.owner
            && self.id.map_or(true, |id| expense.id == id)
            && self
                .category_id
                .map_or(true, |id| expense.category_id == Some(id))
            && self.name.as_ref().map_or(true, |name| &expense.name == name)
            && self.date.map_or(true, |date| expense.date == date)
            && self.date_from.map_or(true, |from| expense.date >= from)
            && self.date_before.map_or(true, |before| expense.date < before)
    }
}

/// Result ordering for [`ExpenseStore::find`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    DateDescending,
    DateAscending,
}

/// Paging and ordering for [`ExpenseStore::find`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindOptions {
    pub skip: usize,
    pub limit: Option<usize>,
    pub sort: SortOrder,
}

impl FindOptions {
    /// Oldest first, unpaged
    pub fn ascending() -> Self {
        Self {
            sort: SortOrder::DateAscending,
            ..Self::default()
        }
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Sum of amounts on one date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub total: Decimal,
    /// Number of records that contributed
    pub records: usize,
}

/// Record store for expenses
///
/// Ties on date are returned in insertion order. Every mutation is durable
/// once the call returns `Ok`.
pub trait ExpenseStore: Send + Sync {
    /// Store a new record
    fn insert(&self, expense: Expense) -> LedgerResult<Expense>;

    /// Store a record unless the owner already has one with the same name
    /// and date; returns `None` when one exists. Check and insert are atomic.
    fn insert_unique(&self, expense: Expense) -> LedgerResult<Option<Expense>>;

    fn find_one(&self, filter: &ExpenseFilter) -> LedgerResult<Option<Expense>>;

    fn find(&self, filter: &ExpenseFilter, options: FindOptions) -> LedgerResult<Vec<Expense>>;

    fn count(&self, filter: &ExpenseFilter) -> LedgerResult<u64>;

    /// One page of matches together with the total match count, both taken
    /// from the same snapshot
    fn find_page(
        &self,
        filter: &ExpenseFilter,
        options: FindOptions,
    ) -> LedgerResult<(Vec<Expense>, u64)>;

    /// Apply `patch` to the first match; returns the number matched
    fn update_one(&self, filter: &ExpenseFilter, patch: &ExpensePatch) -> LedgerResult<u64>;

    /// Remove the first match; returns the number removed
    fn delete_one(&self, filter: &ExpenseFilter) -> LedgerResult<u64>;

    /// Per-date sums over matching records, oldest date first
    ///
    /// Fails with a validation error when a day's total does not fit in a
    /// `Decimal`.
    fn sum_by_date(&self, filter: &ExpenseFilter) -> LedgerResult<Vec<DailyTotal>>;
}

/// Category resolution as seen by the ledger
pub trait CategoryLookup: Send + Sync {
    /// The category `id` if it exists and belongs to `owner`
    fn resolve(&self, owner: &OwnerId, id: CategoryId) -> LedgerResult<Option<Category>>;

    /// Display name of `id`, if it still exists
    fn name_of(&self, id: CategoryId) -> LedgerResult<Option<String>>;
}

/// Main storage coordinator that provides access to all repositories
pub struct Storage {
    paths: LedgerPaths,
    expenses: Box<dyn ExpenseStore>,
    pub categories: CategoryRepository,
    pub tags: TagRepository,
}

impl Storage {
    /// Open the JSON repositories under `paths` and load them
    pub fn new(paths: LedgerPaths) -> LedgerResult<Self> {
        paths.ensure_directories()?;

        let expenses = ExpenseRepository::new(paths.expenses_file());
        expenses.load()?;

        Self::with_expense_store(paths, Box::new(expenses))
    }

    /// Use a custom expense store alongside the JSON category and tag files
    pub fn with_expense_store(
        paths: LedgerPaths,
        expenses: Box<dyn ExpenseStore>,
    ) -> LedgerResult<Self> {
        paths.ensure_directories()?;

        let storage = Self {
            expenses,
            categories: CategoryRepository::new(paths.categories_file()),
            tags: TagRepository::new(paths.tags_file()),
            paths,
        };
        storage.categories.load()?;
        storage.tags.load()?;

        debug!(base = %storage.paths.base_dir().display(), "storage opened");
        Ok(storage)
    }

    /// Get the paths configuration
    pub fn paths(&self) -> &LedgerPaths {
        &self.paths
    }

    /// The expense record store
    pub fn expenses(&self) -> &dyn ExpenseStore {
        self.expenses.as_ref()
    }

    /// The category reference used by expense services
    pub fn category_lookup(&self) -> &dyn CategoryLookup {
        &self.categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    #[test]
    fn test_storage_creation() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();

        assert!(temp_dir.path().join("data").exists());
        assert_eq!(storage.paths().base_dir(), temp_dir.path());
    }

    #[test]
    fn test_filter_matching() {
        let owner = OwnerId::new("u1").unwrap();
        let category = CategoryId::new();
        let day = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let expense =
            Expense::new(owner.clone(), "Rent", dec!(900), "USD", day).with_category(category);

        assert!(ExpenseFilter::owned_by(owner.clone()).matches(&expense));
        assert!(ExpenseFilter::owned_by(owner.clone())
            .category(category)
            .name("Rent")
            .on(day)
            .matches(&expense));
        assert!(!ExpenseFilter::owned_by(OwnerId::new("u2").unwrap()).matches(&expense));
        assert!(!ExpenseFilter::owned_by(owner.clone())
            .category(CategoryId::new())
            .matches(&expense));

        let march = ExpenseFilter::owned_by(owner.clone()).between(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        );
        assert!(march.matches(&expense));

        let ends_on_day = ExpenseFilter::owned_by(owner).between(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            day,
        );
        assert!(!ends_on_day.matches(&expense));
    }

    #[test]
    fn test_data_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let owner = OwnerId::new("u1").unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        {
            let storage = Storage::new(paths.clone()).unwrap();
            storage
                .expenses()
                .insert(Expense::new(owner.clone(), "Coffee", dec!(3), "USD", day))
                .unwrap();
        }

        let storage = Storage::new(paths).unwrap();
        assert_eq!(
            storage
                .expenses()
                .count(&ExpenseFilter::owned_by(owner))
                .unwrap(),
            1
        );
    }
}
