//! Expense repository for JSON storage
//!
//! Manages loading and saving expenses to expenses.json. Records are indexed
//! per owner in insertion order; that order is written back to disk so ties on
//! date sort the same way after a reload.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Expense, ExpenseId, ExpensePatch, OwnerId};

use super::file_io::{read_json, write_json_atomic};
use super::{DailyTotal, ExpenseFilter, ExpenseStore, FindOptions, SortOrder};

/// Serializable expense data structure
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct ExpenseData {
    expenses: Vec<Expense>,
}

type Records = HashMap<ExpenseId, Expense>;
type OwnerIndex = HashMap<OwnerId, Vec<ExpenseId>>;

/// Repository for expense persistence with a per-owner index
pub struct ExpenseRepository {
    path: PathBuf,
    data: RwLock<Records>,
    /// Index: owner -> expense ids, oldest insert first
    by_owner: RwLock<OwnerIndex>,
}

impl ExpenseRepository {
    /// Create a new expense repository
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            data: RwLock::new(HashMap::new()),
            by_owner: RwLock::new(HashMap::new()),
        }
    }

    fn read_locks(
        &self,
    ) -> LedgerResult<(RwLockReadGuard<'_, Records>, RwLockReadGuard<'_, OwnerIndex>)> {
        let data = self
            .data
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        let by_owner = self
            .by_owner
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok((data, by_owner))
    }

    fn write_locks(
        &self,
    ) -> LedgerResult<(RwLockWriteGuard<'_, Records>, RwLockWriteGuard<'_, OwnerIndex>)> {
        let data = self
            .data
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        let by_owner = self
            .by_owner
            .write()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        Ok((data, by_owner))
    }

    /// Load expenses from disk and build the owner index
    pub fn load(&self) -> LedgerResult<()> {
        let file_data: ExpenseData = read_json(&self.path)?;
        let (mut data, mut by_owner) = self.write_locks()?;

        data.clear();
        by_owner.clear();

        for expense in file_data.expenses {
            by_owner
                .entry(expense.owner_id.clone())
                .or_default()
                .push(expense.id);
            data.insert(expense.id, expense);
        }

        debug!(count = data.len(), "loaded expenses");
        Ok(())
    }

    fn write_snapshot(&self, data: &Records, by_owner: &OwnerIndex) -> LedgerResult<()> {
        let mut owners: Vec<_> = by_owner.keys().collect();
        owners.sort();

        let expenses = owners
            .into_iter()
            .flat_map(|owner| by_owner[owner].iter())
            .filter_map(|id| data.get(id).cloned())
            .collect();

        write_json_atomic(&self.path, &ExpenseData { expenses })
    }

    /// Records matching `filter`, in insertion order
    fn matching<'d>(
        data: &'d Records,
        by_owner: &OwnerIndex,
        filter: &ExpenseFilter,
    ) -> Vec<&'d Expense> {
        by_owner
            .get(&filter.owner)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|id| data.get(id))
            .filter(|expense| filter.matches(expense))
            .collect()
    }

    /// Sort `found` per `options` and cut out the requested page
    fn page_of(mut found: Vec<&Expense>, options: FindOptions) -> Vec<Expense> {
        // Stable sort keeps insertion order among equal dates
        match options.sort {
            SortOrder::DateDescending => found.sort_by(|a, b| b.date.cmp(&a.date)),
            SortOrder::DateAscending => found.sort_by(|a, b| a.date.cmp(&b.date)),
        }

        let page = found.into_iter().skip(options.skip);
        match options.limit {
            Some(limit) => page.take(limit).cloned().collect(),
            None => page.cloned().collect(),
        }
    }

    fn insert_locked(
        &self,
        data: &mut Records,
        by_owner: &mut OwnerIndex,
        expense: Expense,
    ) -> LedgerResult<Expense> {
        if data.contains_key(&expense.id) {
            return Err(LedgerError::Storage(format!(
                "Expense id {} already stored",
                expense.id
            )));
        }

        let id = expense.id;
        let owner = expense.owner_id.clone();
        by_owner.entry(owner.clone()).or_default().push(id);
        data.insert(id, expense.clone());

        if let Err(e) = self.write_snapshot(data, by_owner) {
            data.remove(&id);
            if let Some(ids) = by_owner.get_mut(&owner) {
                ids.retain(|&existing| existing != id);
            }
            return Err(e);
        }

        Ok(expense)
    }

    /// Count all stored expenses across owners
    pub fn len(&self) -> LedgerResult<usize> {
        let data = self
            .data
            .read()
            .map_err(|e| LedgerError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(data.len())
    }

    pub fn is_empty(&self) -> LedgerResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl ExpenseStore for ExpenseRepository {
    fn insert(&self, expense: Expense) -> LedgerResult<Expense> {
        let (mut data, mut by_owner) = self.write_locks()?;
        self.insert_locked(&mut data, &mut by_owner, expense)
    }

    fn insert_unique(&self, expense: Expense) -> LedgerResult<Option<Expense>> {
        // Check and insert under the same write lock
        let (mut data, mut by_owner) = self.write_locks()?;

        let key = ExpenseFilter::owned_by(expense.owner_id.clone())
            .name(expense.name.clone())
            .on(expense.date);
        if !Self::matching(&data, &by_owner, &key).is_empty() {
            return Ok(None);
        }

        self.insert_locked(&mut data, &mut by_owner, expense)
            .map(Some)
    }

    fn find_one(&self, filter: &ExpenseFilter) -> LedgerResult<Option<Expense>> {
        let (data, by_owner) = self.read_locks()?;
        Ok(Self::matching(&data, &by_owner, filter)
            .first()
            .map(|expense| (*expense).clone()))
    }

    fn find(&self, filter: &ExpenseFilter, options: FindOptions) -> LedgerResult<Vec<Expense>> {
        let (data, by_owner) = self.read_locks()?;
        Ok(Self::page_of(
            Self::matching(&data, &by_owner, filter),
            options,
        ))
    }

    fn find_page(
        &self,
        filter: &ExpenseFilter,
        options: FindOptions,
    ) -> LedgerResult<(Vec<Expense>, u64)> {
        let (data, by_owner) = self.read_locks()?;
        let found = Self::matching(&data, &by_owner, filter);
        let total = found.len() as u64;
        Ok((Self::page_of(found, options), total))
    }

    fn count(&self, filter: &ExpenseFilter) -> LedgerResult<u64> {
        let (data, by_owner) = self.read_locks()?;
        Ok(Self::matching(&data, &by_owner, filter).len() as u64)
    }

    fn update_one(&self, filter: &ExpenseFilter, patch: &ExpensePatch) -> LedgerResult<u64> {
        let (mut data, by_owner) = self.write_locks()?;

        let Some(id) = Self::matching(&data, &by_owner, filter)
            .first()
            .map(|expense| expense.id)
        else {
            return Ok(0);
        };

        let Some(expense) = data.get_mut(&id) else {
            return Ok(0);
        };
        let before = expense.clone();
        patch.apply(expense);

        if let Err(e) = self.write_snapshot(&data, &by_owner) {
            data.insert(id, before);
            return Err(e);
        }

        Ok(1)
    }

    fn delete_one(&self, filter: &ExpenseFilter) -> LedgerResult<u64> {
        let (mut data, mut by_owner) = self.write_locks()?;

        let Some(id) = Self::matching(&data, &by_owner, filter)
            .first()
            .map(|expense| expense.id)
        else {
            return Ok(0);
        };

        let Some(removed) = data.remove(&id) else {
            return Ok(0);
        };
        let ids = by_owner.entry(removed.owner_id.clone()).or_default();
        let position = ids.iter().position(|&existing| existing == id);
        if let Some(position) = position {
            ids.remove(position);
        }

        if let Err(e) = self.write_snapshot(&data, &by_owner) {
            if let Some(position) = position {
                by_owner
                    .entry(removed.owner_id.clone())
                    .or_default()
                    .insert(position, id);
            }
            data.insert(id, removed);
            return Err(e);
        }

        Ok(1)
    }

    fn sum_by_date(&self, filter: &ExpenseFilter) -> LedgerResult<Vec<DailyTotal>> {
        let (data, by_owner) = self.read_locks()?;

        let mut groups: BTreeMap<_, (Decimal, usize)> = BTreeMap::new();
        for expense in Self::matching(&data, &by_owner, filter) {
            let entry = groups.entry(expense.date).or_insert((Decimal::ZERO, 0));
            entry.0 = entry
                .0
                .checked_add(expense.amount)
                .ok_or_else(LedgerError::total_out_of_range)?;
            entry.1 += 1;
        }

        Ok(groups
            .into_iter()
            .map(|(date, (total, records))| DailyTotal {
                date,
                total,
                records,
            })
            .collect())
    }
}
