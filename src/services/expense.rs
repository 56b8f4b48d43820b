//! Expense service
//!
//! Single-record create, read, update and delete. Every operation is scoped
//! to the calling owner; a record owned by someone else is reported as not
//! found.

use chrono::Local;
use tracing::{info, instrument};

use crate::config::Settings;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    parse_date_input, CategoryId, CreateExpenseInput, Expense, ExpenseId, ExpensePatch,
    ExpenseValidationError, OwnerId, UpdateExpenseInput,
};
use crate::storage::{Deadlines, ExpenseFilter, Storage};

/// Service for expense management
pub struct ExpenseService<'a> {
    storage: &'a Storage,
    deadlines: Deadlines,
}

impl<'a> ExpenseService<'a> {
    /// Create a new expense service
    pub fn new(storage: &'a Storage, settings: &Settings) -> Self {
        Self {
            storage,
            deadlines: Deadlines::new(settings.timeouts),
        }
    }

    /// Check that `category_id` names one of the owner's categories
    fn ensure_category(&self, owner: &OwnerId, category_id: CategoryId) -> LedgerResult<()> {
        let lookup = self.storage.category_lookup();
        self.deadlines
            .read("resolve category", || lookup.resolve(owner, category_id))?
            .map(|_| ())
            .ok_or_else(|| LedgerError::category_not_found(category_id.to_string()))
    }

    /// Create a new expense
    ///
    /// The amount is stored exactly as given; no currency scaling applies.
    #[instrument(skip(self, input), fields(owner = %owner))]
    pub fn create(&self, owner: &OwnerId, input: CreateExpenseInput) -> LedgerResult<Expense> {
        if input.amount.is_zero() {
            return Err(ExpenseValidationError::ZeroAmount.into());
        }

        let date = match input.date.as_deref().map(str::trim) {
            None | Some("") => Local::now().date_naive(),
            Some(raw) => parse_date_input(raw)?,
        };

        let mut expense = Expense::new(
            owner.clone(),
            input.name.trim(),
            input.amount,
            input.currency_code.trim(),
            date,
        );
        expense.validate()?;

        if let Some(description) = input.description {
            expense.description = description;
        }

        if let Some(category_id) = input.category_id {
            self.ensure_category(owner, category_id)?;
            expense.category_id = Some(category_id);
        }

        let store = self.storage.expenses();
        let expense = self.deadlines.write("insert expense", || store.insert(expense))?;

        info!(id = %expense.id, date = %expense.date_key(), "created expense");
        Ok(expense)
    }

    /// Get one of the owner's expenses
    pub fn get(&self, owner: &OwnerId, id: ExpenseId) -> LedgerResult<Expense> {
        let store = self.storage.expenses();
        let filter = ExpenseFilter::owned_by(owner.clone()).id(id);

        self.deadlines
            .read("find expense", || store.find_one(&filter))?
            .ok_or_else(|| LedgerError::expense_not_found(id.to_string()))
    }

    /// Apply a partial update and return the record as stored afterwards
    ///
    /// Fields left as `None` keep their current value. Validation, including
    /// the category check, runs before anything is written.
    #[instrument(skip(self, input), fields(owner = %owner, id = %id))]
    pub fn update(
        &self,
        owner: &OwnerId,
        id: ExpenseId,
        input: UpdateExpenseInput,
    ) -> LedgerResult<Expense> {
        let patch = self.build_patch(owner, input)?;

        let store = self.storage.expenses();
        let filter = ExpenseFilter::owned_by(owner.clone()).id(id);

        let matched = self
            .deadlines
            .write("update expense", || store.update_one(&filter, &patch))?;
        if matched == 0 {
            return Err(LedgerError::expense_not_found(id.to_string()));
        }

        // Re-read so the response reflects what was persisted
        let expense = self.get(owner, id)?;
        info!("updated expense");
        Ok(expense)
    }

    fn build_patch(&self, owner: &OwnerId, input: UpdateExpenseInput) -> LedgerResult<ExpensePatch> {
        let name = match input.name {
            Some(name) if name.trim().is_empty() => {
                return Err(ExpenseValidationError::EmptyName.into())
            }
            other => other.map(|n| n.trim().to_string()),
        };

        let currency_code = match input.currency_code {
            Some(code) if code.trim().is_empty() => {
                return Err(ExpenseValidationError::EmptyCurrency.into())
            }
            other => other.map(|c| c.trim().to_string()),
        };

        let date = input.date.as_deref().map(parse_date_input).transpose()?;

        if let Some(Some(category_id)) = input.category_id {
            self.ensure_category(owner, category_id)?;
        }

        Ok(ExpensePatch {
            amount: input.amount,
            currency_code,
            name,
            description: input.description,
            date,
            category_id: input.category_id,
        })
    }

    /// Permanently delete one of the owner's expenses
    #[instrument(skip(self), fields(owner = %owner, id = %id))]
    pub fn delete(&self, owner: &OwnerId, id: ExpenseId) -> LedgerResult<()> {
        let store = self.storage.expenses();
        let filter = ExpenseFilter::owned_by(owner.clone()).id(id);

        let deleted = self
            .deadlines
            .write("delete expense", || store.delete_one(&filter))?;
        if deleted == 0 {
            return Err(LedgerError::expense_not_found(id.to_string()));
        }

        info!("deleted expense");
        Ok(())
    }
}
