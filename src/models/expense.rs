//! Expense model
//!
//! An expense is a single dated monetary record owned by one user, optionally
//! linked to a category. Dates are stored without a time component and
//! serialize as `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{CategoryId, ExpenseId, OwnerId};
use crate::error::{LedgerError, LedgerResult};

/// Storage format for expense dates
pub const STORAGE_DATE_FORMAT: &str = "%Y-%m-%d";

/// A single expense record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Unique identifier
    pub id: ExpenseId,

    /// The user this record belongs to
    pub owner_id: OwnerId,

    /// Linked category, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,

    /// Amount in the currency's stored unit
    pub amount: Decimal,

    /// Currency code, e.g. "USD"
    pub currency_code: String,

    /// Short label
    pub name: String,

    /// Free-form notes
    #[serde(default)]
    pub description: String,

    /// Calendar date of the expense
    pub date: NaiveDate,

    /// When the record was created
    pub created_at: DateTime<Utc>,

    /// When the record was last modified
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// Create a new uncategorized expense
    pub fn new(
        owner_id: OwnerId,
        name: impl Into<String>,
        amount: Decimal,
        currency_code: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ExpenseId::new(),
            owner_id,
            category_id: None,
            amount,
            currency_code: currency_code.into(),
            name: name.into(),
            description: String::new(),
            date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style description setter
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder-style category setter
    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// The date in storage form (`YYYY-MM-DD`)
    pub fn date_key(&self) -> String {
        self.date.format(STORAGE_DATE_FORMAT).to_string()
    }

    /// Validate the fields every stored record must carry
    pub fn validate(&self) -> Result<(), ExpenseValidationError> {
        if self.name.trim().is_empty() {
            return Err(ExpenseValidationError::EmptyName);
        }

        if self.currency_code.trim().is_empty() {
            return Err(ExpenseValidationError::EmptyCurrency);
        }

        Ok(())
    }
}

impl fmt::Display for Expense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.date_key(),
            self.name,
            self.amount,
            self.currency_code
        )
    }
}

/// Validation errors for expenses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseValidationError {
    EmptyName,
    EmptyCurrency,
    ZeroAmount,
}

impl fmt::Display for ExpenseValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "Expense name is required"),
            Self::EmptyCurrency => write!(f, "Currency code is required"),
            Self::ZeroAmount => write!(f, "Amount is required and must be non-zero"),
        }
    }
}

impl std::error::Error for ExpenseValidationError {}

impl From<ExpenseValidationError> for LedgerError {
    fn from(err: ExpenseValidationError) -> Self {
        LedgerError::Validation(err.to_string())
    }
}

/// Parse a caller-supplied `YYYY-MM-DD` date
pub fn parse_date_input(raw: &str) -> LedgerResult<NaiveDate> {
    let raw = raw.trim();
    // chrono accepts single-digit fields for %m/%d; require the padded form
    if raw.len() != 10 {
        return Err(invalid_date(raw));
    }
    NaiveDate::parse_from_str(raw, STORAGE_DATE_FORMAT).map_err(|_| invalid_date(raw))
}

fn invalid_date(raw: &str) -> LedgerError {
    LedgerError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
}

/// Input for creating a new expense
#[derive(Debug, Clone, Default)]
pub struct CreateExpenseInput {
    pub amount: Decimal,
    pub currency_code: String,
    pub name: String,
    pub description: Option<String>,
    /// `YYYY-MM-DD`; today when absent
    pub date: Option<String>,
    pub category_id: Option<CategoryId>,
}

/// Partial update for an expense
///
/// `None` leaves a field untouched. `Some` values are applied as given, so a
/// zero amount or an empty description can be set explicitly.
#[derive(Debug, Clone, Default)]
pub struct UpdateExpenseInput {
    pub amount: Option<Decimal>,
    pub currency_code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    /// `Some(None)` clears the category
    pub category_id: Option<Option<CategoryId>>,
}

impl UpdateExpenseInput {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.currency_code.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.category_id.is_none()
    }
}

/// A validated set of field replacements handed to the record store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpensePatch {
    pub amount: Option<Decimal>,
    pub currency_code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub category_id: Option<Option<CategoryId>>,
}

impl ExpensePatch {
    /// Apply the present fields to `expense`
    pub fn apply(&self, expense: &mut Expense) {
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(currency_code) = &self.currency_code {
            expense.currency_code = currency_code.clone();
        }
        if let Some(name) = &self.name {
            expense.name = name.clone();
        }
        if let Some(description) = &self.description {
            expense.description = description.clone();
        }
        if let Some(date) = self.date {
            expense.date = date;
        }
        if let Some(category_id) = self.category_id {
            expense.category_id = category_id;
        }
        expense.updated_at = Utc::now();
    }
}
