//! Core data models for the expense ledger
//!
//! Expenses are the central entity; categories and tags are per-owner labels
//! that expenses may point at.

pub mod category;
pub mod expense;
pub mod ids;
pub mod tag;

pub use category::{
    Category, CategoryValidationError, DEFAULT_CATEGORY_COLOR, DEFAULT_CATEGORY_ICON,
    DEFAULT_CATEGORY_NAME,
};
pub use expense::{
    parse_date_input, CreateExpenseInput, Expense, ExpensePatch, ExpenseValidationError,
    UpdateExpenseInput, STORAGE_DATE_FORMAT,
};
pub use ids::{CategoryId, ExpenseId, OwnerId, TagId};
pub use tag::Tag;
