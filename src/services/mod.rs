//! Service layer for the expense ledger
//!
//! The service layer provides business logic on top of the storage layer,
//! handling validation, owner scoping and store deadlines.

pub mod category;
pub mod expense;
pub mod import;
pub mod query;
pub mod tag;

pub use category::{CategoryService, UpdateCategoryInput};
pub use expense::ExpenseService;
pub use import::{CsvImportService, CsvUploadResponse};
pub use query::{
    ExpenseQueryService, LastExpenses, MonthlyExpenses, PageRequest, PaginatedExpenses,
};
pub use tag::TagService;
