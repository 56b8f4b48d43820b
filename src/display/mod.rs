//! Display formatting for terminal output
//!
//! Provides utilities for formatting ledger data for terminal display.
//! Tables are rendered with `tabled`.

pub mod category;
pub mod expense;

pub use category::{format_category_details, format_category_list, format_tag_list};
pub use expense::{
    format_expense_details, format_expense_page, format_expense_table, format_last,
    format_monthly, format_upload_result, CategoryNames,
};
