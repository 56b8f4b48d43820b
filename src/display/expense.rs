//! Expense display formatting
//!
//! Renders expenses, pages and aggregates for terminal output.

use std::collections::HashMap;

use tabled::builder::Builder;
use tabled::settings::Style;

use crate::models::{CategoryId, Expense};
use crate::services::{CsvUploadResponse, LastExpenses, MonthlyExpenses, PaginatedExpenses};

/// Category names keyed by id, used to label rows
pub type CategoryNames = HashMap<CategoryId, String>;

fn category_label(expense: &Expense, names: &CategoryNames) -> String {
    match expense.category_id {
        Some(id) => names.get(&id).cloned().unwrap_or_else(|| id.short()),
        None => "-".to_string(),
    }
}

/// Format expenses as a table
pub fn format_expense_table(expenses: &[Expense], names: &CategoryNames) -> String {
    if expenses.is_empty() {
        return "No expenses found.".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["ID", "Date", "Name", "Amount", "Currency", "Category"]);
    for expense in expenses {
        builder.push_record([
            expense.id.to_string(),
            expense.date_key(),
            truncate(&expense.name, 32),
            expense.amount.to_string(),
            expense.currency_code.clone(),
            category_label(expense, names),
        ]);
    }

    builder.build().with(Style::psql()).to_string()
}

/// Format one page of a listing with its position
pub fn format_expense_page(page: &PaginatedExpenses, names: &CategoryNames) -> String {
    format!(
        "{}\n\nPage {} of {} ({} expenses, {} per page)",
        format_expense_table(&page.expenses, names),
        page.current_page,
        page.total_pages,
        page.total_count,
        page.limit
    )
}

/// Format a monthly listing with its total
pub fn format_monthly(monthly: &MonthlyExpenses, names: &CategoryNames) -> String {
    format!(
        "{}\n\nTotal: {}",
        format_expense_table(&monthly.expenses, names),
        monthly.total_amount
    )
}

/// Format the rolling-window sums
pub fn format_last(last: &LastExpenses) -> String {
    format!(
        "Last 7 active days:  {}\nLast 30 active days: {}",
        last.total_expenses_last_7_days, last.total_expenses_last_30_days
    )
}

/// Format expense details
pub fn format_expense_details(expense: &Expense, category_name: Option<&str>) -> String {
    let mut output = String::new();

    output.push_str(&format!("Expense: {}\n", expense.name));
    output.push_str(&format!("  ID:          {}\n", expense.id));
    output.push_str(&format!("  Date:        {}\n", expense.date_key()));
    output.push_str(&format!(
        "  Amount:      {} {}\n",
        expense.amount, expense.currency_code
    ));

    if let Some(id) = expense.category_id {
        output.push_str(&format!(
            "  Category:    {} ({})\n",
            category_name.unwrap_or("deleted"),
            id
        ));
    }

    if !expense.description.is_empty() {
        output.push_str(&format!("  Description: {}\n", expense.description));
    }

    output.push('\n');
    output.push_str(&format!(
        "  Created:  {}\n",
        expense.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    output.push_str(&format!(
        "  Modified: {}\n",
        expense.updated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    output
}

/// Format the tally of a CSV import
pub fn format_upload_result(result: &CsvUploadResponse) -> String {
    let mut output = format!(
        "Imported: {}\nErrors:   {}\n",
        result.success_count, result.error_count
    );
    for error in &result.errors {
        output.push_str(&format!("  {}\n", error));
    }
    output
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept)
}
