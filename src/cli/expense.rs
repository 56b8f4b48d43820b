//! Expense CLI commands
//!
//! Implements CLI commands for recording, listing and aggregating expenses.

use std::str::FromStr;

use clap::Subcommand;
use rust_decimal::Decimal;

use crate::display::{
    format_expense_details, format_expense_page, format_last, format_monthly,
};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{CreateExpenseInput, ExpenseId, UpdateExpenseInput};
use crate::services::{ExpenseQueryService, ExpenseService, PageRequest};

use super::{parse_id, CommandContext};

/// Expense subcommands
#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record a new expense
    Add {
        /// What the money was spent on
        name: String,
        /// Amount as entered (e.g. "42.50"); never rescaled
        amount: String,
        /// Currency code
        #[arg(short = 'C', long)]
        currency: String,
        /// Date (YYYY-MM-DD), today when omitted
        #[arg(short, long)]
        date: Option<String>,
        /// Free-form note
        #[arg(short = 'm', long)]
        description: Option<String>,
        /// Category name or ID
        #[arg(short, long)]
        category: Option<String>,
    },

    /// List expenses, newest first
    List {
        /// Number of expenses to skip
        #[arg(long)]
        offset: Option<String>,
        /// Page size
        #[arg(short, long)]
        limit: Option<String>,
        /// Only expenses in this category (name or ID)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Show expense details
    Show {
        /// Expense ID
        id: String,
    },

    /// Edit an expense; only the given fields change
    Edit {
        /// Expense ID
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        amount: Option<String>,
        #[arg(short = 'C', long)]
        currency: Option<String>,
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short = 'm', long)]
        description: Option<String>,
        /// Category name or ID
        #[arg(short, long, conflicts_with = "clear_category")]
        category: Option<String>,
        /// Remove the category
        #[arg(long)]
        clear_category: bool,
    },

    /// Delete an expense
    Delete {
        /// Expense ID
        id: String,
    },

    /// All expenses of one month with their total
    Monthly {
        /// Month (1-12)
        month: u32,
        /// Year
        year: i32,
    },

    /// Totals over the last 7 and 30 days that have expenses
    Last,
}

fn parse_amount(raw: &str) -> LedgerResult<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|_| LedgerError::Validation(format!("Invalid amount: {}", raw)))
}

/// Handle an expense command
pub fn handle_expense_command(ctx: &CommandContext<'_>, cmd: ExpenseCommands) -> LedgerResult<()> {
    let service = ExpenseService::new(ctx.storage, ctx.settings);
    let queries = ExpenseQueryService::new(ctx.storage, ctx.settings);

    match cmd {
        ExpenseCommands::Add {
            name,
            amount,
            currency,
            date,
            description,
            category,
        } => {
            let category_id = category
                .as_deref()
                .map(|c| ctx.resolve_category(c))
                .transpose()?;

            let expense = service.create(
                &ctx.owner,
                CreateExpenseInput {
                    amount: parse_amount(&amount)?,
                    currency_code: currency,
                    name,
                    description,
                    date,
                    category_id,
                },
            )?;

            ctx.emit(&expense, || {
                format!("Recorded expense: {} ({})", expense.name, expense.id)
            })?;
        }

        ExpenseCommands::List {
            offset,
            limit,
            category,
        } => {
            let page = PageRequest::parse(
                offset.as_deref(),
                limit.as_deref(),
                queries.default_limit(),
            )?;
            let category_id = category
                .as_deref()
                .map(|c| ctx.resolve_category(c))
                .transpose()?;

            let result = queries.list(&ctx.owner, page, category_id)?;
            let names = ctx.category_names()?;
            ctx.emit(&result, || format_expense_page(&result, &names))?;
        }

        ExpenseCommands::Show { id } => {
            let id: ExpenseId = parse_id("expense", &id)?;
            let expense = service.get(&ctx.owner, id)?;

            let names = ctx.category_names()?;
            let category_name = expense
                .category_id
                .and_then(|c| names.get(&c))
                .map(String::as_str);
            ctx.emit(&expense, || format_expense_details(&expense, category_name))?;
        }

        ExpenseCommands::Edit {
            id,
            name,
            amount,
            currency,
            date,
            description,
            category,
            clear_category,
        } => {
            let id: ExpenseId = parse_id("expense", &id)?;

            let category_id = if clear_category {
                Some(None)
            } else {
                category
                    .as_deref()
                    .map(|c| ctx.resolve_category(c))
                    .transpose()?
                    .map(Some)
            };

            let input = UpdateExpenseInput {
                amount: amount.as_deref().map(parse_amount).transpose()?,
                currency_code: currency,
                name,
                description,
                date,
                category_id,
            };
            if input.is_empty() {
                return Err(LedgerError::Validation("Nothing to update".into()));
            }

            let expense = service.update(&ctx.owner, id, input)?;
            ctx.emit(&expense, || format!("Updated expense: {}", expense.name))?;
        }

        ExpenseCommands::Delete { id } => {
            let id: ExpenseId = parse_id("expense", &id)?;
            service.delete(&ctx.owner, id)?;
            ctx.emit(&serde_json::json!({ "deleted": id }), || {
                format!("Deleted expense: {}", id)
            })?;
        }

        ExpenseCommands::Monthly { month, year } => {
            let monthly = queries.monthly(&ctx.owner, month, year)?;
            let names = ctx.category_names()?;
            ctx.emit(&monthly, || format_monthly(&monthly, &names))?;
        }

        ExpenseCommands::Last => {
            let last = queries.last(&ctx.owner)?;
            ctx.emit(&last, || format_last(&last))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("42.50").unwrap(), dec!(42.50));
        assert_eq!(parse_amount(" -3 ").unwrap(), dec!(-3));
        assert!(parse_amount("4,2").unwrap_err().is_validation());
    }
}
