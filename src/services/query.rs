//! Listing and aggregation over an owner's expenses
//!
//! Paged listings sort newest first with ties kept in insertion order, so
//! pages of a fixed snapshot never overlap or skip records.
//!
//! The rolling totals are defined over *active days*: the last N distinct
//! dates on which the owner recorded anything, however far back those are.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::Settings;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{CategoryId, Expense, OwnerId};
use crate::storage::{DailyTotal, Deadlines, ExpenseFilter, FindOptions, Storage};

/// Validated offset/limit pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(offset: u64, limit: u64) -> LedgerResult<Self> {
        if limit == 0 {
            return Err(LedgerError::Validation(
                "Limit must be a positive integer".into(),
            ));
        }
        Ok(Self { offset, limit })
    }

    /// Parse raw query values; blanks fall back to offset 0 and `default_limit`
    pub fn parse(
        offset: Option<&str>,
        limit: Option<&str>,
        default_limit: u64,
    ) -> LedgerResult<Self> {
        let offset = match offset.map(str::trim).filter(|s| !s.is_empty()) {
            None => 0,
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| {
                    LedgerError::Validation(format!(
                        "Offset must be a non-negative integer, got '{}'",
                        raw
                    ))
                })?,
        };

        let limit = match limit.map(str::trim).filter(|s| !s.is_empty()) {
            None => default_limit,
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|n| *n > 0)
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| {
                    LedgerError::Validation(format!(
                        "Limit must be a positive integer, got '{}'",
                        raw
                    ))
                })?,
        };

        Self::new(offset, limit)
    }

    pub fn current_page(&self) -> u64 {
        self.offset / self.limit + 1
    }

    pub fn total_pages(&self, total_count: u64) -> u64 {
        total_count.div_ceil(self.limit)
    }
}

/// One page of expenses
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedExpenses {
    pub expenses: Vec<Expense>,
    pub total_count: u64,
    pub current_page: u64,
    pub total_pages: u64,
    pub limit: u64,
}

/// All expenses of one calendar month
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyExpenses {
    pub expenses: Vec<Expense>,
    /// Sum of amounts, truncated toward zero
    pub total_amount: i64,
}

/// Rolling totals over the most recent active days
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastExpenses {
    pub total_expenses_last_7_days: Decimal,
    pub total_expenses_last_30_days: Decimal,
}

/// Sum of the `days` most recent per-date totals
///
/// `daily` may be in any order.
pub fn sum_latest_days(daily: &[DailyTotal], days: usize) -> LedgerResult<Decimal> {
    let mut by_recency: Vec<&DailyTotal> = daily.iter().collect();
    by_recency.sort_by(|a, b| b.date.cmp(&a.date));
    by_recency
        .into_iter()
        .take(days)
        .try_fold(Decimal::ZERO, |sum, day| sum.checked_add(day.total))
        .ok_or_else(LedgerError::total_out_of_range)
}

/// First day of `month` and of the month after it
pub fn month_bounds(month: u32, year: i32) -> LedgerResult<(NaiveDate, NaiveDate)> {
    if !(1..=12).contains(&month) {
        return Err(LedgerError::Validation(format!(
            "Month must be between 1 and 12, got {}",
            month
        )));
    }

    let invalid_year = || LedgerError::Validation(format!("Year {} is out of range", year));
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid_year)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or_else(invalid_year)?;

    Ok((start, end))
}

fn truncate_to_i64(total: Decimal) -> i64 {
    total.trunc().to_i64().unwrap_or(if total.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Service for paged listings and aggregates
pub struct ExpenseQueryService<'a> {
    storage: &'a Storage,
    deadlines: Deadlines,
    default_limit: u64,
}

impl<'a> ExpenseQueryService<'a> {
    pub fn new(storage: &'a Storage, settings: &Settings) -> Self {
        Self {
            storage,
            deadlines: Deadlines::new(settings.timeouts),
            default_limit: settings.default_page_limit,
        }
    }

    /// Page size used when none is requested
    pub fn default_limit(&self) -> u64 {
        self.default_limit
    }

    /// One page of the owner's expenses, newest first
    #[instrument(skip(self), fields(owner = %owner))]
    pub fn list(
        &self,
        owner: &OwnerId,
        page: PageRequest,
        category_id: Option<CategoryId>,
    ) -> LedgerResult<PaginatedExpenses> {
        let store = self.storage.expenses();

        let mut filter = ExpenseFilter::owned_by(owner.clone());
        if let Some(category_id) = category_id {
            filter = filter.category(category_id);
        }

        let options = FindOptions::default()
            .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
            .limit(usize::try_from(page.limit).unwrap_or(usize::MAX));

        let (expenses, total_count) = self
            .deadlines
            .read("list expenses", || store.find_page(&filter, options))?;

        debug!(returned = expenses.len(), total_count, "listed expenses");
        Ok(PaginatedExpenses {
            expenses,
            total_count,
            current_page: page.current_page(),
            total_pages: page.total_pages(total_count),
            limit: page.limit,
        })
    }

    /// Every expense dated within the month, oldest first
    #[instrument(skip(self), fields(owner = %owner))]
    pub fn monthly(&self, owner: &OwnerId, month: u32, year: i32) -> LedgerResult<MonthlyExpenses> {
        let (start, end) = month_bounds(month, year)?;
        let store = self.storage.expenses();
        let filter = ExpenseFilter::owned_by(owner.clone()).between(start, end);

        let expenses = self
            .deadlines
            .aggregate("monthly expenses", || {
                store.find(&filter, FindOptions::ascending())
            })?;
        // Saturates; the reported total is clamped to i64 anyway
        let total = expenses
            .iter()
            .fold(Decimal::ZERO, |sum, e| sum.saturating_add(e.amount));

        Ok(MonthlyExpenses {
            total_amount: truncate_to_i64(total),
            expenses,
        })
    }

    /// Sum over the owner's `days` most recent active days
    pub fn sum_last_active_days(&self, owner: &OwnerId, days: usize) -> LedgerResult<Decimal> {
        sum_latest_days(&self.daily_totals(owner)?, days)
    }

    /// Totals over the last 7 and last 30 active days
    #[instrument(skip(self), fields(owner = %owner))]
    pub fn last(&self, owner: &OwnerId) -> LedgerResult<LastExpenses> {
        let daily = self.daily_totals(owner)?;

        Ok(LastExpenses {
            total_expenses_last_7_days: sum_latest_days(&daily, 7)?,
            total_expenses_last_30_days: sum_latest_days(&daily, 30)?,
        })
    }

    fn daily_totals(&self, owner: &OwnerId) -> LedgerResult<Vec<DailyTotal>> {
        let store = self.storage.expenses();
        let filter = ExpenseFilter::owned_by(owner.clone());
        self.deadlines
            .aggregate("sum expenses by date", || store.sum_by_date(&filter))
    }
}
