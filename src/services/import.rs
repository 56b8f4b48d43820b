//! CSV import service
//!
//! Reads five-column sheets (`date, name, price, note, currency`) into
//! expenses. Rows are processed strictly in order: a blank date reuses the
//! last date parsed earlier in the same file, and the duplicate check sees
//! rows inserted earlier in the run. A bad row is reported by line number and
//! never aborts the batch.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::{ImportSettings, Settings};
use crate::error::{LedgerError, LedgerResult};
use crate::models::{Expense, OwnerId};
use crate::storage::{Deadlines, Storage};

/// Columns every row must have
pub const FIELD_COUNT: usize = 5;

/// Rejection for sources without a `.csv` name
pub const NOT_CSV_MESSAGE: &str = "File must be a CSV";

/// Rejection for an unreadable header row
pub const HEADER_MESSAGE: &str = "Could not read CSV header";

/// Tally returned for every import, whatever the per-row outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CsvUploadResponse {
    pub success_count: u64,
    pub error_count: u64,
    pub errors: Vec<String>,
}

impl CsvUploadResponse {
    fn record_error(&mut self, line: u64, error: RowError) {
        debug!(line, %error, "row rejected");
        self.error_count += 1;
        self.errors.push(format!("Line {}: {}", line, error));
    }
}

/// Why a row was not imported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowError {
    Unreadable,
    NoCarriedDate,
    InvalidDate,
    InvalidPrice,
    AmountOutOfRange,
    Duplicate,
    SaveFailed,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::Unreadable => "Could not read row",
            Self::NoCarriedDate => "Empty date field with no previous valid date",
            Self::InvalidDate => "Invalid date format",
            Self::InvalidPrice => "Invalid price",
            Self::AmountOutOfRange => "Amount out of range",
            Self::Duplicate => "Expense with same name and date existed",
            Self::SaveFailed => "Could not save expense",
        };
        f.write_str(message)
    }
}

/// What happened to one data row
#[derive(Debug)]
enum RowOutcome {
    Imported(Expense),
    /// Name and price both blank; not counted
    Blank,
    Rejected(RowError),
}

/// Parse a sheet date in `M/D/YYYY` form (leading zeros optional)
pub fn parse_sheet_date(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.split('/');
    let (month, day, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let short_number = |s: &str| {
        (1..=2).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
    };
    if !short_number(month)
        || !short_number(day)
        || year.len() != 4
        || !year.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Parse a price such as `5.5`, `-12` or `1e3`
pub fn parse_price(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Service for importing expenses from CSV sheets
pub struct CsvImportService<'a> {
    storage: &'a Storage,
    rules: ImportSettings,
    deadlines: Deadlines,
}

impl<'a> CsvImportService<'a> {
    /// Create a new import service
    pub fn new(storage: &'a Storage, settings: &Settings) -> Self {
        Self {
            storage,
            rules: settings.import.clone(),
            deadlines: Deadlines::new(settings.timeouts),
        }
    }

    /// Import a file from disk; the name must end in `.csv`
    pub fn import_file(&self, owner: &OwnerId, path: &Path) -> LedgerResult<CsvUploadResponse> {
        let is_csv = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.to_lowercase().ends_with(".csv"))
            .unwrap_or(false);
        if !is_csv {
            return Err(LedgerError::Validation(NOT_CSV_MESSAGE.into()));
        }

        let file = File::open(path).map_err(|e| {
            LedgerError::Import(format!("Could not open file {}: {}", path.display(), e))
        })?;

        self.import(owner, BufReader::new(file))
    }

    /// Import every data row of `source`
    ///
    /// Fails only when the header row cannot be read; row problems are
    /// reported in the returned tally.
    #[instrument(skip(self, source), fields(owner = %owner))]
    pub fn import<R: Read>(&self, owner: &OwnerId, source: R) -> LedgerResult<CsvUploadResponse> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(source);
        let mut records = reader.records();

        match records.next() {
            Some(Ok(header)) if header.len() == FIELD_COUNT => {}
            _ => return Err(LedgerError::Validation(HEADER_MESSAGE.into())),
        }

        let mut response = CsvUploadResponse::default();
        let mut carried_date = None;

        for (line, record) in (2u64..).zip(records) {
            let outcome = match record {
                Ok(record) if record.len() == FIELD_COUNT => {
                    self.import_row(owner, &record, &mut carried_date)
                }
                _ => RowOutcome::Rejected(RowError::Unreadable),
            };

            match outcome {
                RowOutcome::Imported(expense) => {
                    debug!(line, id = %expense.id, "row imported");
                    response.success_count += 1;
                }
                RowOutcome::Blank => debug!(line, "blank row skipped"),
                RowOutcome::Rejected(error) => response.record_error(line, error),
            }
        }

        info!(
            imported = response.success_count,
            rejected = response.error_count,
            "csv import finished"
        );
        Ok(response)
    }

    fn import_row(
        &self,
        owner: &OwnerId,
        record: &StringRecord,
        carried_date: &mut Option<NaiveDate>,
    ) -> RowOutcome {
        let field = |index: usize| record.get(index).unwrap_or("").trim();

        let date = match field(0) {
            "" => match *carried_date {
                Some(date) => date,
                None => return RowOutcome::Rejected(RowError::NoCarriedDate),
            },
            raw => match parse_sheet_date(raw) {
                Some(date) => {
                    *carried_date = Some(date);
                    date
                }
                None => return RowOutcome::Rejected(RowError::InvalidDate),
            },
        };

        let (name, price) = (field(1), field(2));
        if name.is_empty() && price.is_empty() {
            return RowOutcome::Blank;
        }
        let name = if name.is_empty() {
            self.rules.placeholder_name.as_str()
        } else {
            name
        };

        let Some(price) = parse_price(price) else {
            return RowOutcome::Rejected(RowError::InvalidPrice);
        };

        let currency = match field(4) {
            "" => self.rules.fallback_currency.as_str(),
            code => code,
        };
        let Some(amount) = self.rules.normalize_amount(price, currency) else {
            return RowOutcome::Rejected(RowError::AmountOutOfRange);
        };

        let expense =
            Expense::new(owner.clone(), name, amount, currency, date).with_description(field(3));

        let store = self.storage.expenses();
        match self
            .deadlines
            .bulk_write("import row", || store.insert_unique(expense))
        {
            Ok(Some(expense)) => RowOutcome::Imported(expense),
            Ok(None) => RowOutcome::Rejected(RowError::Duplicate),
            Err(e) => {
                warn!(error = %e, "could not store imported row");
                RowOutcome::Rejected(RowError::SaveFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use crate::models::ExpensePatch;
    use crate::storage::{DailyTotal, ExpenseFilter, ExpenseStore, FindOptions};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    const HEADER: &str = "Date,Name,Price,Note,Currency\n";

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        (temp_dir, storage)
    }

    fn owner(raw: &str) -> OwnerId {
        OwnerId::new(raw).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn import(storage: &Storage, who: &str, rows: &str) -> CsvUploadResponse {
        let service = CsvImportService::new(storage, &Settings::default());
        let csv_data = format!("{}{}", HEADER, rows);
        service.import(&owner(who), csv_data.as_bytes()).unwrap()
    }

    fn stored(storage: &Storage, who: &str) -> Vec<Expense> {
        storage
            .expenses()
            .find(&ExpenseFilter::owned_by(owner(who)), FindOptions::ascending())
            .unwrap()
    }

    #[test]
    fn test_parse_sheet_date() {
        assert_eq!(parse_sheet_date("3/1/2024"), Some(date(2024, 3, 1)));
        assert_eq!(parse_sheet_date("03/01/2024"), Some(date(2024, 3, 1)));
        assert_eq!(parse_sheet_date("12/31/1999"), Some(date(1999, 12, 31)));
        assert_eq!(parse_sheet_date("2024-03-01"), None);
        assert_eq!(parse_sheet_date("13/1/2024"), None);
        assert_eq!(parse_sheet_date("2/30/2024"), None);
        assert_eq!(parse_sheet_date("3/1/24"), None);
        assert_eq!(parse_sheet_date("3/1/2024/1"), None);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("5.5"), Some(dec!(5.5)));
        assert_eq!(parse_price("-12"), Some(dec!(-12)));
        assert_eq!(parse_price("1e3"), Some(dec!(1000)));
        assert_eq!(parse_price("abc"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn test_vnd_default_is_scaled_and_other_currencies_are_not() {
        let (_temp_dir, storage) = create_test_storage();

        let result = import(&storage, "u1", "3/1/2024,Pho,5.5,,\n3/2/2024,Book,5.5,,USD\n");

        assert_eq!(result.success_count, 2);
        assert_eq!(result.error_count, 0);
        let expenses = stored(&storage, "u1");
        assert_eq!(expenses[0].currency_code, "VND");
        assert_eq!(expenses[0].amount, dec!(5500));
        assert_eq!(expenses[1].currency_code, "USD");
        assert_eq!(expenses[1].amount, dec!(5.5));
    }

    #[test]
    fn test_blank_date_carries_forward() {
        let (_temp_dir, storage) = create_test_storage();

        let result = import(&storage, "u1", "3/1/2024,A,10,,USD\n,B,20,,USD\n");

        assert_eq!(result.success_count, 2);
        let expenses = stored(&storage, "u1");
        assert!(expenses.iter().all(|e| e.date == date(2024, 3, 1)));
        assert_eq!(expenses[1].date_key(), "2024-03-01");
    }

    #[test]
    fn test_blank_date_without_previous_is_rejected() {
        let (_temp_dir, storage) = create_test_storage();

        let result = import(&storage, "u1", ",A,10,,USD\n");

        assert_eq!(result.success_count, 0);
        assert_eq!(
            result.errors,
            vec!["Line 2: Empty date field with no previous valid date"]
        );
    }

    #[test]
    fn test_invalid_date_does_not_update_carried_date() {
        let (_temp_dir, storage) = create_test_storage();

        let result = import(
            &storage,
            "u1",
            "3/1/2024,A,10,,USD\n2024-03-05,B,10,,USD\n,C,10,,USD\n",
        );

        assert_eq!(result.success_count, 2);
        assert_eq!(result.errors, vec!["Line 3: Invalid date format"]);
        let c = stored(&storage, "u1").into_iter().find(|e| e.name == "C").unwrap();
        assert_eq!(c.date, date(2024, 3, 1));
    }

    #[test]
    fn test_second_import_reports_duplicate() {
        let (_temp_dir, storage) = create_test_storage();

        let first = import(&storage, "u1", "3/1/2024,Lunch,10,,USD\n");
        let second = import(&storage, "u1", "3/1/2024,Lunch,99,,USD\n");

        assert_eq!(first.success_count, 1);
        assert_eq!(second.success_count, 0);
        assert_eq!(second.error_count, 1);
        assert_eq!(
            second.errors,
            vec!["Line 2: Expense with same name and date existed"]
        );
        assert_eq!(stored(&storage, "u1").len(), 1);

        // Another owner is unaffected
        assert_eq!(import(&storage, "u2", "3/1/2024,Lunch,10,,USD\n").success_count, 1);
    }

    #[test]
    fn test_duplicates_within_one_file() {
        let (_temp_dir, storage) = create_test_storage();

        let result = import(&storage, "u1", "3/1/2024,Lunch,10,,USD\n,Lunch,12,,USD\n");

        assert_eq!(result.success_count, 1);
        assert_eq!(
            result.errors,
            vec!["Line 3: Expense with same name and date existed"]
        );
    }

    #[test]
    fn test_blank_rows_placeholder_names_and_bad_prices() {
        let (_temp_dir, storage) = create_test_storage();

        let rows = "3/1/2024,,,,\n\
                    3/1/2024,,7,,USD\n\
                    3/1/2024,Taxi,abc,,USD\n\
                    3/1/2024,Bus,2, day pass ,USD\n";
        let result = import(&storage, "u1", rows);

        assert_eq!(result.success_count, 2);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.errors, vec!["Line 4: Invalid price"]);

        let expenses = stored(&storage, "u1");
        assert_eq!(expenses[0].name, "No Name");
        assert_eq!(expenses[0].amount, dec!(7));
        assert_eq!(expenses[1].name, "Bus");
        assert_eq!(expenses[1].description, "day pass");
    }

    #[test]
    fn test_scaled_amount_overflow_skips_only_that_row() {
        let (_temp_dir, storage) = create_test_storage();

        let rows = format!("3/1/2024,Big,{},,\n3/2/2024,Ok,1,,USD\n", Decimal::MAX);
        let result = import(&storage, "u1", &rows);

        assert_eq!(result.success_count, 1);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.errors, vec!["Line 2: Amount out of range"]);
        let expenses = stored(&storage, "u1");
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].name, "Ok");
    }

    #[test]
    fn test_wrong_field_count_is_unreadable() {
        let (_temp_dir, storage) = create_test_storage();

        let result = import(&storage, "u1", "3/1/2024,A,10\n3/2/2024,B,10,,USD\n");

        assert_eq!(result.success_count, 1);
        assert_eq!(result.errors, vec!["Line 2: Could not read row"]);
    }

    #[test]
    fn test_header_must_be_readable() {
        let (_temp_dir, storage) = create_test_storage();
        let service = CsvImportService::new(&storage, &Settings::default());

        let empty = service.import(&owner("u1"), "".as_bytes()).unwrap_err();
        assert!(empty.is_validation());
        assert!(empty.to_string().contains(HEADER_MESSAGE));

        let short = service
            .import(&owner("u1"), "Date,Name\n3/1/2024,A\n".as_bytes())
            .unwrap_err();
        assert!(short.is_validation());
    }

    #[test]
    fn test_import_file_requires_csv_name() {
        let (temp_dir, storage) = create_test_storage();
        let service = CsvImportService::new(&storage, &Settings::default());

        let txt = temp_dir.path().join("expenses.txt");
        std::fs::write(&txt, format!("{}3/1/2024,A,1,,USD\n", HEADER)).unwrap();
        let err = service.import_file(&owner("u1"), &txt).unwrap_err();
        assert_eq!(err.to_string(), format!("Validation error: {}", NOT_CSV_MESSAGE));

        let upper = temp_dir.path().join("EXPENSES.CSV");
        std::fs::write(&upper, format!("{}3/1/2024,A,1,,USD\n", HEADER)).unwrap();
        assert_eq!(service.import_file(&owner("u1"), &upper).unwrap().success_count, 1);

        let missing = temp_dir.path().join("missing.csv");
        assert!(matches!(
            service.import_file(&owner("u1"), &missing).unwrap_err(),
            LedgerError::Import(_)
        ));
    }

    #[test]
    fn test_response_always_reports_both_counts() {
        let json = serde_json::to_value(CsvUploadResponse::default()).unwrap();
        assert_eq!(json["success_count"], 0);
        assert_eq!(json["error_count"], 0);
        assert_eq!(json["errors"], serde_json::json!([]));
    }

    /// Store whose inserts always fail
    struct FailingStore;

    impl ExpenseStore for FailingStore {
        fn insert(&self, _: Expense) -> LedgerResult<Expense> {
            Err(LedgerError::Storage("disk full".into()))
        }
        fn insert_unique(&self, _: Expense) -> LedgerResult<Option<Expense>> {
            Err(LedgerError::Storage("disk full".into()))
        }
        fn find_one(&self, _: &ExpenseFilter) -> LedgerResult<Option<Expense>> {
            Ok(None)
        }
        fn find(&self, _: &ExpenseFilter, _: FindOptions) -> LedgerResult<Vec<Expense>> {
            Ok(Vec::new())
        }
        fn count(&self, _: &ExpenseFilter) -> LedgerResult<u64> {
            Ok(0)
        }
        fn find_page(
            &self,
            _: &ExpenseFilter,
            _: FindOptions,
        ) -> LedgerResult<(Vec<Expense>, u64)> {
            Ok((Vec::new(), 0))
        }
        fn update_one(&self, _: &ExpenseFilter, _: &ExpensePatch) -> LedgerResult<u64> {
            Ok(0)
        }
        fn delete_one(&self, _: &ExpenseFilter) -> LedgerResult<u64> {
            Ok(0)
        }
        fn sum_by_date(&self, _: &ExpenseFilter) -> LedgerResult<Vec<DailyTotal>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_store_failure_is_a_row_error() {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::with_expense_store(paths, Box::new(FailingStore)).unwrap();

        let result = import(&storage, "u1", "3/1/2024,A,1,,USD\n3/2/2024,B,2,,USD\n");

        assert_eq!(result.success_count, 0);
        assert_eq!(
            result.errors,
            vec!["Line 2: Could not save expense", "Line 3: Could not save expense"]
        );
    }
}
