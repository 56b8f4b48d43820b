//! CSV export functionality
//!
//! Writes an owner's expenses, oldest first, as a UTF-8 document with a
//! leading byte-order mark so spreadsheet tools pick the right encoding.
//! Amounts are written exactly as stored; import-time scaling is not undone.

use std::collections::HashMap;
use std::io::Write;

use chrono::Local;
use csv::{Terminator, WriterBuilder};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, instrument};

use crate::config::Settings;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{CategoryId, Expense, OwnerId};
use crate::storage::{CategoryLookup, Deadlines, ExpenseFilter, FindOptions, Storage};

/// Two decimal places, halves rounded away from zero as spreadsheets do
pub fn format_amount(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// UTF-8 byte-order mark
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Column titles of the exported document
pub const EXPORT_HEADER: [&str; 7] = [
    "Date",
    "Name",
    "Amount",
    "CurrencyCode",
    "Description",
    "CategoryID",
    "Category",
];

/// Media type of the exported document
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// An export framed as a file attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDownload {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Category names resolved on first use, for one export only
struct CategoryNames<'a> {
    lookup: &'a dyn CategoryLookup,
    cache: HashMap<CategoryId, String>,
}

impl<'a> CategoryNames<'a> {
    fn new(lookup: &'a dyn CategoryLookup) -> Self {
        Self {
            lookup,
            cache: HashMap::new(),
        }
    }

    /// Name of `id`; empty when the category no longer exists
    fn name(&mut self, id: CategoryId) -> LedgerResult<&str> {
        if !self.cache.contains_key(&id) {
            let name = self.lookup.name_of(id)?.unwrap_or_default();
            if name.is_empty() {
                debug!(category = %id, "category not resolved for export");
            }
            self.cache.insert(id, name);
        }
        Ok(self.cache.get(&id).map(String::as_str).unwrap_or(""))
    }
}

/// Write `expenses` as CSV to `writer`, BOM and header included
pub fn write_expenses_csv<W: Write>(
    writer: W,
    expenses: &[Expense],
    categories: &dyn CategoryLookup,
) -> LedgerResult<()> {
    let export_err = |e: csv::Error| LedgerError::Export(e.to_string());

    let mut writer = writer;
    writer
        .write_all(&UTF8_BOM)
        .map_err(|e| LedgerError::Export(e.to_string()))?;

    let mut csv_writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);
    csv_writer.write_record(EXPORT_HEADER).map_err(export_err)?;

    let mut names = CategoryNames::new(categories);
    for expense in expenses {
        let (category_id, category_name) = match expense.category_id {
            Some(id) => (id.to_string(), names.name(id)?.to_string()),
            None => (String::new(), String::new()),
        };

        csv_writer
            .write_record([
                expense.date.format("%-m/%-d/%Y").to_string(),
                expense.name.clone(),
                format_amount(expense.amount),
                expense.currency_code.clone(),
                expense.description.clone(),
                category_id,
                category_name,
            ])
            .map_err(export_err)?;
    }

    csv_writer
        .flush()
        .map_err(|e| LedgerError::Export(e.to_string()))?;
    Ok(())
}

/// Attachment name for an export taken now
pub fn download_file_name() -> String {
    format!("expenses_{}.csv", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Service for exporting an owner's expenses
pub struct CsvExportService<'a> {
    storage: &'a Storage,
    deadlines: Deadlines,
}

impl<'a> CsvExportService<'a> {
    /// Create a new export service
    pub fn new(storage: &'a Storage, settings: &Settings) -> Self {
        Self {
            storage,
            deadlines: Deadlines::new(settings.timeouts),
        }
    }

    /// The complete CSV document for `owner`
    #[instrument(skip(self), fields(owner = %owner))]
    pub fn export(&self, owner: &OwnerId) -> LedgerResult<Vec<u8>> {
        let store = self.storage.expenses();
        let filter = ExpenseFilter::owned_by(owner.clone());
        let expenses = self.deadlines.bulk_read("export expenses", || {
            store.find(&filter, FindOptions::ascending())
        })?;

        let mut bytes = Vec::new();
        write_expenses_csv(&mut bytes, &expenses, self.storage.category_lookup())?;

        info!(rows = expenses.len(), "exported expenses");
        Ok(bytes)
    }

    /// The export framed as a timestamped attachment
    pub fn download(&self, owner: &OwnerId) -> LedgerResult<CsvDownload> {
        Ok(CsvDownload {
            file_name: download_file_name(),
            content_type: CSV_CONTENT_TYPE,
            bytes: self.export(owner)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::LedgerPaths;
    use crate::models::{Category, CreateExpenseInput};
    use crate::services::{CsvImportService, ExpenseService};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, Storage) {
        let temp_dir = TempDir::new().unwrap();
        let paths = LedgerPaths::with_base_dir(temp_dir.path().to_path_buf());
        let storage = Storage::new(paths).unwrap();
        (temp_dir, storage)
    }

    fn owner(raw: &str) -> OwnerId {
        OwnerId::new(raw).unwrap()
    }

    fn add(storage: &Storage, who: &str, input: CreateExpenseInput) {
        ExpenseService::new(storage, &Settings::default())
            .create(&owner(who), input)
            .unwrap();
    }

    fn export_text(storage: &Storage, who: &str) -> String {
        let bytes = CsvExportService::new(storage, &Settings::default())
            .export(&owner(who))
            .unwrap();
        assert_eq!(&bytes[..3], &UTF8_BOM);
        String::from_utf8(bytes[3..].to_vec()).unwrap()
    }

    #[test]
    fn test_empty_export_has_bom_and_header() {
        let (_temp_dir, storage) = create_test_storage();

        let text = export_text(&storage, "u1");

        assert_eq!(
            text,
            "Date,Name,Amount,CurrencyCode,Description,CategoryID,Category\n"
        );
    }

    #[test]
    fn test_rows_are_oldest_first_and_formatted() {
        let (_temp_dir, storage) = create_test_storage();
        let food = storage
            .categories
            .insert_if_name_free(Category::new(owner("u1"), "Food", "", ""))
            .unwrap()
            .unwrap();

        add(
            &storage,
            "u1",
            CreateExpenseInput {
                amount: dec!(12.5),
                currency_code: "USD".into(),
                name: "Lunch, late".into(),
                description: Some("with team".into()),
                date: Some("2024-03-15".into()),
                category_id: Some(food.id),
            },
        );
        add(
            &storage,
            "u1",
            CreateExpenseInput {
                amount: dec!(3),
                currency_code: "USD".into(),
                name: "Bus".into(),
                date: Some("2024-01-02".into()),
                ..Default::default()
            },
        );
        add(
            &storage,
            "u2",
            CreateExpenseInput {
                amount: dec!(1),
                currency_code: "USD".into(),
                name: "Other owner".into(),
                date: Some("2024-01-01".into()),
                ..Default::default()
            },
        );

        let text = export_text(&storage, "u1");
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "1/2/2024,Bus,3.00,USD,,,");
        assert_eq!(
            lines[2],
            format!("3/15/2024,\"Lunch, late\",12.50,USD,with team,{},Food", food.id)
        );
    }

    #[test]
    fn test_deleted_category_exports_empty_name() {
        let (_temp_dir, storage) = create_test_storage();
        let gone = storage
            .categories
            .insert_if_name_free(Category::new(owner("u1"), "Gone", "", ""))
            .unwrap()
            .unwrap();
        add(
            &storage,
            "u1",
            CreateExpenseInput {
                amount: dec!(7),
                currency_code: "USD".into(),
                name: "Thing".into(),
                date: Some("2024-02-01".into()),
                category_id: Some(gone.id),
                ..Default::default()
            },
        );
        storage.categories.delete(gone.id).unwrap();

        let text = export_text(&storage, "u1");

        assert_eq!(
            text.lines().nth(1).unwrap(),
            format!("2/1/2024,Thing,7.00,USD,,{},", gone.id)
        );
    }

    #[test]
    fn test_amounts_round_half_away_from_zero() {
        assert_eq!(format_amount(dec!(0.125)), "0.13");
        assert_eq!(format_amount(dec!(0.135)), "0.14");
        assert_eq!(format_amount(dec!(-0.125)), "-0.13");
        assert_eq!(format_amount(dec!(0.124)), "0.12");
        assert_eq!(format_amount(dec!(7)), "7.00");
    }

    #[test]
    fn test_imported_vnd_is_not_unscaled() {
        let (_temp_dir, storage) = create_test_storage();
        CsvImportService::new(&storage, &Settings::default())
            .import(
                &owner("u1"),
                "Date,Name,Price,Note,Currency\n3/1/2024,Pho,5.5,,\n".as_bytes(),
            )
            .unwrap();

        let text = export_text(&storage, "u1");

        assert_eq!(text.lines().nth(1).unwrap(), "3/1/2024,Pho,5500.00,VND,,,");
    }

    #[test]
    fn test_exported_document_is_rejected_on_reimport() {
        let (_temp_dir, storage) = create_test_storage();
        add(
            &storage,
            "u1",
            CreateExpenseInput {
                amount: dec!(5),
                currency_code: "VND".into(),
                name: "Pho".into(),
                date: Some("2024-03-01".into()),
                ..Default::default()
            },
        );
        let bytes = CsvExportService::new(&storage, &Settings::default())
            .export(&owner("u1"))
            .unwrap();

        // Seven columns never match the five-column import layout
        let importer = CsvImportService::new(&storage, &Settings::default());
        assert!(importer.import(&owner("u2"), bytes.as_slice()).is_err());
    }

    #[test]
    fn test_download_framing() {
        let (_temp_dir, storage) = create_test_storage();

        let download = CsvExportService::new(&storage, &Settings::default())
            .download(&owner("u1"))
            .unwrap();

        assert_eq!(download.content_type, "text/csv; charset=utf-8");
        assert!(download.file_name.starts_with("expenses_"));
        assert!(download.file_name.ends_with(".csv"));
        // expenses_YYYYMMDD_HHMMSS.csv
        assert_eq!(download.file_name.len(), "expenses_".len() + 15 + ".csv".len());
        assert_eq!(&download.bytes[..3], &UTF8_BOM);
    }
}
