//! Export module for the expense ledger
//!
//! Produces the spreadsheet-compatible CSV download of an owner's expenses.

pub mod csv;

pub use self::csv::{
    download_file_name, write_expenses_csv, CsvDownload, CsvExportService, CSV_CONTENT_TYPE,
    EXPORT_HEADER, UTF8_BOM,
};
