//! CLI handlers for CSV import and export

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::display::format_upload_result;
use crate::error::{LedgerError, LedgerResult};
use crate::export::CsvExportService;
use crate::services::CsvImportService;

use super::CommandContext;

/// Import a five-column expense sheet
pub fn handle_import_command(ctx: &CommandContext<'_>, file: &Path) -> LedgerResult<()> {
    let result = CsvImportService::new(ctx.storage, ctx.settings).import_file(&ctx.owner, file)?;
    ctx.emit(&result, || format_upload_result(&result))
}

/// Export the owner's expenses
///
/// Without `output` the file gets its timestamped download name in the
/// current directory; `-` writes the document to stdout.
pub fn handle_export_command(ctx: &CommandContext<'_>, output: Option<PathBuf>) -> LedgerResult<()> {
    let download = CsvExportService::new(ctx.storage, ctx.settings).download(&ctx.owner)?;

    if output.as_deref() == Some(Path::new("-")) {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(&download.bytes)
            .and_then(|_| stdout.flush())
            .map_err(|e| LedgerError::Export(e.to_string()))?;
        return Ok(());
    }

    let path = output.unwrap_or_else(|| PathBuf::from(&download.file_name));
    fs::write(&path, &download.bytes).map_err(|e| {
        LedgerError::Export(format!("Failed to write {}: {}", path.display(), e))
    })?;

    ctx.emit(
        &serde_json::json!({
            "file": path.display().to_string(),
            "content_type": download.content_type,
            "bytes": download.bytes.len(),
        }),
        || format!("Exported {} bytes to {}", download.bytes.len(), path.display()),
    )
}
