//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod category;
pub mod expense;
pub mod tag;
pub mod transfer;

pub use category::{handle_category_command, CategoryCommands};
pub use expense::{handle_expense_command, ExpenseCommands};
pub use tag::{handle_tag_command, TagCommands};
pub use transfer::{handle_export_command, handle_import_command};

use std::str::FromStr;

use serde::Serialize;

use crate::config::Settings;
use crate::display::CategoryNames;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{CategoryId, OwnerId};
use crate::services::CategoryService;
use crate::storage::Storage;

/// What every command needs besides its own arguments
pub struct CommandContext<'a> {
    pub storage: &'a Storage,
    pub settings: &'a Settings,
    pub owner: OwnerId,
    /// Print JSON instead of tables
    pub json: bool,
}

impl CommandContext<'_> {
    /// Print `value` as JSON, or `text()` otherwise
    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) -> LedgerResult<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", text());
        }
        Ok(())
    }

    /// Names of the owner's categories, for labelling expense rows
    ///
    /// Reads the repository directly so listing never creates the reserved
    /// Default category.
    pub fn category_names(&self) -> LedgerResult<CategoryNames> {
        Ok(self
            .storage
            .categories
            .list_for_owner(&self.owner)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect())
    }

    /// Resolve a category given by ID or by exact name
    pub fn resolve_category(&self, name_or_id: &str) -> LedgerResult<CategoryId> {
        if let Ok(id) = CategoryId::from_str(name_or_id) {
            return Ok(id);
        }

        CategoryService::new(self.storage, self.settings)
            .list(&self.owner)?
            .into_iter()
            .find(|c| c.name == name_or_id.trim())
            .map(|c| c.id)
            .ok_or_else(|| LedgerError::category_not_found(name_or_id))
    }
}

/// Parse an identifier given on the command line
pub fn parse_id<T: FromStr>(entity_type: &str, raw: &str) -> LedgerResult<T> {
    raw.parse()
        .map_err(|_| LedgerError::Validation(format!("Invalid {} ID: {}", entity_type, raw)))
}
