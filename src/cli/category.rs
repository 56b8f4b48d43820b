//! Category CLI commands
//!
//! Implements CLI commands for category management.

use clap::Subcommand;

use crate::display::{format_category_details, format_category_list};
use crate::error::LedgerResult;
use crate::services::{CategoryService, UpdateCategoryInput};

use super::CommandContext;

/// Category subcommands
#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List all categories
    List,

    /// Create a new category
    Create {
        /// Category name
        name: String,
        /// Display color (e.g. "#ff8800")
        #[arg(long, default_value = "")]
        color: String,
        /// Icon identifier
        #[arg(long, default_value = "")]
        icon: String,
    },

    /// Show category details
    Show {
        /// Category name or ID
        category: String,
    },

    /// Edit a category
    Edit {
        /// Category name or ID
        category: String,
        /// New name
        #[arg(short, long)]
        name: Option<String>,
        /// New color
        #[arg(long)]
        color: Option<String>,
        /// New icon
        #[arg(long)]
        icon: Option<String>,
    },

    /// Delete a category; expenses keep pointing at it
    Delete {
        /// Category name or ID
        category: String,
    },
}

/// Handle a category command
pub fn handle_category_command(
    ctx: &CommandContext<'_>,
    cmd: CategoryCommands,
) -> LedgerResult<()> {
    let service = CategoryService::new(ctx.storage, ctx.settings);

    match cmd {
        CategoryCommands::List => {
            let categories = service.list(&ctx.owner)?;
            ctx.emit(&categories, || format_category_list(&categories))?;
        }

        CategoryCommands::Create { name, color, icon } => {
            let category = service.create(&ctx.owner, &name, &color, &icon)?;
            ctx.emit(&category, || {
                format!("Created category: {} ({})", category.name, category.id)
            })?;
        }

        CategoryCommands::Show { category } => {
            let id = ctx.resolve_category(&category)?;
            let category = service.get(&ctx.owner, id)?;
            ctx.emit(&category, || format_category_details(&category))?;
        }

        CategoryCommands::Edit {
            category,
            name,
            color,
            icon,
        } => {
            let id = ctx.resolve_category(&category)?;
            let updated = service.update(
                &ctx.owner,
                id,
                UpdateCategoryInput {
                    name,
                    color,
                    icon_name: icon,
                },
            )?;
            ctx.emit(&updated, || format!("Updated category: {}", updated.name))?;
        }

        CategoryCommands::Delete { category } => {
            let id = ctx.resolve_category(&category)?;
            let deleted = service.delete(&ctx.owner, id)?;
            ctx.emit(&deleted, || format!("Deleted category: {}", deleted.name))?;
        }
    }

    Ok(())
}
