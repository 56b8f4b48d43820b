//! Tag CLI commands

use clap::Subcommand;

use crate::display::format_tag_list;
use crate::error::LedgerResult;
use crate::models::TagId;
use crate::services::TagService;

use super::{parse_id, CommandContext};

/// Tag subcommands
#[derive(Subcommand)]
pub enum TagCommands {
    /// List all tags
    List,

    /// Create a new tag
    Create {
        /// Tag name
        name: String,
    },

    /// Show a tag
    Show {
        /// Tag ID
        id: String,
    },
}

/// Handle a tag command
pub fn handle_tag_command(ctx: &CommandContext<'_>, cmd: TagCommands) -> LedgerResult<()> {
    let service = TagService::new(ctx.storage, ctx.settings);

    match cmd {
        TagCommands::List => {
            let tags = service.list(&ctx.owner)?;
            ctx.emit(&tags, || format_tag_list(&tags))?;
        }
        TagCommands::Create { name } => {
            let tag = service.create(&ctx.owner, &name)?;
            ctx.emit(&tag, || format!("Created tag: {} ({})", tag, tag.id))?;
        }
        TagCommands::Show { id } => {
            let id: TagId = parse_id("tag", &id)?;
            let tag = service.get(&ctx.owner, id)?;
            ctx.emit(&tag, || format!("{}  {}", tag.id, tag))?;
        }
    }

    Ok(())
}
