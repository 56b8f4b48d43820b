use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use expense_ledger::cli::{
    handle_category_command, handle_expense_command, handle_export_command,
    handle_import_command, handle_tag_command, CategoryCommands, CommandContext, ExpenseCommands,
    TagCommands,
};
use expense_ledger::config::{LedgerPaths, Settings};
use expense_ledger::models::OwnerId;
use expense_ledger::storage::Storage;
use expense_ledger::{LedgerError, LedgerResult};

#[derive(Parser)]
#[command(
    name = "ledger",
    version,
    about = "Personal expense ledger with CSV import and export",
    long_about = "Records expenses per user, lists them page by page, sums them \
                  by month or over the most recent active days, and moves them \
                  in and out of spreadsheets as CSV."
)]
struct Cli {
    /// User whose records are read and written
    #[arg(short, long, global = true, env = "LEDGER_USER")]
    user: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Expense management commands
    #[command(subcommand, alias = "exp")]
    Expense(ExpenseCommands),

    /// Import expenses from a CSV sheet (date, name, price, note, currency)
    Import {
        /// Path to a .csv file
        file: PathBuf,
    },

    /// Export all expenses as CSV
    Export {
        /// Output file; `-` for stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Category management commands
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Tag management commands
    #[command(subcommand)]
    Tag(TagCommands),

    /// Show current configuration and paths
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(level_for(cli.verbose));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let reason = err
                .downcast_ref::<LedgerError>()
                .map(LedgerError::reason)
                .unwrap_or("error");
            eprintln!("error[{}]: {:#}", reason, err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = LedgerPaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    let Some(command) = cli.command else {
        println!("ledger - personal expense ledger");
        println!();
        println!("Run 'ledger --help' for usage information.");
        return Ok(());
    };

    // Config is the only command that works without a user
    if matches!(command, Commands::Config) {
        return Ok(show_config(&paths, &settings, cli.json)?);
    }

    let user = cli.user.ok_or_else(|| {
        LedgerError::Validation("No user given; pass --user or set LEDGER_USER".into())
    })?;

    let storage = Storage::new(paths)?;
    let ctx = CommandContext {
        storage: &storage,
        settings: &settings,
        owner: OwnerId::new(user)?,
        json: cli.json,
    };

    dispatch(&ctx, command)?;
    Ok(())
}

fn dispatch(ctx: &CommandContext<'_>, command: Commands) -> LedgerResult<()> {
    match command {
        Commands::Expense(cmd) => handle_expense_command(ctx, cmd),
        Commands::Import { file } => handle_import_command(ctx, &file),
        Commands::Export { output } => handle_export_command(ctx, output),
        Commands::Category(cmd) => handle_category_command(ctx, cmd),
        Commands::Tag(cmd) => handle_tag_command(ctx, cmd),
        Commands::Config => show_config(ctx.storage.paths(), ctx.settings, ctx.json),
    }
}

fn show_config(paths: &LedgerPaths, settings: &Settings, json: bool) -> LedgerResult<()> {
    if !paths.settings_file().exists() {
        settings.save(paths)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(settings)?);
        return Ok(());
    }

    println!("Expense Ledger Configuration");
    println!("============================");
    println!("Base directory:  {}", paths.base_dir().display());
    println!("Data directory:  {}", paths.data_dir().display());
    println!("Settings file:   {}", paths.settings_file().display());
    println!();
    println!("Settings:");
    println!("  Default page size:   {}", settings.default_page_limit);
    println!(
        "  Import currency:     {} (x{} for {})",
        settings.import.fallback_currency,
        settings.import.scale_factor,
        settings.import.scaled_currency
    );
    println!("  Placeholder name:    {}", settings.import.placeholder_name);
    println!(
        "  Timeouts (ms):       read {}, write {}, aggregate {}, bulk {}",
        settings.timeouts.read_ms,
        settings.timeouts.write_ms,
        settings.timeouts.aggregate_ms,
        settings.timeouts.bulk_ms
    );
    Ok(())
}

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Initializes the tracing subscriber.
fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        // Only this crate's own events by default
        None => EnvFilter::new(format!(
            "expense_ledger={},{}={}",
            level,
            env!("CARGO_CRATE_NAME"),
            level
        )),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
