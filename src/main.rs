use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ftax::doctor;
use ftax::llm::{CategorizationClient, OllamaClientBuilder, RuleBasedClient};
use ftax::scanner::ScanOptions;
use ftax::sorter::sort_directory;
use ftax::utils::{directory_key, ensure_database_directory};
use ftax::{
    CategorizationService, CategorizationSession, Database, Settings, TaxonomyError, TaxonomyId,
};
use tracing_subscriber::EnvFilter;

/// ftax - sort files into a self-consolidating category taxonomy
#[derive(Parser)]
#[command(name = "ftax")]
#[command(about = "Categorize files with an LLM and keep the categories consistent")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Categorize the contents of a directory
    Categorize(CategorizeCommand),
    /// Show stored categorizations for a directory
    List(ListCommand),
    /// Resolve a category pair by hand
    Resolve(ResolveCommand),
    /// Re-confirm an existing taxonomy entry
    Confirm(ConfirmCommand),
    /// List the canonical taxonomy
    Taxonomy(TaxonomyCommand),
    /// Move categorized items into category folders
    Sort(SortCommand),
    /// Check database and Ollama health
    Doctor,
}

#[derive(Parser)]
struct CategorizeCommand {
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// Also categorize subdirectories
    #[arg(long)]
    directories: bool,

    /// Skip regular files
    #[arg(long)]
    no_files: bool,

    /// Include dot-files
    #[arg(long)]
    hidden: bool,

    /// Use the offline extension rules instead of Ollama
    #[arg(long)]
    rules: bool,

    /// Forget recorded items that are no longer in DIR
    #[arg(long)]
    prune: bool,

    /// Ollama model to use (overrides OLLAMA_MODEL)
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,

    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ListCommand {
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ResolveCommand {
    #[arg(value_name = "CATEGORY")]
    category: String,

    #[arg(value_name = "SUBCATEGORY")]
    subcategory: String,

    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ConfirmCommand {
    #[arg(value_name = "TAXONOMY_ID")]
    taxonomy_id: i64,
}

#[derive(Parser)]
struct TaxonomyCommand {
    /// Also list alias spellings
    #[arg(long)]
    aliases: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct SortCommand {
    #[arg(value_name = "DIR")]
    dir: PathBuf,

    /// Print the planned moves without touching the filesystem
    #[arg(long)]
    dry_run: bool,
}

/// Marks an error as caused by the user's input.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct UserError(String);

fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ftax=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = Settings::from_env().and_then(|settings| run(&cli.command, &settings));

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

fn run(command: &Commands, settings: &Settings) -> Result<()> {
    let mut service = open_service(settings)?;
    match command {
        Commands::Categorize(cmd) => handle_categorize(cmd, settings, &mut service),
        Commands::List(cmd) => handle_list(cmd, &service),
        Commands::Resolve(cmd) => handle_resolve(cmd, &mut service),
        Commands::Confirm(cmd) => handle_confirm(cmd, &mut service),
        Commands::Taxonomy(cmd) => handle_taxonomy(cmd, &service),
        Commands::Sort(cmd) => handle_sort(cmd, &mut service),
        Commands::Doctor => handle_doctor(settings, &service),
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are bad labels, unknown ids and missing directories.
/// Everything else (database, network, I/O) is internal.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause.downcast_ref::<UserError>().is_some()
            || cause
                .downcast_ref::<TaxonomyError>()
                .is_some_and(TaxonomyError::is_user_error)
    })
}

fn open_service(settings: &Settings) -> Result<CategorizationService> {
    ensure_database_directory(&settings.db_path)?;
    let db = Database::open(&settings.db_path).context("Failed to open database")?;
    CategorizationService::with_config(db, settings.resolver).context("Failed to load taxonomy")
}

fn require_directory(dir: &Path) -> Result<String> {
    if !dir.is_dir() {
        return Err(UserError(format!("Not a directory: {}", dir.display())).into());
    }
    directory_key(dir)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_categorize(
    cmd: &CategorizeCommand,
    settings: &Settings,
    service: &mut CategorizationService,
) -> Result<()> {
    require_directory(&cmd.dir)?;

    let client: Box<dyn CategorizationClient> = if cmd.rules {
        Box::new(RuleBasedClient::new())
    } else {
        let model = cmd.model.clone().unwrap_or_else(|| settings.ollama_model.clone());
        Box::new(
            OllamaClientBuilder::new()
                .base_url(&settings.ollama_host)
                .model(model)
                .build()
                .context("Failed to create Ollama client")?,
        )
    };

    let options = ScanOptions {
        files: !cmd.no_files,
        directories: cmd.directories,
        hidden: cmd.hidden,
    };
    let mut session = CategorizationSession::new(client)
        .with_options(options)
        .prune_stale(cmd.prune)
        .on_progress(|index, total, name| {
            tracing::debug!("[{}/{}] {}", index + 1, total, name);
        });

    let report = session.run(service, &cmd.dir)?;

    if cmd.json {
        return print_json(&report);
    }

    for file in report.all_files() {
        println!("{}\t{} : {}", file.file_name, file.category, file.subcategory);
    }
    for failed in &report.failed {
        eprintln!("failed\t{}\t{}", failed.file_name, failed.reason);
    }
    let stale_label = if report.stale_pruned { "pruned" } else { "stale" };
    for name in &report.stale {
        eprintln!("{}\t{}", stale_label, name);
    }
    println!(
        "{} categorized, {} reused, {} failed{}",
        report.categorized.len(),
        report.reused.len(),
        report.failed.len(),
        if report.cancelled { " (cancelled)" } else { "" }
    );
    Ok(())
}

fn handle_list(cmd: &ListCommand, service: &CategorizationService) -> Result<()> {
    let dir_key = require_directory(&cmd.dir)?;
    let files = service
        .get_categorized_files(&dir_key)
        .context("Failed to list categorizations")?;

    if cmd.json {
        return print_json(&files);
    }
    if files.is_empty() {
        println!("No categorizations recorded for {}", dir_key);
    }
    for file in &files {
        println!(
            "{}\t{}\t{} : {}",
            file.file_name, file.file_type, file.category, file.subcategory
        );
    }
    Ok(())
}

fn handle_resolve(cmd: &ResolveCommand, service: &mut CategorizationService) -> Result<()> {
    let resolution = service.resolve_category_detailed(&cmd.category, &cmd.subcategory)?;

    if cmd.json {
        return print_json(&resolution);
    }
    println!(
        "{} (id: {}, frequency: {})",
        resolution.resolved, resolution.resolved.taxonomy_id, resolution.frequency
    );
    Ok(())
}

fn handle_confirm(cmd: &ConfirmCommand, service: &mut CategorizationService) -> Result<()> {
    let id = TaxonomyId::new(cmd.taxonomy_id);
    let frequency = service.increment_taxonomy_frequency(id)?;
    println!("Confirmed taxonomy entry {} (frequency: {})", id, frequency);
    Ok(())
}

fn handle_taxonomy(cmd: &TaxonomyCommand, service: &CategorizationService) -> Result<()> {
    let store = service.taxonomy();
    let entries = store.entries_by_frequency();

    if cmd.json {
        if cmd.aliases {
            let aliases = store.list_aliases()?;
            return print_json(&serde_json::json!({ "entries": entries, "aliases": aliases }));
        }
        return print_json(&entries);
    }

    for entry in entries {
        println!(
            "{:>4}  {:>6}  {} : {}",
            entry.id(),
            entry.frequency(),
            entry.category(),
            entry.subcategory()
        );
        if cmd.aliases {
            for alias in store.aliases_for(entry.id())? {
                if alias.normalized_category() != entry.normalized_category()
                    || alias.normalized_subcategory() != entry.normalized_subcategory()
                {
                    println!(
                        "              ~ {} : {}",
                        alias.normalized_category(),
                        alias.normalized_subcategory()
                    );
                }
            }
        }
    }
    Ok(())
}

fn handle_sort(cmd: &SortCommand, service: &mut CategorizationService) -> Result<()> {
    let dir_key = require_directory(&cmd.dir)?;
    let report = sort_directory(service, &dir_key, cmd.dry_run)?;

    for planned in &report.moved {
        println!(
            "{}{} -> {}",
            if report.dry_run { "would move " } else { "" },
            planned.source.display(),
            planned.target.display()
        );
    }
    for (planned, reason) in &report.failed {
        eprintln!("failed\t{}\t{}", planned.source.display(), reason);
    }
    Ok(())
}

fn handle_doctor(settings: &Settings, service: &CategorizationService) -> Result<()> {
    let report = doctor::run_health_checks(
        &settings.db_path.display().to_string(),
        service,
        &settings.ollama_host,
    )?;
    if !report.is_healthy() {
        anyhow::bail!("Health check found problems");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_label_is_a_user_error() {
        let error = anyhow::Error::from(TaxonomyError::InvalidLabel {
            field: "category",
            raw: String::new(),
        })
        .context("Failed to resolve");
        assert!(is_user_error(&error));
    }

    #[test]
    fn missing_directory_is_a_user_error() {
        let error = require_directory(Path::new("/definitely/not/here")).unwrap_err();
        assert!(is_user_error(&error));
    }

    #[test]
    fn persistence_failure_is_internal() {
        let error = anyhow::Error::from(TaxonomyError::Persistence(
            rusqlite::Error::QueryReturnedNoRows,
        ));
        assert!(!is_user_error(&error));
        assert!(!is_user_error(&anyhow::anyhow!("disk on fire")));
    }

    #[test]
    fn cli_parses_categorize_flags() {
        let cli = Cli::try_parse_from([
            "ftax",
            "categorize",
            "/tmp",
            "--directories",
            "--no-files",
            "--rules",
            "--json",
        ])
        .unwrap();

        let Commands::Categorize(cmd) = cli.command else {
            panic!("expected categorize");
        };
        assert!(cmd.directories && cmd.no_files && cmd.rules && cmd.json);
        assert!(!cmd.hidden && !cmd.prune);
        assert_eq!(cmd.model, None);
    }

    #[test]
    fn categorize_accepts_prune() {
        let cli = Cli::try_parse_from(["ftax", "categorize", "/tmp", "--prune"]).unwrap();

        let Commands::Categorize(cmd) = cli.command else {
            panic!("expected categorize");
        };
        assert!(cmd.prune);
    }
}
