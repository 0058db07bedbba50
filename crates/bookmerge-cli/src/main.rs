use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use bookmerge_core::{import_path, AppConfig, Catalog, ImportOutcome};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "bookmerge",
    about = "Publisher XML importer with identifier reconciliation",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Catalog database path. Defaults to the configured location.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output in JSON format (for scripts).
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import publisher XML files, strictly one at a time, in order.
    Import { files: Vec<PathBuf> },

    /// List catalog books with their aliases and recorded conflicts.
    List,

    /// List every recorded alias conflict.
    Conflicts,

    /// Drop and recreate the catalog schema.
    Reset {
        /// Required confirmation; without it the command refuses to run.
        #[arg(long)]
        force: bool,
    },

    /// Config management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the active configuration.
    Show,

    /// Write a default config file if none exists yet.
    Init,
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Config management never touches the catalog database.
    if let Commands::Config { action } = &cli.command {
        return cmd_config(action, cli.json);
    }

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => PathBuf::from(AppConfig::load(&AppConfig::default_path())?.database_path),
    };
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut catalog = Catalog::open(&db_path)?;

    match cli.command {
        Commands::Import { files } => cmd_import(&mut catalog, &files, cli.json),
        Commands::List => cmd_list(&catalog, cli.json),
        Commands::Conflicts => cmd_conflicts(&catalog, cli.json),
        Commands::Reset { force } => cmd_reset(&catalog, force),
        Commands::Config { .. } => unreachable!("handled before opening the catalog"),
    }
}

// ─── Commands ───────────────────────────────────────────────────────────────

fn cmd_import(catalog: &mut Catalog, files: &[PathBuf], json: bool) -> Result<()> {
    if files.is_empty() {
        bail!("no files given");
    }

    let mut created = 0usize;
    let mut updated = 0usize;
    let mut already = 0usize;
    let mut skipped = 0usize;
    let mut reports = Vec::new();

    if !json {
        println!("Processing {} file(s)\n", files.len());
    }

    for file in files {
        let name = file.display();
        match import_path(catalog, file) {
            Ok(ImportOutcome::Applied {
                book,
                change,
                new_conflicts,
            }) => {
                match change {
                    bookmerge_core::ChangeKind::Created => created += 1,
                    bookmerge_core::ChangeKind::Updated => updated += 1,
                }
                if !json {
                    println!("... \"{}\" {change}", book.title);
                    if new_conflicts > 0 {
                        println!("!!! with {new_conflicts} new conflict(s)");
                    }
                }
                reports.push(json!({
                    "file": name.to_string(),
                    "outcome": change.to_string(),
                    "book_id": book.id,
                    "title": book.title,
                    "new_conflicts": new_conflicts,
                }));
            }
            Ok(ImportOutcome::AlreadyImported {
                filename,
                imported_at,
            }) => {
                already += 1;
                if !json {
                    println!(
                        "... {name} skipped: already imported as \"{filename}\" on {}",
                        imported_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
                reports.push(json!({
                    "file": name.to_string(),
                    "outcome": "already-imported",
                    "prior_filename": filename,
                    "prior_timestamp": imported_at.to_rfc3339(),
                }));
            }
            // One bad file never aborts the batch.
            Err(e) if e.is_input_error() => {
                skipped += 1;
                if !json {
                    eprintln!("!!! {name} skipped: {e}");
                }
                reports.push(json!({
                    "file": name.to_string(),
                    "outcome": "skipped",
                    "detail": e.to_string(),
                }));
            }
            Err(e) => return Err(e.into()),
        }
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "files": reports,
                "created": created,
                "updated": updated,
                "already_imported": already,
                "skipped": skipped,
            }))?
        );
    } else {
        println!(
            "\n{created} created, {updated} updated, {already} already imported, {skipped} skipped"
        );
    }
    Ok(())
}

fn cmd_list(catalog: &Catalog, json: bool) -> Result<()> {
    let books = catalog.list_books()?;

    if json {
        let mut out = Vec::new();
        for book in &books {
            let aliases = catalog.aliases_for_book(book.id)?;
            let conflicts = catalog.conflicts_for_book(book.id)?;
            out.push(json!({
                "id": book.id,
                "title": book.title,
                "description": book.description,
                "aliases": aliases,
                "conflict_count": conflicts.len(),
            }));
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let details = catalog.list_conflict_details()?;
    for book in &books {
        println!("[{}] {}", book.id, book.title);
        if let Some(description) = &book.description {
            println!("    {description}");
        }

        let mut aliases = catalog.aliases_for_book(book.id)?;
        aliases.sort_by(|a, b| a.scheme.cmp(&b.scheme));
        for alias in &aliases {
            println!(
                "    {: <9}: {}",
                alias.scheme.as_deref().unwrap_or("-"),
                alias.value.as_deref().unwrap_or("-")
            );
        }
        for detail in details.iter().filter(|d| d.book_id == book.id) {
            println!(
                "    CONFLICT with \"{}\": {}/{}",
                detail.other_title,
                detail.scheme.as_deref().unwrap_or("-"),
                detail.value.as_deref().unwrap_or("-")
            );
        }
    }
    println!("\n{} book(s)", books.len());
    Ok(())
}

fn cmd_conflicts(catalog: &Catalog, json: bool) -> Result<()> {
    let details = catalog.list_conflict_details()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }

    for detail in &details {
        println!(
            "\"{}\" vs \"{}\": {}/{}",
            detail.book_title,
            detail.other_title,
            detail.scheme.as_deref().unwrap_or("-"),
            detail.value.as_deref().unwrap_or("-")
        );
    }
    println!("\n{} conflict(s)", details.len());
    Ok(())
}

fn cmd_config(action: &ConfigAction, json: bool) -> Result<()> {
    let path = AppConfig::default_path();
    match action {
        ConfigAction::Show => {
            let config = AppConfig::load(&path)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "path": path.display().to_string(),
                        "database_path": config.database_path,
                    }))?
                );
            } else {
                println!("# {}", path.display());
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
        ConfigAction::Init => {
            if path.exists() {
                bail!("config already exists at {}", path.display());
            }
            AppConfig::default().save(&path)?;
            println!("Wrote default config to {}", path.display());
        }
    }
    Ok(())
}

fn cmd_reset(catalog: &Catalog, force: bool) -> Result<()> {
    if !force {
        bail!("refusing to reset the catalog without --force");
    }
    catalog.reset_schema()?;
    println!("Catalog schema reset.");
    Ok(())
}
