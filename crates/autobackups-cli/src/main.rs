//! AutoBackups CLI - Command-line host for AutoBackups
//!
//! Plays the editor's role from a terminal: `autobackups save`, `list`,
//! `browse`, `gc` and friends drive the same core the editor plugin uses.

mod logging;
mod terminal;

use anyhow::{anyhow, bail, Context, Result};
use autobackups_core::backup::{BackupEvent, BackupWriter, Document, SessionKey};
use autobackups_core::config::{BackupConfig, Platform, Settings};
use autobackups_core::host::SystemOpener;
use autobackups_core::locate::{BackupLocator, ListEntry};
use autobackups_core::plugin::{AutoBackups, DONATE_URL};
use autobackups_core::retention::sweep;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use terminal::TerminalUi;

#[derive(Parser)]
#[command(name = "autobackups")]
#[command(about = "AutoBackups - automatic backups of edited files")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to ~/.autobackups/AutoBackups (<Platform>).sublime-settings)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backup root, overriding the settings file
    #[arg(short, long, global = true, value_name = "DIR")]
    backup_dir: Option<String>,

    /// Log debug output on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up a file as if it had just been saved
    Save {
        file: PathBuf,
    },
    /// Back up a file as if it had just been opened
    Open {
        file: PathBuf,
    },
    /// List the backups of a file, newest first
    List {
        file: PathBuf,
        /// Backups of a single day (YYYY-MM-DD)
        #[arg(short, long)]
        day: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the newest backup of a file
    Latest {
        file: PathBuf,
    },
    /// Pick a backup of a file interactively and print its path
    Browse {
        file: PathBuf,
        /// Line the cursor is on
        #[arg(short, long, default_value_t = 1)]
        line: usize,
    },
    /// Print the backup root
    Folder {
        /// Open it in the file browser instead
        #[arg(long)]
        open: bool,
    },
    /// Delete day folders past retention now
    Gc {
        /// Retention in days (defaults to delete_old_backups)
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Support the project
    Donate {
        /// Print the page instead of opening it
        #[arg(long)]
        print: bool,
    },
    /// Print the effective configuration as JSON
    Config,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let (config, settings_path) = load_config(cli.config.as_deref(), cli.backup_dir.as_deref())?;

    match cli.command {
        Commands::Save { file } => run_event(&config, &file, BackupEvent::Save),
        Commands::Open { file } => {
            if !config.backup_on_open {
                println!("Skipped: backups on open are disabled");
                return Ok(());
            }
            run_event(&config, &file, BackupEvent::Open)
        }
        Commands::List { file, day, json } => run_list(&config, &file, day.as_deref(), json),
        Commands::Latest { file } => {
            let source = source_path(&file)?;
            let latest = BackupLocator::new(&config)
                .latest(&source, Local::now().naive_local())
                .ok_or_else(|| anyhow!("Backups for this file not exists!"))?;
            println!("{}", latest.display());
            Ok(())
        }
        Commands::Browse { file, line } => {
            let source = source_path(&file)?;
            let doc = Document::new(SessionKey(0), &source, Vec::new()).at_line(line);
            let stdin = io::stdin();
            let mut ui = TerminalUi::new(stdin.lock(), io::stdout());
            AutoBackups::new(config).open_backup(&doc, &mut ui);
            Ok(())
        }
        Commands::Folder { open } => {
            if open {
                let mut ui = TerminalUi::new(io::empty(), io::stdout()).launching_folders();
                AutoBackups::new(config).open_backups_folder(&mut ui);
            } else {
                println!("{}", config.backup_root.display());
            }
            Ok(())
        }
        Commands::Gc { days } => run_gc(&config, days),
        Commands::Donate { print } => {
            if print {
                println!("{DONATE_URL}");
            } else {
                let mut ui = TerminalUi::new(io::empty(), io::stdout());
                let opener = SystemOpener::new(config.platform);
                AutoBackups::new(config).donate(&mut ui, &opener);
            }
            Ok(())
        }
        Commands::Config => print_config(&config, settings_path.as_deref()),
    }
}

/// Default location of the settings file
fn default_settings_path(platform: Platform) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".autobackups").join(platform.settings_file_name()))
}

/// Resolve the configuration; returns the settings file actually read
fn load_config(
    explicit: Option<&Path>,
    backup_dir: Option<&str>,
) -> Result<(BackupConfig, Option<PathBuf>)> {
    let platform = Platform::current();

    let (mut settings, path) = match explicit {
        Some(path) => (Settings::load(path)?, Some(path.to_path_buf())),
        None => match default_settings_path(platform) {
            Some(path) if path.is_file() => (Settings::load(&path)?, Some(path)),
            _ => (Settings::default(), None),
        },
    };
    if let Some(path) = &path {
        debug!("Settings loaded from {}", path.display());
    }

    if let Some(dir) = backup_dir {
        settings.backup_dir = dir.to_string();
    }

    let config = BackupConfig::from_settings(&settings, platform)?;
    Ok((config, path))
}

/// Absolute path of a source file on the command line
fn source_path(file: &Path) -> Result<PathBuf> {
    fs::canonicalize(file).with_context(|| format!("File not found: {}", file.display()))
}

fn run_event(config: &BackupConfig, file: &Path, event: BackupEvent) -> Result<()> {
    let source = source_path(file)?;
    let metadata = fs::metadata(&source)?;
    if !metadata.is_file() {
        bail!("Not a file: {}", source.display());
    }
    let content = fs::read(&source)
        .with_context(|| format!("Failed to read {}", source.display()))?;

    let mut doc = Document::new(SessionKey(0), &source, content);
    doc.read_only = metadata.permissions().readonly();

    let outcome = BackupWriter::new().maybe_backup(config, &doc, event, Local::now().naive_local())?;
    println!("{outcome}");
    Ok(())
}

fn run_list(config: &BackupConfig, file: &Path, day: Option<&str>, json: bool) -> Result<()> {
    let source = source_path(file)?;
    let locator = BackupLocator::new(config);
    let listing = match day {
        Some(day) => locator.list_day(&source, day),
        None => locator.list_backups(&source),
    };

    if let Some(folder) = &listing.missing {
        bail!("Folder {} not found!", folder.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if listing.is_empty() {
        println!("No backups found.");
        return Ok(());
    }
    for entry in &listing.entries {
        match entry {
            ListEntry::Backup(backup) => println!("{}\t{}", backup.label, backup.path.display()),
            ListEntry::Day(summary) => println!("{}\t{}", summary.date, summary.detail()),
        }
    }
    Ok(())
}

fn run_gc(config: &BackupConfig, days: Option<u32>) -> Result<()> {
    let days = days.unwrap_or(config.retention_days);
    if days == 0 {
        println!("Retention is disabled.");
        return Ok(());
    }

    let report = sweep(&config.backup_root, days, Local::now().naive_local());
    for path in &report.deleted {
        println!("Deleted {}", path.display());
    }
    match report.cutoff {
        Some(cutoff) => println!(
            "Deleted {} backup folders older than {}",
            report.deleted_count(),
            cutoff.format("%Y-%m-%d")
        ),
        None => println!("Deleted {} backup folders", report.deleted_count()),
    }
    for error in &report.errors {
        eprintln!("Warning: {error}");
    }
    Ok(())
}

fn print_config(config: &BackupConfig, settings_path: Option<&Path>) -> Result<()> {
    let patterns: Vec<&str> = config.exclude_patterns.iter().map(|re| re.as_str()).collect();
    let value = serde_json::json!({
        "settings_file": settings_path.map(|p| p.display().to_string()),
        "backup_root": config.backup_root.display().to_string(),
        "layout": config.layout,
        "naming_mode": config.naming_mode.to_string(),
        "max_size_bytes": config.max_size_bytes,
        "ignore_regexes": patterns,
        "retention_days": config.retention_days,
        "backup_on_open": config.backup_on_open,
        "open_in_same_line": config.open_in_same_line,
        "show_previews": config.show_previews,
        "default_browser": config.default_browser,
        "platform": config.platform.settings_name(),
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
