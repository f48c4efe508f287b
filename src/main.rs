//! `deltapack` command line front end.
//!
//! ```bash
//! deltapack init-config            # write a default config.toml
//! deltapack scan                   # show what changed since the last package
//! deltapack package -d "hotfix"    # build the next incremental package
//! deltapack package --full         # build a full package (next major version)
//! deltapack history
//! deltapack show Mir200/Envir/map.txt
//! ```

use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use deltapack::archive;
use deltapack::cancel::CancelToken;
use deltapack::config::{self, PackerConfig};
use deltapack::logging;
use deltapack::packer::{PackageKind, PackageOutcome, Packer, ScanReport};
use deltapack::snapshot::ChangeKind;

#[derive(Parser)]
#[command(
    name = "deltapack",
    version,
    about = "Incremental, versioned zip packages of a directory tree"
)]
struct Cli {
    /// Config file (TOML). Defaults to `config.toml` in the application directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the source tree and list changes since the last package.
    Scan,
    /// Scan, then build, cache and commit the next package.
    Package {
        /// Package every file and bump the major version.
        #[arg(long)]
        full: bool,
        /// Free-form note stored with the version.
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// List committed versions, newest first.
    History,
    /// Summarize the entries of a package archive.
    Inspect { archive: PathBuf },
    /// Print the cached content of a file as of its last package.
    Show { path: String },
    /// Summarize the content cache.
    CacheInfo,
    /// Forget all versions and cached content. Archives are kept.
    Reset {
        /// Confirm the reset.
        #[arg(long)]
        yes: bool,
    },
    /// Write a config file with default settings.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let directive = if cli.verbose { "debug" } else { "info" };
    if let Err(err) = logging::init(directive) {
        logging::init_stderr_only(directive);
        tracing::warn!(error = %err, "File logging disabled");
    }

    let config_path = cli.config;
    let open = || -> Result<Packer, Box<dyn Error>> {
        let config = match &config_path {
            Some(path) => config::load_from(path)?,
            None => config::load_or_default()?,
        };
        Ok(Packer::open(config)?)
    };
    let cancel = CancelToken::new();

    match cli.command {
        Command::Scan => {
            let packer = open()?;
            let report = packer.scan(&cancel, &mut progress("Scanning"));
            print_changes(&report);
            println!(
                "Next versions: {} (incremental), {} (full)",
                packer.next_tag(PackageKind::Incremental),
                packer.next_tag(PackageKind::Full)
            );
        }
        Command::Package { full, description } => {
            let kind = if full {
                PackageKind::Full
            } else {
                PackageKind::Incremental
            };
            package(&mut open()?, kind, &description, &cancel)?;
        }
        Command::History => print_history(&open()?),
        Command::Inspect { archive } => inspect(&archive)?,
        Command::Show { path } => {
            let mut packer = open()?;
            if let Some(text) = packer.cached_text(&path) {
                print!("{text}");
            } else if let Some(bytes) = packer.cached_content(&path) {
                println!("{path}: binary content, {} bytes", bytes.len());
            } else {
                return Err(format!("No cached content for {path}").into());
            }
        }
        Command::CacheInfo => {
            let info = open()?.cache_info();
            println!("Cache directory: {}", info.cache_dir.display());
            println!("Files: {}", info.total_files);
            println!("Size: {} bytes", info.total_size);
            println!(
                "Last update: {}",
                info.last_update.as_deref().unwrap_or("never")
            );
        }
        Command::Reset { yes } => {
            if !yes {
                return Err("Refusing to reset without --yes".into());
            }
            open()?.reset()?;
            println!("Version history and content cache cleared");
        }
        Command::InitConfig { force } => init_config(config_path.clone(), force)?,
    }
    Ok(())
}

fn package(
    packer: &mut Packer,
    kind: PackageKind,
    description: &str,
    cancel: &CancelToken,
) -> Result<(), Box<dyn Error>> {
    let report = packer.scan(cancel, &mut progress("Scanning"));
    print_changes(&report);
    let outcome = packer.package(
        &report,
        kind,
        description,
        cancel,
        &mut progress("Packaging"),
    )?;
    let PackageOutcome::Completed {
        entry,
        archive_path,
        archive,
        skipped,
        cached,
        cache_failures,
    } = outcome
    else {
        println!("Packaging canceled");
        return Ok(());
    };
    println!(
        "Created {} ({} files, {} -> {} bytes, {:.1}% saved)",
        archive_path.display(),
        archive.file_count,
        archive.total_size,
        archive.compressed_size,
        archive.compression_ratio()
    );
    println!(
        "Committed {} with {} tracked files",
        entry.tag, entry.file_count
    );
    println!("Cached {cached} files ({cache_failures} failures)");
    for path in skipped {
        println!("  skipped {path}");
    }
    Ok(())
}

fn print_history(packer: &Packer) {
    let history = packer.history();
    if history.is_empty() {
        println!("No versions committed yet");
    }
    for entry in history {
        println!(
            "{:<10} {}  {:>6} files  {:>12} bytes  {:<11}  {}",
            entry.tag.to_string(),
            entry.timestamp,
            entry.file_count,
            entry.total_size,
            if entry.is_full { "full" } else { "incremental" },
            entry.description
        );
    }
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<(), Box<dyn Error>> {
    let path = match path {
        Some(path) => path,
        None => config::config_path()?,
    };
    if path.exists() && !force {
        let message = format!("{} already exists; pass --force to overwrite", path.display());
        return Err(message.into());
    }
    config::save_to_path(&PackerConfig::default(), &path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn inspect(path: &Path) -> Result<(), Box<dyn Error>> {
    let summary = archive::inspect(path)?;
    for entry in &summary.entries {
        println!(
            "{:>12} {:>12}  {}",
            entry.size, entry.compressed_size, entry.name
        );
    }
    println!(
        "{} files, {} -> {} bytes, {:.1}% saved",
        summary.file_count,
        summary.total_size,
        summary.compressed_size,
        summary.compression_ratio()
    );
    Ok(())
}

fn print_changes(report: &ScanReport) {
    for change in &report.changes {
        let marker = match change.kind() {
            ChangeKind::Added => 'A',
            ChangeKind::Modified => 'M',
            ChangeKind::Deleted => 'D',
        };
        println!("{marker} {}", change.relative_path());
    }
    let summary = report.summary();
    println!(
        "{} files scanned: {} added, {} modified, {} deleted",
        report.snapshot().len(),
        summary.added,
        summary.modified,
        summary.deleted
    );
    if report.outcome.stats.skipped > 0 {
        println!("{} unreadable files skipped", report.outcome.stats.skipped);
    }
}

fn progress(label: &'static str) -> impl FnMut(usize, usize) {
    move |done, total| {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{label} {done}/{total}");
        if done == total {
            let _ = writeln!(stderr);
        }
    }
}
