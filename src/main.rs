use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

use flea::config;
use flea::repo;
use flea::ui;

/// A minimal, git-like version control system.
#[derive(Debug, Parser)]
struct Cli {
    /// Verbosity (-v, -vv, -vvv, ...)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Run as if started in this directory instead of the current one
    #[clap(short = 'C', long)]
    directory: Option<Utf8PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an empty repository
    Init,
    /// Stage a file or directory
    Add(ui::add::Args),
    /// Unstage (and optionally delete) a path
    Rm(ui::rm::Args),
    /// Show staged, unstaged, and untracked changes
    Status(ui::status::Args),
    /// Record staged changes as a new commit
    Commit(ui::commit::Args),
    /// Walk the current commit's history
    Log(ui::log::Args),
    /// Print the current branch
    Branch(ui::branch::Args),
    /// Switch to a branch or commit
    Checkout(ui::checkout::Args),
    /// List files tracked in the current commit
    LsFiles(ui::ls_files::Args),
    /// Print an object's type or payload
    CatFile(ui::cat::Args),
    /// Store stdin as a blob, printing its digest
    HashObject(ui::hash_object::Args),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cwd: Utf8PathBuf = match &cli.directory {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?
            .try_into()
            .map_err(|_| anyhow::anyhow!("Current directory isn't valid UTF-8"))?,
    };
    let cfg = config::load()?;

    if let Command::Init = cli.command {
        return ui::init::run(&cwd, &cfg.meta_dir);
    }

    let repository = repo::discover(&cwd, &cfg.meta_dir)?;

    match cli.command {
        Command::Init => unreachable!("handled above"),
        Command::Add(args) => ui::add::run(&repository, &cwd, args),
        Command::Rm(args) => ui::rm::run(&repository, &cwd, args),
        Command::Status(args) => ui::status::run(&repository, args),
        Command::Commit(args) => ui::commit::run(&repository, cfg.author, args),
        Command::Log(args) => ui::log::run(&repository, args),
        Command::Branch(args) => ui::branch::run(&repository, args),
        Command::Checkout(args) => ui::checkout::run(&repository, args),
        Command::LsFiles(args) => ui::ls_files::run(&repository, &cwd, args),
        Command::CatFile(args) => ui::cat::run(&repository, args),
        Command::HashObject(args) => ui::hash_object::run(&repository, args),
    }
}

/// Mirrors the teacher's verbosity-count convention, swapped onto
/// `tracing-subscriber`'s env-filter-free builder.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
