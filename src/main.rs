use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use git_backfill::ai::AiClient;
use git_backfill::git::{
    collect_changes, filter_by_path, get_recent_commits, print_changes, print_commit_summary,
    strip_quotes,
};
use git_backfill::{backfill_dates, AiOverrides, ChangeSet, Committer, Config, GitRepo};

#[derive(Parser)]
#[command(name = "git-backfill")]
#[command(about = "Commit pending changes one file at a time, with dates spread since the last commit")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Git repository directory
    #[arg(long, global = true, default_value = ".")]
    repo_dir: PathBuf,

    /// Path to config file (default: <repo>/backfill.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Commit every pending change (default)
    Commit {
        /// Only list the pending changes
        #[arg(long)]
        ls: bool,

        #[command(flatten)]
        ai: AiArgs,
    },

    /// List pending changes, numbered
    Ls,

    /// Commit only the changes at or under a file or directory
    Only {
        /// Target file or directory, relative or absolute
        target: String,

        #[command(flatten)]
        ai: AiArgs,
    },
}

#[derive(Args, Default)]
struct AiArgs {
    /// Generate commit messages with an AI model
    #[arg(long)]
    ai: bool,

    /// AI provider: openai (any compatible endpoint) or anthropic
    #[arg(long)]
    provider: Option<String>,

    /// API key
    #[arg(long)]
    api_key: Option<String>,

    /// API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Model name
    #[arg(long)]
    model: Option<String>,
}

impl From<AiArgs> for AiOverrides {
    fn from(args: AiArgs) -> Self {
        Self {
            enabled: args.ai,
            provider: args.provider,
            api_key: args.api_key,
            base_url: args.base_url,
            model: args.model,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let repo_dir = std::fs::canonicalize(&cli.repo_dir).unwrap_or_else(|_| cli.repo_dir.clone());
    info!("repo_dir: {}", repo_dir.display());
    let repo = GitRepo::open(&repo_dir)?;

    let command = cli.command.unwrap_or(Commands::Commit {
        ls: false,
        ai: AiArgs::default(),
    });

    match command {
        Commands::Ls => cmd_ls(&repo),
        Commands::Commit { ls: true, .. } => cmd_ls(&repo),
        Commands::Commit { ls: false, ai } => cmd_commit(&repo, cli.config.as_deref(), ai.into()),
        Commands::Only { target, ai } => {
            cmd_only(&repo, cli.config.as_deref(), &target, ai.into())
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn cmd_ls(repo: &GitRepo) -> Result<()> {
    let changes = collect_changes(repo)?;
    print_changes(&changes);
    Ok(())
}

fn cmd_commit(repo: &GitRepo, config_path: Option<&Path>, overrides: AiOverrides) -> Result<()> {
    let changes = collect_changes(repo)?;
    print_changes(&changes);

    if changes.is_empty() {
        return Ok(());
    }

    commit_changes(repo, config_path, overrides, &changes)?;
    info!("Everything done!");
    Ok(())
}

fn cmd_only(
    repo: &GitRepo,
    config_path: Option<&Path>,
    target: &str,
    overrides: AiOverrides,
) -> Result<()> {
    let changes = collect_changes(repo)?;
    let changes = filter_by_path(&repo.workdir()?, strip_quotes(target), &changes);

    if changes.is_empty() {
        println!("{}", "No pending changes under the target path.".bright_black());
        return Ok(());
    }

    print_changes(&changes);
    commit_changes(repo, config_path, overrides, &changes)?;
    info!("Selected changes committed.");
    Ok(())
}

#[tokio::main]
async fn commit_changes(
    repo: &GitRepo,
    config_path: Option<&Path>,
    overrides: AiOverrides,
    changes: &ChangeSet,
) -> Result<()> {
    let mut config = Config::resolve(config_path, &repo.workdir()?)?;
    config.apply(overrides);

    let client = if config.ai.enabled {
        let client = AiClient::new(&config.ai)?;
        info!("generating commit messages with {}", client.model());
        Some(client)
    } else {
        None
    };

    let dates = backfill_dates(repo, changes.total())?;
    let report = Committer::new(repo, client.as_ref())
        .commit_all(changes, dates)
        .await?;

    if !report.skipped.is_empty() {
        println!(
            "\n{} skipped {} nested repositor{}",
            "⚠".yellow(),
            report.skipped.len(),
            if report.skipped.len() == 1 { "y" } else { "ies" }
        );
    }

    let created = get_recent_commits(repo, report.committed.len())?;
    print_commit_summary(&created);

    Ok(())
}
