mod prompt;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use prompt::TerminalConfirm;
use repoconf_core::CancelToken;
use repoconf_core::adapters::{FsConfigSource, FsLockStore};
use repoconf_core::client::TwirpRepository;
use repoconf_core::pipeline::{ToolError, run_apply, run_plan, run_update};
use repoconf_core::settings::{ApplySettings, CacheSettings, RemoteSettings, UpdateSettings};
use repoconf_render::{render_apply_text, render_changes_text, render_plan_md};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "repoconf",
    version,
    about = "Reconcile declared document repository configuration against a live repository."
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load every schema set afresh and rewrite the lock file.
    Update(UpdateArgs),
    /// Show the changes needed to bring the repository in line with the configuration.
    Plan(PlanArgs),
    /// Show, confirm and apply the changes.
    Apply(ApplyArgs),
}

#[derive(Debug, clap::Args)]
struct DirArgs {
    /// Configuration directory holding `*.toml` files and the lock file.
    #[arg(long, default_value = ".")]
    dir: Utf8PathBuf,

    /// Schema cache directory (default: the per-user cache directory).
    #[arg(long, env = "REPOCONF_CACHE_DIR")]
    cache_dir: Option<Utf8PathBuf>,

    /// Always download schemas.
    #[arg(long, default_value_t = false, conflicts_with = "cache_dir")]
    no_cache: bool,
}

impl DirArgs {
    fn cache(&self) -> CacheSettings {
        if self.no_cache {
            CacheSettings::Disabled
        } else if let Some(dir) = &self.cache_dir {
            CacheSettings::Dir(dir.clone())
        } else {
            CacheSettings::Default
        }
    }
}

#[derive(Debug, clap::Args)]
struct RemoteArgs {
    /// Base URL of the repository service.
    #[arg(long, env = "REPOCONF_ENDPOINT")]
    endpoint: String,

    /// Bearer token sent with every repository call.
    #[arg(long, env = "REPOCONF_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

impl RemoteArgs {
    fn settings(&self) -> RemoteSettings {
        RemoteSettings {
            endpoint: self.endpoint.clone(),
            token: self.token.clone(),
        }
    }
}

#[derive(Debug, Parser)]
struct UpdateArgs {
    #[command(flatten)]
    dir: DirArgs,
}

#[derive(Debug, Parser)]
struct PlanArgs {
    #[command(flatten)]
    dir: DirArgs,

    #[command(flatten)]
    remote: RemoteArgs,

    /// Output format (text, json, markdown).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct ApplyArgs {
    #[command(flatten)]
    dir: DirArgs,

    #[command(flatten)]
    remote: RemoteArgs,

    /// Apply without asking for confirmation.
    #[arg(long, short = 'y', default_value_t = false)]
    yes: bool,

    /// Record every change as skipped without touching the repository.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cancel = CancelToken::new();
    cancel_on_interrupt(&cancel);

    let result = match cli.cmd {
        Command::Update(args) => cmd_update(args, &cancel),
        Command::Plan(args) => cmd_plan(args, &cancel),
        Command::Apply(args) => cmd_apply(args, &cancel),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Ctrl-C cancels the run. Work in flight stops and the current change is not applied.
fn cancel_on_interrupt(cancel: &CancelToken) {
    let cancel = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        warn!("interrupted, cancelling");
        cancel.cancel();
    });
    if let Err(e) = installed {
        warn!(error = %e, "could not install interrupt handler");
    }
}

fn cmd_update(args: UpdateArgs, cancel: &CancelToken) -> Result<(), ToolError> {
    let settings = UpdateSettings {
        config_dir: args.dir.dir.clone(),
        cache: args.dir.cache(),
    };
    let source = FsConfigSource::new(settings.config_dir.clone());
    let locks = FsLockStore::new(&settings.config_dir);

    let outcome = run_update(&settings, &source, &locks, cancel)?;

    for entry in outcome.lock.schemas.values() {
        println!("{} {}", entry.name, entry.version);
    }
    info!(path = %locks.path(), "wrote lock file");
    Ok(())
}

fn cmd_plan(args: PlanArgs, cancel: &CancelToken) -> Result<(), ToolError> {
    let settings = ApplySettings {
        config_dir: args.dir.dir.clone(),
        cache: args.dir.cache(),
        dry_run: true,
    };
    let source = FsConfigSource::new(settings.config_dir.clone());
    let locks = FsLockStore::new(&settings.config_dir);
    let api = connect(&args.remote, cancel)?;

    let outcome = run_plan(&settings, &source, &locks, &api, cancel)?;
    debug!(changes = outcome.changes.len(), "plan ready");

    match args.format {
        OutputFormat::Text => print!("{}", render_changes_text(&outcome.changes)),
        OutputFormat::Markdown => print!("{}", render_plan_md(&outcome.changes)),
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&outcome.changes).context("serialize changes")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn cmd_apply(args: ApplyArgs, cancel: &CancelToken) -> Result<(), ToolError> {
    let settings = ApplySettings {
        config_dir: args.dir.dir.clone(),
        cache: args.dir.cache(),
        dry_run: args.dry_run,
    };
    let source = FsConfigSource::new(settings.config_dir.clone());
    let locks = FsLockStore::new(&settings.config_dir);
    let api = connect(&args.remote, cancel)?;
    let confirm = TerminalConfirm {
        assume_yes: args.yes,
        cancel: cancel.clone(),
    };

    let outcome = run_apply(&settings, &source, &locks, &api, &confirm, cancel)?;

    match &outcome.record {
        None => print!("{}", render_changes_text(&outcome.changes)),
        Some(record) => print!("{}", render_apply_text(record)),
    }
    outcome.check(cancel)
}

fn connect(remote: &RemoteArgs, cancel: &CancelToken) -> Result<TwirpRepository, ToolError> {
    TwirpRepository::from_settings(&remote.settings(), cancel.clone())
        .context("connect to repository")
        .map_err(ToolError::from)
}
