//! Stagehand: multi-repository release manager.
//!
//! # Usage
//!
//! ```text
//! stagehand [-t <target>] [-n] [-c] [-y] [--config <file>] <command>
//!
//! stagehand build [<branch>...]
//! stagehand deploy [<branch>...]
//! stagehand link <release>
//! stagehand update
//! stagehand rollback
//! stagehand rebuild
//! stagehand list [--json]
//! stagehand prune [<count>|all]
//! stagehand configure [--force]
//! ```

mod commands;
mod prompt;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use commands::{
    build::BuildArgs, configure::ConfigureArgs, deploy::DeployArgs, link::LinkArgs,
    list::ListArgs, prune::PruneArgs, Session,
};
use stagehand_release::InterruptGuard;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "stagehand",
    version,
    about = "Build, switch and roll back timestamped releases of a set of git repositories",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Options accepted before or after any subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Target environment (defaults to `default_target` from the config).
    #[arg(short = 't', long, global = true)]
    pub target: Option<String>,

    /// Do not run deploy hooks.
    #[arg(short = 'n', long = "no-hooks", global = true)]
    pub no_hooks: bool,

    /// Do not copy `copy_dirs` forward from the live release.
    #[arg(short = 'c', long = "no-copy", global = true)]
    pub no_copy: bool,

    /// Answer yes to every confirmation prompt.
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Configuration file (defaults to ~/.stagehand.yaml).
    #[arg(long, env = "STAGEHAND_CONFIG", global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a new release without making it live.
    Build(BuildArgs),

    /// Build a new release, then swap it live after confirmation.
    Deploy(DeployArgs),

    /// Make an existing release live.
    Link(LinkArgs),

    /// Pull and rebuild the current release in place.
    Update,

    /// Switch every repository back to its previous release.
    Rollback,

    /// Re-run the build script in the current release.
    Rebuild,

    /// List releases of the target.
    List(ListArgs),

    /// Delete old releases, keeping the newest N (default 10) or none ("all").
    Prune(PruneArgs),

    /// Write an example configuration file.
    Configure(ConfigureArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let guard = Arc::new(InterruptGuard::exit_process());
    spawn_signal_listener(Arc::clone(&guard));

    let session = Session::new(cli.global, guard);
    match cli.command {
        Commands::Build(args) => args.run(&session),
        Commands::Deploy(args) => args.run(&session),
        Commands::Link(args) => args.run(&session),
        Commands::Update => commands::update::run(&session),
        Commands::Rollback => commands::rollback::run(&session),
        Commands::Rebuild => commands::rebuild::run(&session),
        Commands::List(args) => args.run(&session),
        Commands::Prune(args) => args.run(&session),
        Commands::Configure(args) => args.run(&session),
    }
}

/// Logs go to stderr so `list --json` output stays machine-readable.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Forward SIGINT (and SIGTERM on unix) to the guard from a dedicated thread.
fn spawn_signal_listener(guard: Arc<InterruptGuard>) {
    let spawned = std::thread::Builder::new()
        .name("stagehand-signals".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    tracing::warn!("signal handling unavailable: {err}");
                    return;
                }
            };
            runtime.block_on(listen(guard));
        });
    if let Err(err) = spawned {
        tracing::warn!("signal handling unavailable: {err}");
    }
}

#[cfg(unix)]
async fn listen(guard: Arc<InterruptGuard>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(err) => {
            tracing::warn!("cannot listen for SIGTERM: {err}");
            None
        }
    };
    loop {
        let received = tokio::select! {
            signal = tokio::signal::ctrl_c() => signal.is_ok(),
            Some(()) = async {
                match terminate.as_mut() {
                    Some(stream) => stream.recv().await,
                    None => std::future::pending().await,
                }
            } => true,
        };
        if !received {
            tracing::warn!("ctrl-c handler failed; interrupts are no longer deferred");
            return;
        }
        guard.request_termination();
    }
}

#[cfg(not(unix))]
async fn listen(guard: Arc<InterruptGuard>) {
    while tokio::signal::ctrl_c().await.is_ok() {
        guard.request_termination();
    }
}
