use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skbridge_core::BlueprintInterface;
use skbridge_reflect::Universe;
use tracing::{error, info};

mod logging;
mod manifest;
mod reload;
mod report;

use manifest::ProjectManifest;
use report::{registry_table, ExposeReport};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Also write logs to the data directory
    #[arg(long)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Expose a project's script routines and print the resulting bindings
    Inspect {
        /// Project manifest (TOML)
        manifest: PathBuf,

        /// Seal generated functions
        #[arg(long)]
        is_final: bool,
    },
    /// Expose a project, then reload its script side on SIGUSR2
    Watch {
        /// Project manifest (TOML)
        manifest: PathBuf,

        /// Milliseconds between script runtime updates
        #[arg(long, default_value_t = 100)]
        tick_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = logging::init_logging(cli.log_file).context("Failed to initialize logging")?;

    match cli.command {
        Command::Inspect { manifest, is_final } => inspect(&manifest, is_final),
        Command::Watch { manifest, tick_ms } => watch(&manifest, tick_ms).await,
    }
}

/// Build the host side and an initialized interface from a manifest
fn open_project(path: &Path) -> Result<(Universe, BlueprintInterface, bool)> {
    let manifest = ProjectManifest::load(path)?;
    let universe = manifest.build_universe()?;
    let runtime = manifest.build_runtime()?;
    let is_final = manifest.bridge.is_final;

    let interface = BlueprintInterface::initialize(&universe, Box::new(runtime), manifest.bridge)
        .context("Failed to initialize blueprint interface")?;
    Ok((universe, interface, is_final))
}

fn inspect(path: &Path, is_final: bool) -> Result<()> {
    let (_universe, mut interface, _) = open_project(path)?;

    let mut report = ExposeReport::default();
    interface.reexpose_all(is_final, &mut report);

    print!("{}", registry_table(&interface));
    print!("{}", report);
    interface.shutdown();
    Ok(())
}

async fn watch(path: &Path, tick_ms: u64) -> Result<()> {
    let (universe, mut interface, is_final) = open_project(path)?;

    let mut report = ExposeReport::default();
    interface.reexpose_all(is_final, &mut report);
    print!("{}", report);

    let mut reload_rx = reload::setup_reload_signal();
    let mut ticker = tokio::time::interval(tokio::time::Duration::from_millis(tick_ms.max(1)));
    info!(target: "cli", "Watching {} (send SIGUSR2 to reload, Ctrl+C to exit)", path.display());

    loop {
        tokio::select! {
            changed = reload_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if reload_rx.borrow_and_update().is_none() {
                    continue;
                }
                match reload::reload_project(path, &universe, &mut interface, is_final) {
                    Ok(report) => print!("{}", report),
                    Err(e) => error!(target: "cli", "Reload failed, keeping previous bindings: {:#}", e),
                }
            }
            _ = ticker.tick() => {
                interface.update(&universe);
                for finished in interface.poll_coroutines() {
                    match finished.outcome {
                        Ok(value) => info!(target: "cli", "Coroutine {} finished: {:?}", finished.routine_name, value),
                        Err(e) => error!(target: "cli", "Coroutine {} failed: {}", finished.routine_name, e),
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!(target: "cli", "Interrupted, shutting down");
                break;
            }
        }
    }

    interface.shutdown();
    Ok(())
}
