use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use superboids_core::{init_logging, Parameters, Simulation};
use superboids_io::{load_last_state, open_exporters, ExportSelection, RunFiles};
use superboids_lib::{load_parameters, Overrides, Runner};

#[derive(Parser, Debug)]
#[command(author, version, about = "Off-lattice simulation of deformable self-propelled cells", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a simulation
    Run(RunArgs),
    /// Print the default parameter file
    SampleConfig,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Parameter file (TOML); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Last-state file to start from
    #[arg(long)]
    initial_state: Option<PathBuf>,

    #[arg(long)]
    steps: Option<u64>,

    #[arg(long)]
    threads: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Skip the last-state file
    #[arg(long)]
    no_last_state: bool,

    /// Skip the shape statistics
    #[arg(long)]
    no_shape: bool,

    /// Skip the order parameter series
    #[arg(long)]
    no_order: bool,

    /// Write hard-core and invasion force vectors
    #[arg(long)]
    forces: bool,

    /// Write compressed full snapshots
    #[arg(long)]
    trajectory: bool,
}

impl RunArgs {
    fn selection(&self) -> ExportSelection {
        ExportSelection {
            last_state: !self.no_last_state,
            shape: !self.no_shape,
            order: !self.no_order,
            forces: self.forces,
            trajectory: self.trajectory,
        }
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let overrides = Overrides {
        steps: args.steps,
        threads: args.threads,
        seed: args.seed,
    };
    let params = load_parameters(args.config.as_deref(), overrides)?;
    let types = params.cells.types;

    let sim = match &args.initial_state {
        Some(path) => {
            let state = load_last_state(path)
                .with_context(|| format!("loading initial state {}", path.display()))?;
            Simulation::with_initial_state(params, &state)?
        }
        None => Simulation::new(params)?,
    };

    let files = RunFiles::create(&args.output)?;
    let exporters = open_exporters(&files, args.selection(), types)?;
    let mut runner = Runner::new(sim, exporters);

    let stop = runner.stop_handle();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Ctrl+C received, finishing the current tick...");
        stop.store(true, Ordering::SeqCst);
    });
    let summary = tokio::task::spawn_blocking(move || runner.run())
        .await
        .context("run loop panicked")??;

    if let Some(reason) = summary.aborted {
        anyhow::bail!("run aborted at step {}: {reason}", summary.final_step);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::SampleConfig => {
            print!("{}", Parameters::default().to_toml()?);
            Ok(())
        }
    }
}
