use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use wizard_composer::config::ConfigArgs;
use wizard_composer::state::WizardState;
use wizard_composer::{GenerateRequest, Response, Result, WizardService};

#[derive(Parser)]
#[command(name = "wizard-composer")]
#[command(about = "Compose installer wizard contributions and generate output", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Log filter (overrides RUST_LOG), e.g. "debug" or "wizard_composer=trace".
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the unified wizard definition.
    Unified,

    /// Print merge diagnostics and a per-contribution summary.
    Diagnostics,

    /// Project values onto the output template and write the output file.
    Generate {
        /// JSON file with {values, pages?, outputTemplate?}.
        #[arg(long)]
        values: PathBuf,
    },

    /// Inspect or modify persisted wizard state.
    State {
        #[command(subcommand)]
        action: StateAction,
    },
}

#[derive(Subcommand)]
enum StateAction {
    Show,
    Save {
        #[arg(long)]
        file: PathBuf,
    },
    Clear,
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

fn emit(resp: Response) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&resp.body)?);
    if !resp.ok {
        bail!("request failed");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let service = WizardService::new(cli.config.into_config());

    match cli.cmd {
        Commands::Unified => emit(service.unified()),
        Commands::Diagnostics => emit(service.diagnostics()),
        Commands::Generate { values } => {
            let req = GenerateRequest::from_json_value(read_json(&values)?)
                .with_context(|| format!("decode generate request {}", values.display()))?;
            let req = service.complete_request(req)?;
            emit(service.generate(&req))
        }
        Commands::State { action } => match action {
            StateAction::Show => emit(service.state()),
            StateAction::Save { file } => {
                let state = WizardState::from_json_value(read_json(&file)?)
                    .with_context(|| format!("decode wizard state {}", file.display()))?;
                emit(service.save_state(state))
            }
            StateAction::Clear => emit(service.clear_state()),
        },
    }
}
