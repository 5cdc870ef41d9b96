use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use aet_data::{load_search_results, RunCatalog};
use aet_engine::report::{render_plan, render_record, render_run_entry};
use aet_optimizer::{default_search_space, SearchSpace};
use aet_types::{ModelFamily, TuningConfig};

#[derive(Parser, Debug)]
#[command(name = "aet-tune")]
#[command(about = "Inspect autoencoder hyperparameter grids and saved search runs")]
struct Args {
    /// JSON settings file (directories, epochs, failure policy)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a search space and list its configurations in search order
    Plan {
        /// JSON file mapping parameter names to candidate lists
        #[arg(long, conflicts_with = "family")]
        space: Option<PathBuf>,

        /// Use the default grid of this model family
        #[arg(long, value_parser = parse_family)]
        family: Option<ModelFamily>,
    },
    /// List saved search runs, newest first
    Runs {
        #[arg(long, value_parser = parse_family)]
        family: Option<ModelFamily>,
    },
    /// Summarize a saved result file
    Show { path: PathBuf },
    /// Print default search spaces as JSON
    Presets {
        #[arg(long, value_parser = parse_family)]
        family: Option<ModelFamily>,
    },
}

fn parse_family(s: &str) -> Result<ModelFamily, String> {
    s.parse().map_err(|e: aet_types::AetError| e.to_string())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<TuningConfig> {
    let config = match path {
        Some(path) => TuningConfig::from_file(path)
            .with_context(|| format!("reading settings from {}", path.display()))?,
        None => TuningConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Plan { space, family } => {
            let space = match (space, family) {
                (Some(path), _) => {
                    let content = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    serde_json::from_str::<SearchSpace>(&content)
                        .with_context(|| format!("parsing search space {}", path.display()))?
                }
                (None, Some(family)) => default_search_space(family),
                (None, None) => anyhow::bail!("pass --space FILE or --family NAME"),
            };
            for line in render_plan(&space)? {
                println!("{line}");
            }
        }
        Command::Runs { family } => {
            let catalog = RunCatalog::new(&config.results_dir);
            let runs = catalog.list(family)?;
            if runs.is_empty() {
                println!("No saved runs in {}", catalog.results_dir().display());
            }
            for run in &runs {
                println!("{}", render_run_entry(run));
            }
        }
        Command::Show { path } => {
            let record = load_search_results(&path)?;
            for line in render_record(&record) {
                println!("{line}");
            }
        }
        Command::Presets { family } => {
            let families = match family {
                Some(family) => vec![family],
                None => ModelFamily::ALL.to_vec(),
            };
            let presets: serde_json::Map<String, serde_json::Value> = families
                .into_iter()
                .map(|f| -> Result<_, serde_json::Error> {
                    Ok((f.to_string(), serde_json::to_value(default_search_space(f))?))
                })
                .collect::<Result<_, _>>()?;
            println!("{}", serde_json::to_string_pretty(&presets)?);
        }
    }

    Ok(())
}
