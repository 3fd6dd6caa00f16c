use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use elif_modularity::{BootstrapOptions, Bootstrapper, DirectoryBootstrap, RunMode};
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "modhost")]
#[command(about = "Load elif.rs plugin units and run them as a shell or a library")]
#[command(version)]
struct Cli {
    /// Directory scanned for plugin units
    #[arg(long, value_name = "DIR")]
    plugins: Option<PathBuf>,

    /// Only load unit files whose name contains this text
    #[arg(long, default_value = "")]
    include: String,

    /// Skip unit files whose name contains this text
    #[arg(long, default_value = "")]
    exclude: String,

    /// Load a linked or system library unit by name
    #[arg(long = "unit", value_name = "NAME")]
    units: Vec<String>,

    /// YAML or JSON settings file; repeat to layer files
    #[arg(long = "settings", value_name = "FILE")]
    settings: Vec<PathBuf>,

    /// Read settings from environment variables with this prefix
    #[arg(long, value_name = "PREFIX")]
    env_prefix: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print a JSON summary of the run to stdout
    #[arg(long)]
    report: bool,

    /// Arguments forwarded to the shell
    #[arg(last = true)]
    args: Vec<String>,
}

impl Cli {
    fn bootstrap_options(&self) -> BootstrapOptions {
        let mut options = BootstrapOptions::new()
            .with_include(self.include.as_str())
            .with_exclude(self.exclude.as_str());
        if let Some(directory) = &self.plugins {
            options = options.with_plugin_directory(directory.clone());
        }
        for unit in &self.units {
            options = options.with_unit(unit.as_str());
        }
        for path in &self.settings {
            options = options.with_settings_file(path.clone());
        }
        if let Some(prefix) = &self.env_prefix {
            options = options.with_env_prefix(prefix.as_str());
        }
        options
    }
}

fn init_logging(json: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr))
            .init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    let options = cli.bootstrap_options();
    tracing::debug!("Bootstrap options: {:?}", options);

    let mut bootstrapper = Bootstrapper::new(DirectoryBootstrap::new(options));
    let report = bootstrapper
        .run_with_args(cli.args.iter().cloned())
        .context("bootstrap failed")?;

    if report.mode == RunMode::Library {
        tracing::info!(
            "No shell registered; container published with {} services",
            report.container.service_count()
        );
    }

    if cli.report {
        println!("{}", serde_json::to_string_pretty(&report.summary())?);
    }
    Ok(())
}
