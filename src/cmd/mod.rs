mod plan;
mod run;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use log::{debug, info};

use act::config::{load_config, resolve_path, TestConfig};
use act::display::{display_json, DisplayStyle};
use act::generator::{CombinationGenerator, TestCombination};
use act::logs;
use act::policy::User;

#[async_trait]
pub trait RunCommand {
    async fn run(&self) -> Result<()>;
}

/// Test whether a live HTTP API enforces its intended authorization rules.
#[derive(Parser)]
#[command(author, version, about)]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Run(run::RunArgs),
    Plan(plan::PlanArgs),
}

#[async_trait]
impl RunCommand for App {
    async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Run(args) => args.run().await,
            Commands::Plan(args) => args.run().await,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// The config file to use. Default is `act.toml`, or the value of
    /// `ACT_CONFIG` when set.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Print the parsed configuration as JSON and exit.
    #[arg(long)]
    pub print_config: bool,

    /// Log level, one of `error`, `warn`, `info`, `debug`. Overrides the
    /// level in the config file.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Output style of the report.
    #[arg(long, short, value_enum, default_value = "table")]
    pub style: DisplayStyle,
}

impl ConfigArgs {
    /// Loads the config and sets up logging. Returns `None` when only the
    /// config was asked for.
    pub fn setup(&self) -> Result<Option<TestConfig>> {
        let path = resolve_path(self.config.clone());
        let cfg: TestConfig = load_config(&path).context("load config")?;
        if self.print_config {
            display_json(&cfg)?;
            return Ok(None);
        }

        let level = self.log_level.as_deref().unwrap_or(&cfg.logs.level);
        logs::init(level)?;
        debug!("Loaded config from '{}'", path.display());
        Ok(Some(cfg))
    }
}

/// Builds the users and the ordered test matrix. No request is sent.
pub fn generate_plan(cfg: &TestConfig) -> Result<(Vec<Arc<User>>, Vec<TestCombination>)> {
    let roster = cfg.build_roster().context("create users")?;
    let users = roster.into_shared();

    let generator = CombinationGenerator::new(&cfg.api_base_url, &users);
    let combinations = generator.generate(&cfg.api().routes);
    info!(
        "Generated {} test combination(s) for {} user(s) and {} route(s)",
        combinations.len(),
        users.len(),
        cfg.api().routes.len()
    );
    Ok((users, combinations))
}
