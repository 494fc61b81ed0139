use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::Args;
use log::info;

use act::auth::AuthenticatorRegistry;
use act::executor::TestCaseExecutor;
use act::report::{display_report, format_summary};
use act::request::RequestExecutor;
use act::runner::{build_test_cases, SequentialRunner};

use super::{generate_plan, ConfigArgs, RunCommand};

/// Generate the test matrix and execute it against the API.
#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[async_trait]
impl RunCommand for RunArgs {
    async fn run(&self) -> Result<()> {
        let cfg = match self.config.setup()? {
            Some(cfg) => cfg,
            None => return Ok(()),
        };

        let (_, combinations) = generate_plan(&cfg)?;

        let client = cfg.build_client()?;
        let registry = Arc::new(AuthenticatorRegistry::new(
            client.clone(),
            cfg.api_base_url.clone(),
        ));
        let executor = Arc::new(TestCaseExecutor::new(
            Arc::new(cfg.api().clone()),
            registry,
            RequestExecutor::new(client),
        ));

        let cases = build_test_cases(combinations, executor);
        info!("Running {} test case(s) against {}", cases.len(), cfg.api_base_url);
        let report = SequentialRunner::run(&cases).await;

        let summary = report.summary();
        info!("Done, {}", format_summary(&summary));
        display_report(&report, self.config.style)?;

        if report.has_failures() {
            bail!("{} test(s) failed", summary.failed);
        }
        Ok(())
    }
}
