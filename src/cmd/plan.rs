use anyhow::Result;
use async_trait::async_trait;
use clap::Args;

use act::report::display_plan;

use super::{generate_plan, ConfigArgs, RunCommand};

/// Print the ordered test matrix without sending any request.
#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub config: ConfigArgs,
}

#[async_trait]
impl RunCommand for PlanArgs {
    async fn run(&self) -> Result<()> {
        let cfg = match self.config.setup()? {
            Some(cfg) => cfg,
            None => return Ok(()),
        };

        let (_, combinations) = generate_plan(&cfg)?;
        display_plan(&combinations, self.config.style)
    }
}
