//! Cancel command - cancels a task.

use anyhow::Result;
use clap::Args;
use parley_types::TaskIdParams;

use super::{Context, print_task};

/// Arguments for the cancel command.
#[derive(Args, Debug)]
pub struct CancelArgs {
    /// Task ID
    pub id: String,
}

/// Run the cancel command.
pub async fn run(args: CancelArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    let task = client.cancel_task(TaskIdParams::new(args.id)).await?;

    tracing::debug!(task_id = %task.id, state = task.status.state.as_str(), "Cancel returned");
    print_task(&task, ctx)
}
