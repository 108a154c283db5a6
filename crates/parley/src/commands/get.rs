//! Get command - shows a task.

use anyhow::Result;
use clap::Args;
use parley_types::TaskQueryParams;

use super::{Context, print_task};

/// Arguments for the get command.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Task ID
    pub id: String,

    /// Only return this many history messages
    #[arg(long)]
    pub history: Option<usize>,
}

/// Run the get command.
pub async fn run(args: GetArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;

    let mut params = TaskQueryParams::new(args.id);
    params.history_length = args.history;

    let task = client.get_task(params).await?;
    print_task(&task, ctx)
}
