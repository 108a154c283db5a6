//! Send command - sends a message to a task.

use anyhow::{Result, bail};
use clap::Args;
use futures::StreamExt;
use parley_types::{Message, TaskSendParams};

use super::{Context, print_event, print_task};

/// Arguments for the send command.
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Message text
    pub text: String,

    /// Task to send to (a new id is generated when omitted)
    #[arg(short, long)]
    pub task_id: Option<String>,

    /// Session to group the task under
    #[arg(long)]
    pub session: Option<String>,

    /// Stream updates as they happen
    #[arg(short, long)]
    pub stream: bool,

    /// Only return this many history messages
    #[arg(long)]
    pub history: Option<usize>,
}

/// Run the send command.
pub async fn run(args: SendArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;

    let task_id = args
        .task_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut params = TaskSendParams::new(task_id, Message::user(args.text));
    params.session_id = args.session;
    params.history_length = args.history;

    if !args.stream {
        let task = client.send_task(params).await?;
        return print_task(&task, ctx);
    }

    let mut events = client.send_task_subscribe(params).await?;
    let mut finished = false;
    while let Some(event) = events.next().await {
        let event = event?;
        print_event(&event, ctx)?;
        if event.is_final() {
            finished = true;
            break;
        }
    }

    if !finished {
        bail!("stream ended before the task reached a final state");
    }
    Ok(())
}
