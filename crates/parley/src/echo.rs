//! The built-in echo agent served by `parley serve`.

use std::time::Duration;

use parley_server::{HandlerError, TaskContext, UpdateStream};
use parley_types::{AgentSkill, Artifact, Message, Part, TaskState, TaskUpdate};

/// Pause between updates, so streaming clients see the task progress.
const STEP_DELAY: Duration = Duration::from_millis(50);

/// Acknowledge, echo the text back as an artifact, then complete.
///
/// Stops quietly once the task is cancelled.
pub fn handle(ctx: TaskContext) -> UpdateStream {
    Box::pin(async_stream::stream! {
        let text = ctx.user_message.text();
        let turn = ctx.history.len();

        yield Ok::<_, HandlerError>(TaskUpdate::status_with_message(
            TaskState::Working,
            Message::agent("Echoing..."),
        ));
        tokio::time::sleep(STEP_DELAY).await;
        if ctx.is_cancelled() {
            return;
        }

        yield Ok(Artifact::new(vec![Part::text(text.clone())])
            .with_name("echo")
            .with_index(0)
            .last_chunk()
            .into());
        tokio::time::sleep(STEP_DELAY).await;
        if ctx.is_cancelled() {
            return;
        }

        yield Ok(TaskUpdate::status_with_message(
            TaskState::Completed,
            Message::agent(format!("You said: {text} (message {turn})")),
        ));
    })
}

/// The skill advertised for the echo agent.
pub fn skill() -> AgentSkill {
    AgentSkill {
        id: "echo".to_string(),
        name: "Echo".to_string(),
        description: Some("Repeats the text of each message back".to_string()),
        tags: vec!["demo".to_string()],
        examples: vec!["hello".to_string()],
        input_modes: None,
        output_modes: None,
    }
}
