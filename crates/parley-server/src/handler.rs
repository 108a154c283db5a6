//! The contract between the server and task handlers.
//!
//! A handler receives a [`TaskContext`] and returns a stream of
//! [`TaskUpdate`]s. The server applies each update to the task in the order
//! it is yielded, persists the result, and forwards it to streaming callers.
//!
//! Any `Fn(TaskContext) -> UpdateStream` closure is a handler:
//!
//! ```ignore
//! use parley_server::{TaskContext, UpdateStream};
//! use parley_types::{Message, TaskState, TaskUpdate};
//!
//! let handler = |ctx: TaskContext| -> UpdateStream {
//!     Box::pin(async_stream::stream! {
//!         let reply = Message::agent(format!("You said: {}", ctx.user_message.text()));
//!         yield Ok(TaskUpdate::status_with_message(TaskState::Completed, reply));
//!     })
//! };
//! ```

use std::pin::Pin;

use futures::Stream;
use parley_types::{Message, Task, TaskUpdate};
use tokio_util::sync::CancellationToken;

/// Error raised by a handler. Any error type works; a
/// [`ProtocolError`](parley_types::ProtocolError) keeps its code on the wire.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Updates yielded by a handler.
pub type UpdateStream = Pin<Box<dyn Stream<Item = Result<TaskUpdate, HandlerError>> + Send>>;

/// Produces updates for a task.
pub trait TaskHandler: Send + Sync + 'static {
    fn handle(&self, ctx: TaskContext) -> UpdateStream;
}

impl<F> TaskHandler for F
where
    F: Fn(TaskContext) -> UpdateStream + Send + Sync + 'static,
{
    fn handle(&self, ctx: TaskContext) -> UpdateStream {
        self(ctx)
    }
}

/// What a handler sees of the task it works on. All fields are copies.
#[derive(Debug, Clone)]
pub struct TaskContext {
    /// The task as it was when the handler started.
    pub task: Task,
    /// The message that triggered this run.
    pub user_message: Message,
    /// Full history, ending with `user_message`.
    pub history: Vec<Message>,
    cancel: CancellationToken,
}

impl TaskContext {
    pub(crate) fn new(
        task: Task,
        user_message: Message,
        history: Vec<Message>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            task,
            user_message,
            history,
            cancel,
        }
    }

    /// Whether `tasks/cancel` was requested for this run.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the run is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}
