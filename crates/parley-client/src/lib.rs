//! Client for Parley task servers.
//!
//! [`A2aClient`] speaks JSON-RPC 2.0 to a task server. Plain calls return the
//! `result` of the response envelope; streaming calls decode the server-sent
//! event stream and yield the `result` of every frame. Every failure, from a
//! refused connection to a server-side error, surfaces as a
//! [`ProtocolError`](parley_types::ProtocolError).
//!
//! ```no_run
//! use parley_client::A2aClient;
//! use parley_types::{Message, TaskSendParams};
//!
//! # async fn example() -> parley_client::Result<()> {
//! let client = A2aClient::builder()
//!     .base_url("http://127.0.0.1:41241")
//!     .build()?;
//!
//! let task = client
//!     .send_task(TaskSendParams::new("task-1", Message::user("hello")))
//!     .await?;
//! println!("{}", task.status.state);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod stream;

pub use client::{A2aClient, ClientBuilder};
pub use error::Result;
pub use stream::TaskEventStream;
