//! Shared protocol types for the Parley task server.
//!
//! Everything that crosses the wire lives here so that the server, the
//! client and task handlers agree on one vocabulary:
//!
//! - [`Task`], [`TaskStatus`], [`Artifact`] and [`TaskAndHistory`]
//! - [`Message`] and its content [`Part`]s
//! - [`TaskUpdate`], the values a task handler yields, and [`apply_update`],
//!   the reducer that folds them into persisted state
//! - streaming events ([`TaskEvent`])
//! - the JSON-RPC envelope and [`ProtocolError`] taxonomy
//! - the [`AgentCard`] served for capability discovery

pub mod agent_card;
pub mod error;
pub mod event;
pub mod jsonrpc;
pub mod message;
pub mod params;
pub mod reducer;
pub mod task;
pub mod update;

pub use agent_card::{
    AGENT_CARD_PATH, AgentAuthentication, AgentCapabilities, AgentCard, AgentProvider, AgentSkill,
    Capability,
};
pub use error::{ErrorKind, ProtocolError, Result};
pub use event::{TaskArtifactUpdateEvent, TaskEvent, TaskStatusUpdateEvent};
pub use jsonrpc::{JsonRpcId, JsonRpcRequest, JsonRpcResponse, RpcErrorObject, methods};
pub use message::{FileContent, Message, Metadata, Part, Role};
pub use params::{
    PushNotificationConfig, TaskIdParams, TaskPushNotificationConfig, TaskQueryParams,
    TaskSendParams,
};
pub use reducer::apply_update;
pub use task::{Artifact, Task, TaskAndHistory, TaskState, TaskStatus};
pub use update::{StatusUpdate, TaskUpdate};

/// Timestamp type used for task status updates.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}
