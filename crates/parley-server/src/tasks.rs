//! Task lifecycle management.
//!
//! [`TaskManager`] owns the handler and the store and implements the task
//! methods: load-or-create, driving a handler run, cancellation and
//! resubscription. Every read-modify-write of one task id runs under that
//! id's lock; different ids never contend.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use parley_store::{InMemoryTaskStore, KeyedGuard, KeyedLocks, TaskStore};
use parley_types::{
    Artifact, Message, ProtocolError, Result, StatusUpdate, Task, TaskAndHistory, TaskEvent,
    TaskSendParams, TaskState, TaskStatus, TaskUpdate, apply_update,
};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::handler::{HandlerError, TaskContext, TaskHandler, UpdateStream};

/// Events of one task, in emission order.
pub type EventStream = BoxStream<'static, TaskEvent>;

/// Status message recorded when a task is cancelled.
pub const CANCEL_MESSAGE: &str = "Task cancelled by request.";

const EVENT_BUFFER: usize = 64;

/// Registry entry for a handler run in flight.
struct RunHandle {
    run_id: u64,
    cancel: CancellationToken,
    events: broadcast::Sender<TaskEvent>,
}

/// One handler run, as seen by the driver loop.
struct Run {
    task_id: String,
    run_id: u64,
    cancel: CancellationToken,
    events: broadcast::Sender<TaskEvent>,
    sink: Option<mpsc::Sender<TaskEvent>>,
}

impl Run {
    fn streaming(&self) -> bool {
        self.sink.is_some()
    }

    async fn emit(&self, event: TaskEvent) {
        // Having no resubscribers is normal
        let _ = self.events.send(event.clone());
        if let Some(sink) = &self.sink
            && sink.send(event).await.is_err()
        {
            debug!(task_id = %self.task_id, "Stream consumer went away");
        }
    }

    async fn emit_status(&self, status: TaskStatus, final_: bool) {
        self.emit(TaskEvent::status(self.task_id.clone(), status, final_))
            .await;
    }
}

enum Applied {
    Saved(TaskAndHistory),
    Cancelled,
}

pub struct TaskManager {
    handler: Arc<dyn TaskHandler>,
    store: Arc<dyn TaskStore>,
    handler_timeout: Option<Duration>,
    locks: KeyedLocks,
    cancelling: parking_lot::Mutex<HashSet<String>>,
    runs: parking_lot::Mutex<HashMap<String, RunHandle>>,
    next_run_id: AtomicU64,
}

impl TaskManager {
    pub fn new(handler: Arc<dyn TaskHandler>, store: Arc<dyn TaskStore>) -> Self {
        Self {
            handler,
            store,
            handler_timeout: None,
            locks: KeyedLocks::new(),
            cancelling: parking_lot::Mutex::new(HashSet::new()),
            runs: parking_lot::Mutex::new(HashMap::new()),
            next_run_id: AtomicU64::new(1),
        }
    }

    /// A manager backed by a fresh in-memory store.
    pub fn in_memory(handler: impl TaskHandler) -> Self {
        Self::new(Arc::new(handler), Arc::new(InMemoryTaskStore::new()))
    }

    /// Fail runs whose handler does not yield within `timeout`.
    pub fn with_handler_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handler_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Whether a cancellation of `task_id` is being recorded right now.
    pub fn is_cancelling(&self, task_id: &str) -> bool {
        self.cancelling.lock().contains(task_id)
    }

    /// Whether a handler run for `task_id` is in flight.
    pub fn is_running(&self, task_id: &str) -> bool {
        self.runs.lock().contains_key(task_id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Methods
    // ─────────────────────────────────────────────────────────────────────────

    /// `tasks/send`: run the handler to exhaustion and return the final task.
    ///
    /// A handler failure is persisted as `failed` and returned as an error.
    pub async fn send(&self, params: TaskSendParams) -> Result<Task> {
        let (run, updates) = self.start(params, None).await?;
        let outcome = self.drive(&run, updates).await;
        self.end_run(&run);
        outcome.map(|data| data.task)
    }

    /// `tasks/sendSubscribe`: start the handler and stream its events.
    ///
    /// Setup failures are returned directly. Once the stream exists, every
    /// outcome, handler failure included, ends it with one final status event.
    pub async fn send_subscribe(self: &Arc<Self>, params: TaskSendParams) -> Result<EventStream> {
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let (run, updates) = self.start(params, Some(tx)).await?;

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = manager.drive(&run, updates).await {
                debug!(task_id = %run.task_id, error = %e, "Streaming run ended with failure");
            }
            manager.end_run(&run);
        });

        Ok(Box::pin(async_stream::stream! {
            while let Some(event) = rx.recv().await {
                let done = event.is_final();
                yield event;
                if done {
                    break;
                }
            }
        }))
    }

    /// `tasks/get`.
    pub async fn get(&self, task_id: &str) -> Result<Task> {
        self.load(task_id)
            .await?
            .map(|data| data.task)
            .ok_or_else(|| ProtocolError::task_not_found(task_id))
    }

    /// `tasks/cancel`. Terminal tasks are returned unchanged.
    pub async fn cancel(&self, task_id: &str) -> Result<Task> {
        let _guard = self.lock(task_id).await;
        let data = self
            .load(task_id)
            .await?
            .ok_or_else(|| ProtocolError::task_not_found(task_id))?;

        if data.state().is_terminal() {
            info!(task_id, state = %data.state(), "Task already final, nothing to cancel");
            return Ok(data.task);
        }

        self.cancelling.lock().insert(task_id.to_string());
        let token = self.runs.lock().get(task_id).map(|run| run.cancel.clone());
        if let Some(token) = token {
            token.cancel();
        }

        let update =
            TaskUpdate::status_with_message(TaskState::Canceled, Message::agent(CANCEL_MESSAGE));
        let next = apply_update(&data, &update);
        let saved = self.save(&next).await;
        self.cancelling.lock().remove(task_id);
        saved?;

        info!(task_id, "Task canceled");
        Ok(next.task)
    }

    /// `tasks/resubscribe`: the current status, then the live events of the
    /// run in flight until its final event.
    pub async fn resubscribe(&self, task_id: &str) -> Result<EventStream> {
        let (data, receiver) = {
            let _guard = self.lock(task_id).await;
            let data = self
                .load(task_id)
                .await?
                .ok_or_else(|| ProtocolError::task_not_found(task_id))?;
            let receiver = self.runs.lock().get(task_id).map(|run| run.events.subscribe());
            (data, receiver)
        };

        let task_id = task_id.to_string();
        let status = data.task.status;
        Ok(Box::pin(async_stream::stream! {
            let closes_now = status.state.ends_stream() || receiver.is_none();
            yield TaskEvent::status(task_id.clone(), status, closes_now);

            match receiver {
                Some(mut events) if !closes_now => loop {
                    match events.recv().await {
                        Ok(event) => {
                            let done = event.is_final();
                            yield event;
                            if done {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(task_id = %task_id, skipped, "Resubscriber fell behind");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                },
                _ => {}
            }
        }))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Run lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    async fn start(
        &self,
        params: TaskSendParams,
        sink: Option<mpsc::Sender<TaskEvent>>,
    ) -> Result<(Run, UpdateStream)> {
        let guard = self.lock(&params.id).await;
        let data = self.load_or_create(&params).await?;
        let run = self.begin_run(&params.id, sink);
        drop(guard);

        debug!(task_id = %params.id, run_id = run.run_id, "Starting handler");
        let ctx = TaskContext::new(
            data.task,
            params.message,
            data.history,
            run.cancel.clone(),
        );
        let updates = self.handler.handle(ctx);
        Ok((run, updates))
    }

    /// Caller holds the task lock.
    async fn load_or_create(&self, params: &TaskSendParams) -> Result<TaskAndHistory> {
        let task_id = params.id.as_str();
        let data = match self.load(task_id).await? {
            None => {
                let mut task = Task::submitted(task_id, params.session_id.clone());
                task.metadata = params.metadata.clone();
                info!(task_id, "Created task");
                TaskAndHistory::new(task, vec![params.message.clone()])
            }
            Some(mut existing) => {
                existing.history.push(params.message.clone());
                match existing.state() {
                    state if state.is_terminal() => {
                        warn!(task_id, %state, "Message for finished task, resubmitting");
                        let reset = StatusUpdate::clearing_message(TaskState::Submitted);
                        apply_update(&existing, &reset.into())
                    }
                    TaskState::InputRequired => {
                        debug!(task_id, "Input received, resuming");
                        apply_update(&existing, &TaskUpdate::status(TaskState::Working))
                    }
                    _ => existing,
                }
            }
        };
        self.save(&data).await?;
        Ok(data)
    }

    fn begin_run(&self, task_id: &str, sink: Option<mpsc::Sender<TaskEvent>>) -> Run {
        let run_id = self.next_run_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        self.runs.lock().insert(
            task_id.to_string(),
            RunHandle {
                run_id,
                cancel: cancel.clone(),
                events: events.clone(),
            },
        );

        Run {
            task_id: task_id.to_string(),
            run_id,
            cancel,
            events,
            sink,
        }
    }

    fn end_run(&self, run: &Run) {
        let mut runs = self.runs.lock();
        if runs
            .get(&run.task_id)
            .is_some_and(|handle| handle.run_id == run.run_id)
        {
            runs.remove(&run.task_id);
        }
    }

    /// Consume the handler, applying and persisting each update in order.
    ///
    /// Cancellation publishes the persisted status as the final event right
    /// away, then keeps draining the handler until it returns. Anything it
    /// yields after that point is discarded.
    async fn drive(&self, run: &Run, mut updates: UpdateStream) -> Result<TaskAndHistory> {
        let mut last_final = false;
        let mut cancelled = false;

        loop {
            let next = tokio::select! {
                biased;
                _ = run.cancel.cancelled(), if !cancelled => {
                    cancelled = true;
                    self.announce_cancelled(run).await;
                    continue;
                }
                next = self.next_update(&mut updates) => next,
            };
            let update = match next {
                None => break,
                Some(Ok(update)) => update,
                Some(Err(err)) if cancelled => {
                    debug!(task_id = %run.task_id, error = %err, "Error after cancellation ignored");
                    break;
                }
                Some(Err(err)) => return self.fail(run, err).await,
            };

            let data = match self.apply_locked(run, &update).await {
                Ok(Applied::Saved(data)) => data,
                Ok(Applied::Cancelled) => {
                    if !cancelled {
                        cancelled = true;
                        self.announce_cancelled(run).await;
                    }
                    debug!(task_id = %run.task_id, "Update after cancellation discarded");
                    continue;
                }
                Err(err) => return self.fail(run, Box::new(err)).await,
            };

            let event = match &update {
                TaskUpdate::Status(_) => {
                    let status = data.task.status.clone();
                    let final_ = status.state.ends_stream();
                    TaskEvent::status(run.task_id.clone(), status, final_)
                }
                TaskUpdate::Artifact(artifact) => {
                    TaskEvent::artifact(run.task_id.clone(), stored_artifact(&data, artifact))
                }
            };
            last_final = event.is_final();
            run.emit(event).await;

            if last_final && run.streaming() {
                debug!(task_id = %run.task_id, state = %data.state(), "Final state reached");
                return Ok(data);
            }
        }

        if cancelled {
            debug!(task_id = %run.task_id, "Handler returned after cancellation");
            return self.current(run).await;
        }

        let mut data = self.current(run).await?;
        if !last_final {
            if run.streaming() && !data.state().ends_stream() {
                debug!(task_id = %run.task_id, state = %data.state(), "Handler ended early, completing task");
                match self
                    .apply_locked(run, &TaskUpdate::status(TaskState::Completed))
                    .await?
                {
                    Applied::Saved(completed) => data = completed,
                    Applied::Cancelled => {
                        self.announce_cancelled(run).await;
                        return self.current(run).await;
                    }
                }
            }
            run.emit_status(data.task.status.clone(), true).await;
        }
        Ok(data)
    }

    async fn next_update(
        &self,
        updates: &mut UpdateStream,
    ) -> Option<std::result::Result<TaskUpdate, HandlerError>> {
        let Some(limit) = self.handler_timeout else {
            return updates.next().await;
        };
        match tokio::time::timeout(limit, updates.next()).await {
            Ok(next) => next,
            Err(_) => Some(Err(Box::new(ProtocolError::internal_error(format!(
                "Handler timed out after {limit:?}"
            ))))),
        }
    }

    async fn apply_locked(&self, run: &Run, update: &TaskUpdate) -> Result<Applied> {
        let _guard = self.lock(&run.task_id).await;
        if self.cancel_requested(run) {
            return Ok(Applied::Cancelled);
        }
        let current = self
            .load(&run.task_id)
            .await?
            .ok_or_else(|| ProtocolError::task_not_found(&run.task_id))?;
        let next = apply_update(&current, update);
        self.save(&next).await?;
        Ok(Applied::Saved(next))
    }

    async fn fail(&self, run: &Run, err: HandlerError) -> Result<TaskAndHistory> {
        let mut protocol = ProtocolError::normalize(&*err);
        if protocol.task_id.is_none() {
            protocol.task_id = Some(run.task_id.clone());
        }
        warn!(task_id = %run.task_id, error = %protocol.message, "Handler failed");

        let update = TaskUpdate::status_with_message(
            TaskState::Failed,
            Message::agent(format!("Handler failed: {}", protocol.message)),
        );
        let status = match self.apply_locked(run, &update).await {
            Ok(Applied::Saved(data)) => data.task.status,
            Ok(Applied::Cancelled) => {
                self.announce_cancelled(run).await;
                return self.current(run).await;
            }
            Err(save_err) => {
                error!(task_id = %run.task_id, error = %save_err, "Failed to persist failed status");
                TaskStatus {
                    state: TaskState::Failed,
                    message: None,
                    timestamp: Some(parley_types::now()),
                }
            }
        };
        run.emit_status(status, true).await;
        Err(protocol)
    }

    /// Publish the persisted status as the run's final event without touching it.
    async fn announce_cancelled(&self, run: &Run) {
        info!(task_id = %run.task_id, "Run cancelled");
        match self.current(run).await {
            Ok(data) => run.emit_status(data.task.status, true).await,
            Err(e) => {
                warn!(task_id = %run.task_id, error = %e, "Failed to load cancelled task");
                run.emit_status(TaskStatus::new(TaskState::Canceled), true).await;
            }
        }
    }

    fn cancel_requested(&self, run: &Run) -> bool {
        run.cancel.is_cancelled() || self.is_cancelling(&run.task_id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Store access
    // ─────────────────────────────────────────────────────────────────────────

    async fn lock(&self, task_id: &str) -> KeyedGuard<'_> {
        self.locks.lock(task_id).await
    }

    async fn current(&self, run: &Run) -> Result<TaskAndHistory> {
        let _guard = self.lock(&run.task_id).await;
        self.load(&run.task_id)
            .await?
            .ok_or_else(|| ProtocolError::task_not_found(&run.task_id))
    }

    async fn load(&self, task_id: &str) -> Result<Option<TaskAndHistory>> {
        Ok(self.store.load(task_id).await?)
    }

    async fn save(&self, data: &TaskAndHistory) -> Result<()> {
        Ok(self.store.save(data).await?)
    }
}

/// The artifact an update landed on, as stored.
fn stored_artifact(data: &TaskAndHistory, update: &Artifact) -> Artifact {
    data.task
        .artifacts
        .iter()
        .find(|a| {
            (update.index.is_some() && a.index == update.index)
                || (update.name.is_some() && a.name == update.name)
        })
        .cloned()
        .unwrap_or_else(|| update.clone())
}
