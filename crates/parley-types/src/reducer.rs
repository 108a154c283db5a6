//! Folds handler updates into persisted task state.

use crate::message::Role;
use crate::task::{Artifact, TaskAndHistory};
use crate::update::{StatusUpdate, TaskUpdate};

/// Apply one update to a task and its history, returning the new pair.
///
/// The input is never mutated. Status updates always refresh the timestamp
/// (never moving it backwards) and append agent-authored messages to the
/// history. Artifact updates are placed by positional index, then by name,
/// and are otherwise pushed onto the list.
pub fn apply_update(current: &TaskAndHistory, update: &TaskUpdate) -> TaskAndHistory {
    let mut next = current.clone();
    match update {
        TaskUpdate::Status(status) => apply_status(&mut next, status),
        TaskUpdate::Artifact(artifact) => apply_artifact(&mut next.task.artifacts, artifact),
    }
    next
}

fn apply_status(next: &mut TaskAndHistory, update: &StatusUpdate) {
    let status = &mut next.task.status;
    status.state = update.state;
    if let Some(message) = &update.message {
        status.message = message.clone();
    }

    let now = crate::now();
    status.timestamp = Some(match status.timestamp {
        Some(previous) if previous > now => previous,
        _ => now,
    });

    if let Some(Some(message)) = &update.message
        && message.role == Role::Agent
    {
        next.history.push(message.clone());
    }
}

fn apply_artifact(artifacts: &mut Vec<Artifact>, update: &Artifact) {
    let target = update
        .index
        .filter(|&i| i < artifacts.len())
        .or_else(|| {
            let name = update.name.as_deref()?;
            artifacts.iter().position(|a| a.name.as_deref() == Some(name))
        });

    match target {
        Some(i) if update.append == Some(true) => append_to(&mut artifacts[i], update),
        Some(i) => artifacts[i] = update.clone(),
        None => artifacts.push(update.clone()),
    }

    if artifacts.iter().any(|a| a.index.is_some()) {
        artifacts.sort_by_key(|a| a.index.unwrap_or(0));
    }
}

fn append_to(existing: &mut Artifact, update: &Artifact) {
    existing.parts.extend(update.parts.iter().cloned());
    if let Some(extra) = &update.metadata {
        let merged = existing.metadata.get_or_insert_with(Default::default);
        for (key, value) in extra {
            merged.insert(key.clone(), value.clone());
        }
    }
    if update.last_chunk.is_some() {
        existing.last_chunk = update.last_chunk;
    }
    if update.description.is_some() {
        existing.description = update.description.clone();
    }
}
