//! CLI command handlers.

pub mod cancel;
pub mod card;
pub mod get;
pub mod send;
pub mod serve;

use anyhow::Result;
use console::{Style, style};
use parley_client::A2aClient;
use parley_types::{Task, TaskEvent, TaskState};

/// Server URL used when neither `--server` nor `PARLEY_SERVER_URL` is set.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:41241";

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Server URL to connect to.
    pub server_url: String,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Client for the configured server.
    pub fn client(&self) -> Result<A2aClient> {
        Ok(A2aClient::builder().base_url(&self.server_url).build()?)
    }
}

fn state_style(state: TaskState) -> Style {
    match state {
        TaskState::Completed => Style::new().green(),
        TaskState::Failed => Style::new().red(),
        TaskState::Canceled => Style::new().yellow(),
        TaskState::InputRequired => Style::new().cyan(),
        _ => Style::new().blue(),
    }
}

/// Print a task, as JSON or for humans.
pub fn print_task(task: &Task, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(task)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let state = task.status.state;

    println!();
    println!("{} {}", style("Task").bold(), task.id);
    println!("{}", dim.apply_to("─".repeat(40)));
    println!(
        "  {} {}",
        dim.apply_to("State:"),
        state_style(state).apply_to(state.as_str())
    );
    if let Some(session) = &task.session_id {
        println!("  {} {}", dim.apply_to("Session:"), session);
    }
    if let Some(message) = &task.status.message {
        println!("  {} {}", dim.apply_to("Message:"), message.text());
    }
    if ctx.verbose
        && let Some(timestamp) = task.status.timestamp
    {
        println!("  {} {}", dim.apply_to("Updated:"), timestamp.to_rfc3339());
    }

    for (i, artifact) in task.artifacts.iter().enumerate() {
        let name = artifact.name.clone().unwrap_or_else(|| format!("#{i}"));
        println!();
        println!("  {} {}", dim.apply_to("Artifact:"), style(name).bold());
        for part in &artifact.parts {
            match part.as_text() {
                Some(text) => println!("    {text}"),
                None => println!("    {}", dim.apply_to("(non-text part)")),
            }
        }
    }
    println!();
    Ok(())
}

/// Print one streaming event, as a JSON line or for humans.
pub fn print_event(event: &TaskEvent, ctx: &Context) -> Result<()> {
    if ctx.json_output {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    match event {
        TaskEvent::Status(update) => {
            let state = update.status.state;
            let text = update
                .status
                .message
                .as_ref()
                .map(|m| m.text())
                .unwrap_or_default();
            println!(
                "{} {} {}",
                dim.apply_to("status"),
                state_style(state).apply_to(state.as_str()),
                text
            );
        }
        TaskEvent::Artifact(update) => {
            let text: Vec<&str> = update
                .artifact
                .parts
                .iter()
                .filter_map(|p| p.as_text())
                .collect();
            println!("{} {}", dim.apply_to("artifact"), text.join(""));
        }
    }
    Ok(())
}
