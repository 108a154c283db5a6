//! Serve command - runs a task server with the echo agent.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};
use parley_config::{AgentSection, ParleyConfig, StoreKind};
use parley_server::{AppState, Server, ServerConfig};
use parley_store::{FileTaskStore, InMemoryTaskStore, TaskStore};

use super::Context;
use crate::echo;

/// Task store backend.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StoreArg {
    Memory,
    File,
}

/// Arguments for the serve command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<IpAddr>,

    /// Task store backend (overrides config)
    #[arg(long, value_enum)]
    pub store: Option<StoreArg>,

    /// Directory of the file store (overrides config)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Path to config file (overrides default discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    // ── Load configuration ──────────────────────────────────────────────

    let mut config = if let Some(ref path) = args.config {
        parley_config::load_config_file(path)?
    } else {
        let loaded = parley_config::load_config(None)?;
        for warning in &loaded.warnings {
            eprintln!("warning: {}", warning);
        }
        if ctx.verbose {
            let sources = loaded.loaded_from();
            if sources.is_empty() {
                eprintln!("No config files found, using defaults + CLI args");
            }
            for source in sources {
                eprintln!("Loaded config: {}", source.display());
            }
        }
        loaded.config
    };

    apply_overrides(&mut config, &args)?;
    let server_config = ServerConfig::from_config(&config)?;

    // ── Store ───────────────────────────────────────────────────────────

    let store_section = config.store();
    let store: Arc<dyn TaskStore> = match store_section.kind {
        StoreKind::Memory => Arc::new(InMemoryTaskStore::new()),
        StoreKind::File => {
            tracing::info!(dir = %store_section.dir.display(), "Using file task store");
            Arc::new(FileTaskStore::new(store_section.dir))
        }
    };

    // ── Agent card ──────────────────────────────────────────────────────

    let agent = config.agent.clone().unwrap_or_else(echo_agent);
    let card = agent.to_card(&server_config.public_url());

    let state = AppState::with_store(echo::handle, store, server_config).with_agent_card(card);
    let server = Server::from_state(state);

    if !ctx.json_output {
        eprintln!(
            "Parley serving {} on http://{}",
            agent.name,
            server.bind_address()
        );
    }

    server.run().await.context("server exited with an error")
}

/// Fold `--bind`, `--port`, `--store` and `--dir` into the loaded config.
fn apply_overrides(config: &mut ParleyConfig, args: &ServeArgs) -> Result<()> {
    if args.bind.is_some() || args.port.is_some() {
        let mut server = config.server();
        let current = server.bind_addr()?;
        let ip = args.bind.unwrap_or(current.ip());
        let port = args.port.unwrap_or(current.port());
        server.bind = SocketAddr::new(ip, port).to_string();
        config.server = Some(server);
    }

    if args.store.is_some() || args.dir.is_some() {
        let mut store = config.store();
        match args.store {
            Some(StoreArg::Memory) => store.kind = StoreKind::Memory,
            Some(StoreArg::File) => store.kind = StoreKind::File,
            // A directory on its own implies the file store.
            None => store.kind = StoreKind::File,
        }
        if let Some(dir) = &args.dir {
            store.dir = dir.clone();
        }
        config.store = Some(store);
    }
    Ok(())
}

/// Card settings used when the config has no `[agent]` section.
fn echo_agent() -> AgentSection {
    AgentSection {
        name: "Parley Echo".to_string(),
        description: Some("Echoes every message back as an artifact".to_string()),
        skills: vec![echo::skill()],
        ..AgentSection::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ServeArgs {
        ServeArgs {
            port: None,
            bind: None,
            store: None,
            dir: None,
            config: None,
        }
    }

    #[test]
    fn test_overrides_keep_config_without_flags() {
        let mut config = ParleyConfig::from_toml("[server]\nbind = \"0.0.0.0:9000\"\n").unwrap();
        apply_overrides(&mut config, &args()).unwrap();
        assert_eq!(config.server().bind, "0.0.0.0:9000");
        assert!(config.store.is_none());
    }

    #[test]
    fn test_port_override_keeps_host() {
        let mut config = ParleyConfig::from_toml("[server]\nbind = \"0.0.0.0:9000\"\n").unwrap();
        let args = ServeArgs {
            port: Some(7000),
            ..args()
        };
        apply_overrides(&mut config, &args).unwrap();
        assert_eq!(config.server().bind, "0.0.0.0:7000");
    }

    #[test]
    fn test_dir_implies_file_store() {
        let mut config = ParleyConfig::new();
        let args = ServeArgs {
            dir: Some(PathBuf::from("/tmp/tasks")),
            ..args()
        };
        apply_overrides(&mut config, &args).unwrap();
        assert_eq!(config.store().kind, StoreKind::File);
        assert_eq!(config.store().dir, PathBuf::from("/tmp/tasks"));
    }

    #[test]
    fn test_echo_card_advertises_skill() {
        let card = echo_agent().to_card("http://127.0.0.1:41241/");
        assert_eq!(card.name, "Parley Echo");
        assert_eq!(card.skills[0].id, "echo");
        assert_eq!(card.url, "http://127.0.0.1:41241/");
    }
}
