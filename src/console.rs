//! Interactive console loop for exercising a running orchestrator.
//!
//! Reads lines from stdin, routes each one as an interaction from a fixed
//! pseudo user on the `"console"` platform, and prints the reply. The loop
//! ends on end-of-input or when the operator types the exit command.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::errors::Result;
use crate::orchestrator::Orchestrator;

/// Pseudo user id every console line is attributed to.
pub const CONSOLE_USER: &str = "user";

/// Platform tag for console interactions.
pub const CONSOLE_PLATFORM: &str = "console";

/// Typing this (exactly, after trimming) ends the loop.
pub const EXIT_COMMAND: &str = "stop";

/// Run the console loop over stdin/stdout until exit or end-of-input.
pub async fn run_console(orchestrator: Arc<Orchestrator>) -> Result<()> {
    run_console_io(orchestrator, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Console loop over arbitrary reader/writer pairs, so tests can drive it
/// without a terminal.
pub async fn run_console_io<R, W>(
    orchestrator: Arc<Orchestrator>,
    reader: R,
    mut writer: W,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    writer
        .write_all(b"Type a message, or \"stop\" to quit.\n> ")
        .await?;
    writer.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input == EXIT_COMMAND {
            writer.write_all(b"Bye!\n").await?;
            writer.flush().await?;
            break;
        }
        if !input.is_empty() {
            let reply = orchestrator
                .route_message(input, CONSOLE_USER, CONSOLE_PLATFORM, None)
                .await?;
            writer.write_all(reply.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
        writer.write_all(b"> ").await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentFactory;
    use crate::config::PersonaConfig;
    use crate::events::EventHub;
    use crate::memory::{InMemoryStore, KeyValueStore};
    use crate::registry::{AgentRegistry, StoreAgentRegistry};

    async fn orchestrator_with_agent() -> Arc<Orchestrator> {
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
        let hub = Arc::new(EventHub::new());
        let registry = Arc::new(StoreAgentRegistry::new(store.clone()));
        let orchestrator = Arc::new(Orchestrator::new(hub.clone(), registry.clone()));

        let config = PersonaConfig {
            name: "Zeek".to_string(),
            id: "agent-zeek".to_string(),
            ..Default::default()
        };
        registry.create_agent(config.clone(), "console").await.unwrap();
        let agent = Arc::new(AgentFactory::from_config(config, store, hub));
        orchestrator.start_agent(agent).await.unwrap();
        orchestrator
    }

    #[tokio::test]
    async fn routes_lines_until_exit_command() {
        let orchestrator = orchestrator_with_agent().await;
        let input = b"hi there\nstop\nignored after exit\n";
        let mut output = Vec::new();

        run_console_io(orchestrator, &input[..], &mut output).await.unwrap();

        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("Hey user (console), I'm Zeek!"));
        assert!(transcript.ends_with("Bye!\n"));
        assert!(!transcript.contains("ignored after exit"));
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let orchestrator = orchestrator_with_agent().await;
        let input = b"\n   \nstop\n";
        let mut output = Vec::new();

        run_console_io(orchestrator, &input[..], &mut output).await.unwrap();

        let transcript = String::from_utf8(output).unwrap();
        assert!(!transcript.contains("Hey user"));
    }
}
