use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::events::{Command, Event};

/// Spawns a task that turns stdin lines into `Event::Command`.
/// End of input shuts the replay down.
pub fn spawn_stdin(tx: mpsc::Sender<Event>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match Command::parse(&line) {
                    Some(command) => {
                        if tx.send(Event::Command(command)).await.is_err() {
                            break;
                        }
                    }
                    None => info!(
                        "[controls] unknown command {:?} (n, p, j <slot>, pause, play, q)",
                        line.trim()
                    ),
                },
                Ok(None) => {
                    let _ = tx.send(Event::Shutdown).await;
                    break;
                }
                Err(e) => {
                    warn!("[controls] stdin error: {}", e);
                    let _ = tx.send(Event::Shutdown).await;
                    break;
                }
            }
        }
    });
}

/// Spawns a task that sends `Event::Shutdown` on Ctrl+C.
pub fn spawn_ctrl_c(tx: mpsc::Sender<Event>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("[controls] Ctrl+C, shutting down...");
            let _ = tx.send(Event::Shutdown).await;
        }
    });
}
