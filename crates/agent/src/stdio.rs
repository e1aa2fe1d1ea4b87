//! Line-delimited JSON transport between an agent process and its
//! supervisor.
//!
//! The agent reads [`SupervisorMessage`]s from stdin and writes
//! [`AgentMessage`]s to stdout, one JSON object per line. Logs go to stderr.

use guardfleet_core::ipc::{AgentMessage, SupervisorMessage, decode_line, encode_line};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const CHANNEL_CAPACITY: usize = 64;

/// Channels wired to a reader/writer pair.
pub struct IpcBridge {
    pub inbox: mpsc::Receiver<SupervisorMessage>,
    pub outbox: mpsc::Sender<AgentMessage>,
    pub reader: JoinHandle<()>,
    pub writer: JoinHandle<()>,
}

/// Bridge the process's own stdin and stdout.
pub fn stdio_bridge() -> IpcBridge {
    bridge(tokio::io::stdin(), tokio::io::stdout())
}

/// Spawn tasks that decode lines from `reader` into the inbox and encode the
/// outbox into `writer`.
///
/// The inbox closes when `reader` reaches EOF. Malformed lines are logged
/// and skipped.
pub fn bridge<R, W>(reader: R, mut writer: W) -> IpcBridge
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (inbox_tx, inbox) = mpsc::channel(CHANNEL_CAPACITY);
    let (outbox, mut outbox_rx) = mpsc::channel::<AgentMessage>(CHANNEL_CAPACITY);

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match decode_line::<SupervisorMessage>(&line) {
                    Ok(message) => {
                        if inbox_tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, %line, "Dropping malformed supervisor message"),
                },
                Ok(None) => {
                    debug!("Supervisor pipe closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Reading supervisor pipe failed");
                    break;
                }
            }
        }
    });

    let writer = tokio::spawn(async move {
        while let Some(message) = outbox_rx.recv().await {
            let line = match encode_line(&message) {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Encoding agent message failed");
                    continue;
                }
            };
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                warn!(error = %e, "Writing to supervisor failed");
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    IpcBridge {
        inbox,
        outbox,
        reader,
        writer,
    }
}
