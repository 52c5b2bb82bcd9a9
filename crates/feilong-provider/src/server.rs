//! Line-delimited JSON-RPC loop.
//!
//! Each request line is handled on its own task; responses are written in
//! completion order by a single writer task, one JSON object per line.

use crate::handler::Handler;
use crate::protocol::{Request, Response};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Serve requests read from `reader` until it closes or `shutdown` fires.
///
/// In-flight requests are awaited before returning, so every accepted
/// request gets a response. Requests still waiting for a lease observe the
/// shutdown through the handler's token and finish early.
pub async fn serve<R, W>(
    handler: Arc<Handler>,
    reader: R,
    mut writer: W,
    shutdown: CancellationToken,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();

    let writer_task = tokio::spawn(async move {
        while let Some(response) = rx.recv().await {
            let json = serde_json::to_string(&response)?;
            debug!(response = %json, "sending response");
            writer.write_all(json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<(), io::Error>(())
    });

    let mut lines = BufReader::new(reader).lines();
    let mut tasks = JoinSet::new();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => {
                info!(in_flight = tasks.len(), "shutdown requested, draining requests");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!("input closed");
            break;
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        debug!(request = %trimmed, "received request");

        match serde_json::from_str::<Request>(trimmed) {
            Ok(req) => {
                let handler = Arc::clone(&handler);
                let tx = tx.clone();
                tasks.spawn(async move {
                    let response = handler.handle(req).await;
                    // Receiver only goes away once the writer failed.
                    let _ = tx.send(response);
                });
            }
            Err(e) => {
                warn!(error = %e, "failed to parse request");
                let _ = tx.send(Response::parse_error(format!("parse error: {}", e)));
            }
        }

        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                error!(error = %e, "request task failed");
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "request task failed");
        }
    }

    drop(tx);
    writer_task.await.map_err(io::Error::other)?
}
