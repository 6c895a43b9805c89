//! Line-delimited JSON transport.
//!
//! Each input line is a [`RequestEnvelope`]. Replies and host events are
//! written as one JSON object per line. Requests run concurrently, so
//! replies may arrive out of order and carry the request `id`.

use std::sync::Arc;

use gifcap_common::error::GifcapResult;
use gifcap_model::{HostResponse, RequestEnvelope, ResponseEnvelope};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, mpsc};

use crate::host::Host;

/// Serve requests from `reader` until it reaches end of input.
pub async fn serve<R, W>(host: Arc<Host>, reader: R, writer: W) -> GifcapResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(write_lines(writer, out_rx));

    let mut events = host.subscribe();
    let event_tx = out_tx.clone();
    let event_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => {
                        if event_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to encode event"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let mut lines = reader.lines();
    let mut in_flight = Vec::new();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let envelope = match serde_json::from_str::<RequestEnvelope>(line) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed request");
                let reply = ResponseEnvelope {
                    id: None,
                    response: HostResponse::failure(format!("malformed request: {e}")),
                };
                send_json(&out_tx, &reply);
                continue;
            }
        };

        let host = host.clone();
        let out_tx = out_tx.clone();
        in_flight.push(tokio::spawn(async move {
            let id = envelope.id;
            if let Some(response) = host.handle(envelope.request).await {
                send_json(&out_tx, &ResponseEnvelope { id, response });
            }
        }));
        in_flight.retain(|task| !task.is_finished());
    }

    tracing::debug!("Request stream closed");
    for task in in_flight {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Request task failed");
        }
    }
    event_task.abort();
    drop(out_tx);
    if let Err(e) = writer_task.await {
        tracing::warn!(error = %e, "Writer task failed");
    }
    Ok(())
}

fn send_json<T: serde::Serialize>(out: &mpsc::UnboundedSender<String>, value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => {
            let _ = out.send(line);
        }
        Err(e) => tracing::warn!(error = %e, "Failed to encode reply"),
    }
}

async fn write_lines<W>(mut writer: W, mut lines: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(mut line) = lines.recv().await {
        line.push('\n');
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            tracing::warn!(error = %e, "Failed to write reply");
            break;
        }
        if let Err(e) = writer.flush().await {
            tracing::warn!(error = %e, "Failed to flush reply");
            break;
        }
    }
}
