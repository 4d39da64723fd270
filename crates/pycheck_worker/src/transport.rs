//! Newline-delimited JSON over stdin/stdout.
//!
//! stdin lines go straight into the gateway queue (decoding happens on the
//! gateway thread so that rejections stay in arrival order). Events are
//! written to stdout one per line, flushed after each.

use anyhow::{Context, Result};
use pycheck_protocol::Event;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::events::EventReceiver;
use crate::gateway::WorkerHandle;

/// Serve the worker protocol on the process's stdio until stdin closes and
/// every queued request has been answered.
pub async fn serve_stdio(handle: WorkerHandle, events: EventReceiver) -> Result<()> {
    serve(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        handle,
        events,
    )
    .await
}

/// Transport loop over arbitrary async streams.
pub async fn serve<R, W>(input: R, output: W, handle: WorkerHandle, events: EventReceiver) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let writer = tokio::spawn(write_events(events, output));

    let mut lines = input.lines();
    let mut received = 0usize;
    while let Some(line) = lines.next_line().await.context("Failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }
        received += 1;
        handle.send_line(line)?;
    }
    info!("Input closed after {} requests, draining queue", received);

    tokio::task::spawn_blocking(move || handle.shutdown())
        .await
        .context("Gateway shutdown task failed")??;

    let written = writer.await.context("Event writer task failed")??;
    debug!("Wrote {} events", written);
    Ok(())
}

/// Write events until every sender is gone. Returns the number written.
pub async fn write_events<W>(mut events: EventReceiver, mut output: W) -> Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    let mut answered = 0usize;
    while let Some(event) = events.recv().await {
        write_event(&mut output, &event).await?;
        written += 1;
        if event.is_terminal() {
            answered += 1;
            debug!("Answered request #{} with '{}'", answered, event.kind());
        }
    }
    output.flush().await?;
    Ok(written)
}

async fn write_event<W>(output: &mut W, event: &Event) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = event.encode()?;
    line.push('\n');
    output
        .write_all(line.as_bytes())
        .await
        .context("Failed to write event")?;
    output.flush().await.context("Failed to flush event")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_channel;

    #[tokio::test]
    async fn test_write_events_one_line_each() {
        let (tx, rx) = event_channel();
        tx.send(Event::Checking).unwrap();
        tx.send(Event::error("boom")).unwrap();
        drop(tx);

        let mut buffer: Vec<u8> = Vec::new();
        let written = write_events(rx, &mut buffer).await.unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first["type"], "checking");
        assert_eq!(second["payload"]["message"], "boom");
    }
}
