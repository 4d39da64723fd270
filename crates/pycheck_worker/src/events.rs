//! Outbound event channel shared by the gateway and pass-through log sources.

use pycheck_protocol::Event;
use tokio::sync::mpsc;
use tracing::debug;

/// Sender half of the worker's ordered event stream.
pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Forward captured subprocess output as `log` events, one per non-blank line.
/// A closed channel just means nobody is listening any more.
pub fn forward_log_lines(text: &str, logs: Option<&EventSender>) {
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        debug!(target: "pycheck_worker::passthrough", "{}", line);
        if let Some(tx) = logs {
            let _ = tx.send(Event::log(line));
        }
    }
}
