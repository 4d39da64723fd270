//! Worker protocol gateway
//!
//! Design principles:
//! - Requests are decoded once, here, into the closed `Request` enum
//! - One FIFO, one dedicated thread: a request is handled to completion
//!   before the next one is received, so the engine never sees overlap
//! - Every failure becomes exactly one `error` event; the loop keeps going

use pycheck_protocol::defaults::{ENGINE_ALREADY_WARM_MESSAGE, ENGINE_IMPORTED_MESSAGE};
use pycheck_protocol::{Event, Request};
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::EngineError;
use crate::events::EventSender;
use crate::session::EngineSession;

/// One queued unit of work
#[derive(Debug)]
pub enum Inbound {
    /// Raw wire line, decoded by the gateway thread
    Line(String),
    /// Already-typed request (in-process callers)
    Request(Request),
}

/// Dispatches requests to the session and emits events.
pub struct Gateway {
    session: EngineSession,
    events: EventSender,
    default_engine_version: String,
}

impl Gateway {
    pub fn new(session: EngineSession, events: EventSender, default_engine_version: impl Into<String>) -> Self {
        Self {
            session,
            events,
            default_engine_version: default_engine_version.into(),
        }
    }

    pub fn session(&self) -> &EngineSession {
        &self.session
    }

    pub fn handle_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Line(line) => self.handle_line(&line),
            Inbound::Request(request) => self.handle(request),
        }
    }

    /// Decode and handle one wire line. Undecodable input is reported as an
    /// `error` event like any other failure.
    pub fn handle_line(&mut self, line: &str) {
        match Request::decode(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!("Rejected message: {}", e);
                self.emit(Event::error(e.to_string()));
            }
        }
    }

    /// Handle one request to completion.
    pub fn handle(&mut self, request: Request) {
        let kind = request.kind();
        debug!("Handling '{}'", kind);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(request)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("'{}' failed: {}", kind, e);
                self.emit(Event::error(e.to_string()));
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("'{}' panicked: {}", kind, message);
                self.emit(Event::error(format!("internal error while handling '{}': {}", kind, message)));
            }
        }
    }

    fn dispatch(&mut self, request: Request) -> Result<(), EngineError> {
        match request {
            Request::Init(payload) => {
                // A blank version means "use the default", same as an absent one
                let requested = payload
                    .engine_version
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| self.default_engine_version.clone());
                let versions = self.session.initialize(&requested)?;
                self.emit(Event::init_done(versions));
            }
            Request::Warmup => {
                let message = if self.session.warm_up()? {
                    ENGINE_IMPORTED_MESSAGE
                } else {
                    ENGINE_ALREADY_WARM_MESSAGE
                };
                self.emit(Event::log(message));
            }
            Request::Check(check) => {
                let events = self.events.clone();
                let result = self.session.run_check(&check, move || {
                    let _ = events.send(Event::Checking);
                })?;
                self.emit(Event::Result(result));
            }
        }
        Ok(())
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle for feeding a running gateway.
pub struct WorkerHandle {
    requests: mpsc::UnboundedSender<Inbound>,
    join_handle: thread::JoinHandle<()>,
}

impl WorkerHandle {
    /// Queue a raw wire line.
    pub fn send_line(&self, line: impl Into<String>) -> anyhow::Result<()> {
        self.requests
            .send(Inbound::Line(line.into()))
            .map_err(|_| anyhow::anyhow!("gateway thread has stopped"))
    }

    /// Queue a typed request.
    pub fn send(&self, request: Request) -> anyhow::Result<()> {
        self.requests
            .send(Inbound::Request(request))
            .map_err(|_| anyhow::anyhow!("gateway thread has stopped"))
    }

    /// Close the queue, let pending requests finish, and join the thread.
    pub fn shutdown(self) -> anyhow::Result<()> {
        drop(self.requests);
        self.join_handle
            .join()
            .map_err(|_| anyhow::anyhow!("gateway thread panicked"))
    }
}

/// Run `gateway` on a dedicated thread fed by an in-memory FIFO.
pub fn spawn_gateway(mut gateway: Gateway) -> std::io::Result<WorkerHandle> {
    let (requests, mut rx) = mpsc::unbounded_channel::<Inbound>();

    let join_handle = thread::Builder::new()
        .name("pycheck-engine".to_string())
        .spawn(move || {
            info!("Gateway ready");
            while let Some(inbound) = rx.blocking_recv() {
                gateway.handle_inbound(inbound);
            }
            info!("Gateway stopped");
        })?;

    Ok(WorkerHandle {
        requests,
        join_handle,
    })
}
