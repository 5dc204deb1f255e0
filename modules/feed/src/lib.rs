// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! JSON lines telemetry feed.
//!
//! Connects to a telemetry producer over TCP. Every line carries one JSON
//! value: an object is a single record, an array is a bulk history snapshot
//! (oldest record first) that the producer sends after a connect.

use futures::StreamExt;
use module_core::{Event, EventKind, Module, ModuleCtx};
use serde_json::Value;
use std::{
    io::{self, ErrorKind},
    sync::Arc,
    time::Duration,
};
use tokio::{net::TcpStream, sync::broadcast};
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info};

mod codec;

pub use codec::FeedLineCodec;

/// Upper bound of one line, large enough for a full history snapshot.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4 * 1024 * 1024;

/// Pause between two connection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Decodes one line of the feed into an event.
///
/// Returns `None` for empty lines and for lines that are not UTF-8 encoded
/// JSON objects or arrays.
pub fn decode_line(line: &[u8]) -> Option<EventKind> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_slice::<Value>(line) {
        Ok(Value::Object(record)) => Some(EventKind::TelemetryRecordEvent(Arc::new(record))),
        Ok(Value::Array(entries)) => Some(EventKind::HistorySnapshotEvent(Arc::new(entries))),
        Ok(other) => {
            debug!("Dropping feed line, not a record: {other}");
            None
        }
        Err(e) => {
            debug!("Dropping malformed feed line. Error: {e}");
            None
        }
    }
}

struct FeedRuntime {
    address: String,
    reconnect_delay: Duration,
    max_line_length: usize,
    sender: broadcast::Sender<Event>,
}

impl FeedRuntime {
    fn publish(&self, kind: EventKind) {
        let _ = self.sender.send(Event { kind });
    }

    async fn run(self) {
        loop {
            match TcpStream::connect(self.address.as_str()).await {
                Ok(stream) => {
                    info!("Connected to telemetry feed {}", self.address);
                    self.publish(EventKind::ConnectedEvent);
                    self.read_lines(stream).await;
                    info!("Telemetry feed {} disconnected", self.address);
                    self.publish(EventKind::DisconnectedEvent);
                }
                Err(e) => {
                    debug!("Failed to connect to telemetry feed {}. Error: {e}", self.address);
                }
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn read_lines(&self, stream: TcpStream) {
        let mut framed = FramedRead::new(stream, FeedLineCodec::new(self.max_line_length));
        while let Some(result) = framed.next().await {
            match result {
                Ok(line) => {
                    if let Some(kind) = decode_line(&line) {
                        self.publish(kind);
                    }
                }
                Err(e) => {
                    error!("Telemetry feed receive error. Error: {e}");
                    break;
                }
            }
        }
    }
}

/// Delivers the records of a TCP telemetry producer onto the event bus.
///
/// Publishes [`EventKind::ConnectedEvent`] on connect and
/// [`EventKind::DisconnectedEvent`] when the connection ends, then reconnects
/// until the module is stopped.
pub struct FeedModule {
    ctx: ModuleCtx,
    address: String,
    reconnect_delay: Duration,
    max_line_length: usize,
}

impl FeedModule {
    /// Creates the feed for `address`, e.g. `127.0.0.1:5555`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidInput`] if the address has no port.
    pub fn new(ctx: ModuleCtx, address: &str) -> Result<Self, io::Error> {
        match address.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => (),
            _ => {
                return Err(io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("Feed address {address} is not of the form host:port"),
                ));
            }
        }
        Ok(FeedModule {
            ctx,
            address: address.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        })
    }

    pub fn with_reconnect_delay(mut self, reconnect_delay: Duration) -> Self {
        self.reconnect_delay = reconnect_delay;
        self
    }

    /// Lines longer than `max_line_length` bytes are skipped.
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }
}

#[async_trait::async_trait]
impl Module for FeedModule {
    async fn run(&mut self) -> Result<(), ()> {
        let runtime = FeedRuntime {
            address: self.address.clone(),
            reconnect_delay: self.reconnect_delay,
            max_line_length: self.max_line_length,
            sender: self.ctx.sender.clone(),
        };
        let feed_handle = tokio::spawn(runtime.run());
        loop {
            match self.ctx.receiver.recv().await {
                Ok(Event {
                    kind: EventKind::QuitEvent,
                }) => break,
                Ok(_) => (),
                Err(broadcast::error::RecvError::Lagged(_)) => (),
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        feed_handle.abort();
        Ok(())
    }
}
