use common::{
    lap::{ArmStartFinish, LapCompleted, StartFinishLine},
    sample::{RawRecord, TelemetrySample},
    serde::{millis, optional_millis},
};
use serde::Serialize;
use std::{
    io::{Error, ErrorKind},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use strum_macros::EnumDiscriminants;
use telemetry_store::{
    chart::{ChartData, ChartView},
    store::RollingTelemetryStore,
};
use tokio::sync::broadcast;
use tracing::{debug, error};

/// Represents a high-level event in the system.
///
/// Each `Event` wraps an [`EventKind`], which defines the actual type
/// and data carried by the event.
///
/// This structure is designed to be passed through an [`EventBus`]
/// between asynchronous modules.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    /// The inner event type and associated data.
    pub kind: EventKind,
}

impl Event {
    /// Returns the discriminant of the carried [`EventKind`].
    pub fn event_type(&self) -> EventKindType {
        EventKindType::from(&self.kind)
    }
}

/// A request addressed to whichever module answers it.
///
/// `id` and `sender_addr` are copied into the [`Response`] so the requester can
/// pick its answer from the bus.
#[derive(Clone, Debug, PartialEq)]
pub struct Request<T> {
    pub id: u64,
    pub sender_addr: u64,
    pub data: T,
}

impl Request<()> {
    /// Creates a request without payload.
    pub fn empty_request(id: u64, sender_addr: u64) -> Arc<Self> {
        Arc::new(Request {
            id,
            sender_addr,
            data: (),
        })
    }
}

/// The answer to a [`Request`].
#[derive(Clone, Debug, PartialEq)]
pub struct Response<T> {
    pub id: u64,
    pub receiver_addr: u64,
    pub data: T,
}

impl<T> Response<T> {
    pub fn new(id: u64, receiver_addr: u64, data: T) -> Arc<Self> {
        Arc::new(Response {
            id,
            receiver_addr,
            data,
        })
    }

    /// Creates the response for `request`.
    pub fn reply<R>(request: &Request<R>, data: T) -> Arc<Self> {
        Response::new(request.id, request.sender_addr, data)
    }
}

/// The read model of the live session at one instant.
///
/// Taken between two events, so the store, the lap fields and the latest
/// sample always belong together.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LiveTelemetry {
    pub connected: bool,
    pub lap_count: u32,
    #[serde(with = "millis")]
    pub current_lap_time: Duration,
    #[serde(with = "optional_millis")]
    pub last_lap_time: Option<Duration>,
    #[serde(with = "optional_millis")]
    pub best_lap_time: Option<Duration>,
    pub total_distance: f64,
    pub lap_distance: f64,
    pub start_finish: Option<StartFinishLine>,
    pub latest: Option<TelemetrySample>,
    pub store: RollingTelemetryStore,
}

/// A raw telemetry record as decoded from the transport.
pub type RawRecordPtr = Arc<RawRecord>;

/// An ordered bulk history snapshot, oldest entry first.
pub type HistorySnapshotPtr = Arc<Vec<serde_json::Value>>;

/// A validated sample enriched with the derived distance and lap fields.
pub type TelemetrySamplePtr = Arc<TelemetrySample>;

pub type LapCompletedPtr = Arc<LapCompleted>;

pub type EmptyRequestPtr = Arc<Request<()>>;

pub type ArmStartFinishRequestPtr = Arc<Request<ArmStartFinish>>;

/// `None` if the line could not be armed because no fix is known yet.
pub type ArmStartFinishResponsePtr = Arc<Response<Option<StartFinishLine>>>;

pub type TelemetrySnapshotResponsePtr = Arc<Response<Arc<LiveTelemetry>>>;

pub type ChartRequestPtr = Arc<Request<ChartView>>;

pub type ChartResponsePtr = Arc<Response<Arc<ChartData>>>;

pub type SessionHistoryResponsePtr = Arc<Response<Arc<Vec<TelemetrySample>>>>;

/// Enumerates the different kinds of events that can be emitted
/// and transmitted via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(EventKindType), derive(Hash))]
pub enum EventKind {
    /// Indicates that a module shall terminate.
    QuitEvent,

    /// The telemetry transport is connected. A history snapshot may follow.
    ConnectedEvent,

    /// The telemetry transport lost its connection. Live state is discarded.
    DisconnectedEvent,

    /// Explicit operator reset of the live buffers and the lap session.
    ResetEvent,

    /// One raw record from the transport.
    TelemetryRecordEvent(RawRecordPtr),

    /// A bulk history snapshot delivered on (re)connect.
    HistorySnapshotEvent(HistorySnapshotPtr),

    /// A record was admitted and appended to the store.
    SampleProcessedEvent(TelemetrySamplePtr),

    /// A lap was completed by the lap detector.
    LapCompletedEvent(LapCompletedPtr),

    ArmStartFinishRequestEvent(ArmStartFinishRequestPtr),
    ArmStartFinishResponseEvent(ArmStartFinishResponsePtr),

    /// Removes the start/finish line.
    ClearStartFinishEvent,

    TelemetrySnapshotRequestEvent(EmptyRequestPtr),
    TelemetrySnapshotResponseEvent(TelemetrySnapshotResponsePtr),

    ChartRequestEvent(ChartRequestPtr),
    ChartResponseEvent(ChartResponsePtr),

    SessionHistoryRequestEvent(EmptyRequestPtr),
    SessionHistoryResponseEvent(SessionHistoryResponsePtr),
}

impl EventKind {
    /// Returns `(id, receiver_addr)` if the event is a response.
    pub fn response_address(&self) -> Option<(u64, u64)> {
        match self {
            EventKind::ArmStartFinishResponseEvent(r) => Some((r.id, r.receiver_addr)),
            EventKind::TelemetrySnapshotResponseEvent(r) => Some((r.id, r.receiver_addr)),
            EventKind::ChartResponseEvent(r) => Some((r.id, r.receiver_addr)),
            EventKind::SessionHistoryResponseEvent(r) => Some((r.id, r.receiver_addr)),
            _ => None,
        }
    }
}

/// Returns a reference to the payload of an [`EventKind`] variant.
///
/// Evaluates to `Some(&payload)` if `$kind` is `$variant(payload)` and to `None`
/// otherwise.
#[macro_export]
macro_rules! payload_ref {
    ($kind:expr, $variant:path) => {
        match &$kind {
            $variant(payload) => Some(payload),
            _ => None,
        }
    };
}

static NEXT_BUS_ID: AtomicUsize = AtomicUsize::new(0);

/// A simple asynchronous event bus for publishing and subscribing to [`Event`]s.
///
/// The event bus uses a [`tokio::sync::broadcast::channel`] under the hood,
/// allowing multiple receivers to listen for the same stream of events.
///
/// Each published event is cloned and distributed to all active subscribers.
/// If no subscribers exist at the time of publication, the event is discarded silently.
pub struct EventBus {
    /// The broadcast sender used internally to distribute events.
    sender: broadcast::Sender<Event>,
    id: usize,
}

impl EventBus {
    /// Creates a new [`EventBus`] with a fixed buffer capacity of 1024 messages.
    ///
    /// When the buffer is full, the oldest messages are dropped automatically
    /// as new ones are published.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        EventBus {
            sender,
            id: NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Subscribes to the event bus. The receiver gets all events published
    /// after the subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Publishes an [`Event`] to all active subscribers.
    pub fn publish(&self, event: &Event) {
        let _ = self.sender.send(event.clone());
    }

    /// Creates a [`ModuleCtx`] bound to this [`EventBus`].
    pub fn context(&self) -> ModuleCtx {
        ModuleCtx::new(self)
    }

    /// Process wide unique id of this bus.
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Defines the common interface for an asynchronous module
/// that can be executed and communicate via the [`EventBus`].
#[async_trait::async_trait]
pub trait Module {
    /// Runs the module asynchronously until completion.
    ///
    /// This function typically contains the module's main event loop,
    /// reacting to messages received through the [`ModuleCtx`].
    async fn run(&mut self) -> Result<(), ()>;
}

/// How long [`ModuleCtx::wait_for_event`] waits for a response.
pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Provides a module-scoped context for interacting with the [`EventBus`].
///
/// Each `ModuleCtx` owns both a sender and a receiver, allowing the module
/// to both publish and listen for events concurrently.
pub struct ModuleCtx {
    /// The broadcast sender used to publish events.
    pub sender: broadcast::Sender<Event>,

    /// The broadcast receiver used to listen for events.
    pub receiver: broadcast::Receiver<Event>,

    bus_id: usize,
}

/// A clone gets a fresh receiver that starts at the current position of the bus.
impl Clone for ModuleCtx {
    fn clone(&self) -> Self {
        ModuleCtx {
            sender: self.sender.clone(),
            receiver: self.receiver.resubscribe(),
            bus_id: self.bus_id,
        }
    }
}

impl ModuleCtx {
    /// Constructs a new [`ModuleCtx`] from the given [`EventBus`].
    pub fn new(event_bus: &EventBus) -> Self {
        ModuleCtx {
            sender: event_bus.sender.clone(),
            receiver: event_bus.subscribe(),
            bus_id: event_bus.id,
        }
    }

    pub fn bus_id(&self) -> usize {
        self.bus_id
    }

    /// Returns a new receiver that starts at the current position of the context receiver.
    pub fn receiver(&self) -> broadcast::Receiver<Event> {
        self.receiver.resubscribe()
    }

    /// Publishes an event of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NotConnected`] if nobody listens on the bus.
    pub fn publish_event(&self, kind: EventKind) -> Result<(), Error> {
        self.sender
            .send(Event { kind })
            .map(|_| ())
            .map_err(|e| Error::new(ErrorKind::NotConnected, e.to_string()))
    }

    /// Waits for the response of type `exp_event` addressed to `addr` with
    /// request id `id`. Other events received meanwhile are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::TimedOut`] if no response arrived within
    /// [`RESPONSE_TIMEOUT`] and [`ErrorKind::BrokenPipe`] if the bus is closed.
    pub async fn wait_for_event(
        &mut self,
        id: u64,
        addr: u64,
        exp_event: &EventKindType,
    ) -> Result<Event, Error> {
        let deadline = tokio::time::Instant::now() + RESPONSE_TIMEOUT;
        loop {
            let event = match tokio::time::timeout_at(deadline, self.receiver.recv()).await {
                Ok(Ok(event)) => event,
                Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    debug!("Skipped {skipped} events while waiting for {exp_event:?}");
                    continue;
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    error!("Event bus closed while waiting for {exp_event:?}");
                    return Err(Error::new(ErrorKind::BrokenPipe, "event bus closed"));
                }
                Err(_) => {
                    return Err(Error::new(
                        ErrorKind::TimedOut,
                        format!("no {exp_event:?} for request {id} in time"),
                    ));
                }
            };
            if event.event_type() == *exp_event && event.kind.response_address() == Some((id, addr))
            {
                return Ok(event);
            }
        }
    }
}

pub mod test_helper;
