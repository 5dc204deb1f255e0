use crate::{Event, EventBus, EventKind, EventKindType, ModuleCtx};
use std::{
    collections::HashMap,
    io::ErrorKind,
    sync::{LazyLock, RwLock},
    time::Duration,
};
use tokio::{sync::broadcast, task::JoinHandle, time::timeout};
use tracing::{debug, error};

/// Sends a [`QuitEvent`](EventKind::QuitEvent) and waits for the module task to stop.
///
/// # Panics
///
/// Panics if the module does not stop within 100 ms or returns `Err(())`.
pub async fn stop_module(event_bus: &EventBus, handle: &mut JoinHandle<Result<(), ()>>) {
    event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });
    timeout(Duration::from_millis(100), handle)
        .await
        .expect("Module doesn't handle quit event in timeout")
        .expect("Module task panicked")
        .expect("Module returned an error");
}

/// Waits until an event of type `exp_event` is received on `rx`.
///
/// Events of other types are skipped. The receive is split into ten steps so a
/// lagging receiver does not block the whole duration.
///
/// # Panics
///
/// Panics if no matching event arrives within `duration`.
pub async fn wait_for_event(
    rx: &mut broadcast::Receiver<Event>,
    duration: Duration,
    exp_event: EventKindType,
) -> Event {
    let deadline = tokio::time::Instant::now() + duration;
    while tokio::time::Instant::now() < deadline {
        if let Ok(Ok(event)) = timeout(duration / 10, rx.recv()).await
            && event.event_type() == exp_event
        {
            return event;
        }
    }
    panic!("Failed to receive event of type {:?}", exp_event);
}

/// Asserts that no event of type `unexp_event` arrives on `rx` within `duration`.
///
/// # Panics
///
/// Panics if such an event is received.
pub async fn assert_no_event(
    rx: &mut broadcast::Receiver<Event>,
    duration: Duration,
    unexp_event: EventKindType,
) {
    let deadline = tokio::time::Instant::now() + duration;
    while let Ok(Ok(event)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        assert_ne!(
            event.event_type(),
            unexp_event,
            "Unexpected event received: {:?}",
            event
        );
    }
}

static RESPONSE_HANDLERS_CACHE: LazyLock<RwLock<HashMap<(usize, EventKindType), ResponseHandler>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Registers a handler that answers every request of `request_type` on the bus
/// of `ctx` with `response_event`.
///
/// # Errors
///
/// Returns [`ErrorKind::AlreadyExists`] if a handler for the request type is
/// already registered on this bus.
pub fn register_response_event(
    request_type: EventKindType,
    response_event: Event,
    ctx: ModuleCtx,
) -> Result<(), std::io::Error> {
    let key = (ctx.bus_id(), request_type);
    let mut cache = RESPONSE_HANDLERS_CACHE
        .write()
        .unwrap_or_else(|e| e.into_inner());
    if cache.contains_key(&key) {
        error!("Response handler for {:?} already registered", key);
        return Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("Response handler for request type {request_type:?} already exists"),
        ));
    }
    cache.insert(key, ResponseHandler::new(ctx, request_type, response_event));
    debug!("Registered response handler for request type {request_type:?}");
    Ok(())
}

/// Removes a handler registered with [`register_response_event`] and stops its task.
pub fn unregister_response_event(bus_id: usize, request_type: &EventKindType) {
    let mut cache = RESPONSE_HANDLERS_CACHE
        .write()
        .unwrap_or_else(|e| e.into_inner());
    if cache.remove(&(bus_id, *request_type)).is_some() {
        debug!("Unregistered response handler for request type {request_type:?}");
    }
}

/// Answers requests of one type with a fixed response event.
///
/// The background task is aborted when the handler is dropped.
#[derive(Debug)]
pub struct ResponseHandler {
    handle: JoinHandle<()>,
}

impl ResponseHandler {
    pub fn new(mut ctx: ModuleCtx, request_type: EventKindType, response_event: Event) -> Self {
        let handle = tokio::spawn(async move {
            loop {
                match ctx.receiver.recv().await {
                    Ok(event) if event.event_type() == request_type => {
                        debug!("ResponseHandler answers {request_type:?}");
                        let _ = ctx.sender.send(response_event.clone());
                    }
                    Ok(_) => (),
                    Err(broadcast::error::RecvError::Lagged(_)) => (),
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        ResponseHandler { handle }
    }
}

impl Drop for ResponseHandler {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
