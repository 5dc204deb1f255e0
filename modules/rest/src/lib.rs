// SPDX-FileCopyrightText: 2026 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use async_trait::async_trait;
use module_core::{Event, EventKind, EventKindType, Module, ModuleCtx};
use rand::Rng;
use rocket::http::Status;
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr},
    sync::Arc,
    time::Duration,
};
use tokio::sync::{Mutex, broadcast::error::RecvError};
use tracing::{debug, error, info};

mod live;
mod routes;

/// Default port of the HTTP and WebSocket server.
pub const DEFAULT_PORT: u16 = 27015;

/// How long the server gets to close its connections after a quit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestConfig {
    pub address: IpAddr,
    pub port: u16,
}

impl Default for RestConfig {
    fn default() -> Self {
        RestConfig {
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
        }
    }
}

/// State shared by all route handlers.
pub(crate) struct RestCtx {
    ctx: ModuleCtx,
    module_addr: u64,
    request_id: u64,
    /// Open WebSocket connections and whether they received the initial snapshot.
    connections: HashMap<String, bool>,
}

impl RestCtx {
    fn new(ctx: ModuleCtx) -> Self {
        RestCtx {
            ctx,
            module_addr: rand::rng().random(),
            request_id: 0,
            connections: HashMap::new(),
        }
    }

    fn request_id(&mut self) -> u64 {
        self.request_id = self.request_id.wrapping_add(1);
        self.request_id
    }

    pub(crate) fn register_connection(&mut self, id: &str) {
        self.connections.insert(id.to_string(), false);
    }

    pub(crate) fn unregister_connection(&mut self, id: &str) {
        self.connections.remove(id);
    }

    pub(crate) fn set_connection_synced(&mut self, id: &str, synced: bool) {
        if let Some(entry) = self.connections.get_mut(id) {
            *entry = synced;
        }
    }

    pub(crate) fn is_connection_synced(&self, id: &str) -> bool {
        self.connections.get(id).copied().unwrap_or(false)
    }

    pub(crate) fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.ctx.receiver()
    }

    pub(crate) fn publish(&self, kind: EventKind) -> Result<(), Status> {
        self.ctx.publish_event(kind).map_err(|e| {
            error!("Failed to publish event. Error: {e}");
            Status::ServiceUnavailable
        })
    }

    /// Publishes the request built by `request` and waits for its response.
    ///
    /// The receiver is renewed first so stale events queued since the last
    /// request are not scanned.
    pub(crate) async fn request(
        &mut self,
        request: impl FnOnce(u64, u64) -> EventKind,
        response: EventKindType,
    ) -> Result<Event, Status> {
        let id = self.request_id();
        let addr = self.module_addr;
        self.ctx.receiver = self.ctx.receiver();
        self.publish(request(id, addr))?;
        debug!("Published request {id} from {addr:#x}, waiting for {response:?}");
        self.ctx
            .wait_for_event(id, addr, &response)
            .await
            .map_err(|e| {
                error!("No {response:?} received. Error: {e}");
                Status::ServiceUnavailable
            })
    }
}

/// HTTP and WebSocket read model of the live session.
pub struct Rest {
    ctx: ModuleCtx,
    config: RestConfig,
}

impl Rest {
    pub fn new(ctx: ModuleCtx, config: RestConfig) -> Self {
        Rest { ctx, config }
    }
}

#[async_trait]
impl Module for Rest {
    async fn run(&mut self) -> Result<(), ()> {
        let figment = rocket::Config::figment()
            .merge(("address", self.config.address))
            .merge(("port", self.config.port))
            .merge(("shutdown.ctrlc", false))
            .merge(("shutdown.grace", 0))
            .merge(("shutdown.mercy", 0));
        let shared = Arc::new(Mutex::new(RestCtx::new(self.ctx.clone())));
        let rocket = rocket::custom(figment)
            .manage(shared)
            .mount("/", routes::routes())
            .mount("/", rocket::routes![live::ws_live_handler])
            .ignite()
            .await
            .map_err(|e| error!("Failed to set up REST server. Error: {e}"))?;
        let shutdown = rocket.shutdown();
        let mut server = tokio::spawn(rocket.launch());
        info!(
            "REST module listening on {}:{}",
            self.config.address, self.config.port
        );

        loop {
            tokio::select! {
                event = self.ctx.receiver.recv() => match event {
                    Ok(Event { kind: EventKind::QuitEvent }) => break,
                    Ok(_) => (),
                    Err(RecvError::Lagged(_)) => (),
                    Err(RecvError::Closed) => break,
                },
                result = &mut server => {
                    match result {
                        Ok(Ok(_)) => error!("REST server stopped unexpectedly"),
                        Ok(Err(e)) => error!("REST server failed. Error: {e}"),
                        Err(e) => error!("REST server task failed. Error: {e}"),
                    }
                    return Err(());
                }
            }
        }

        shutdown.notify();
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut server)
            .await
            .is_err()
        {
            debug!("REST server did not stop in time, aborting it");
            server.abort();
        }
        info!("REST module stopped");
        Ok(())
    }
}
