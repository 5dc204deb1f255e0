// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use algorithm::LapDetectorConfig;
use async_trait::async_trait;
use common::clock::{Clock, SystemClock};
use module_core::{
    ArmStartFinishRequestPtr, ChartRequestPtr, EmptyRequestPtr, EventKind, HistorySnapshotPtr,
    Module, ModuleCtx, RawRecordPtr, Response,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info};

mod session;

pub use session::{Admitted, TelemetrySession};

/// The single owner of the live telemetry state.
///
/// Consumes records, history snapshots and operator requests from the bus,
/// one event at a time, and answers read requests with copies of the state.
pub struct LiveSession<C: Clock = SystemClock> {
    ctx: ModuleCtx,
    clock: C,
    session: TelemetrySession,
}

impl LiveSession<SystemClock> {
    /// Creates a live session using the wall clock for records without timestamp.
    pub fn new(ctx: ModuleCtx, config: LapDetectorConfig) -> Self {
        LiveSession::new_with_clock(ctx, config, SystemClock::new())
    }
}

impl<C: Clock> LiveSession<C> {
    pub fn new_with_clock(ctx: ModuleCtx, config: LapDetectorConfig, clock: C) -> Self {
        LiveSession {
            ctx,
            clock,
            session: TelemetrySession::new(config),
        }
    }

    fn on_record(&mut self, record: RawRecordPtr) {
        let admitted = self.session.on_record(&record, self.clock.now_ms());
        let _ = self
            .ctx
            .publish_event(EventKind::SampleProcessedEvent(Arc::new(admitted.sample)));
        if let Some(lap) = admitted.lap {
            let _ = self
                .ctx
                .publish_event(EventKind::LapCompletedEvent(Arc::new(lap)));
        }
    }

    fn on_history(&mut self, snapshot: HistorySnapshotPtr) {
        match self.session.on_history(&snapshot) {
            Ok(Some(baseline)) => info!(
                "Live session continues from history: lap {}, {:.1} m",
                baseline.lap_session.lap_count,
                baseline.total_distance()
            ),
            Ok(None) => info!("Empty history snapshot received"),
            Err(e) => error!("History snapshot rejected. Error: {e}"),
        }
    }

    fn on_arm(&mut self, request: ArmStartFinishRequestPtr) {
        let line = self.session.arm(&request.data, self.clock.now_ms());
        let _ = self
            .ctx
            .publish_event(EventKind::ArmStartFinishResponseEvent(Response::reply(
                &request, line,
            )));
    }

    fn on_snapshot_request(&self, request: EmptyRequestPtr) {
        let snapshot = Arc::new(self.session.snapshot(self.clock.now_ms()));
        let _ = self
            .ctx
            .publish_event(EventKind::TelemetrySnapshotResponseEvent(Response::reply(
                &request, snapshot,
            )));
    }

    fn on_chart_request(&self, request: ChartRequestPtr) {
        let chart = Arc::new(self.session.chart(&request.data));
        let _ = self
            .ctx
            .publish_event(EventKind::ChartResponseEvent(Response::reply(
                &request, chart,
            )));
    }

    fn on_history_request(&self, request: EmptyRequestPtr) {
        let history = Arc::new(self.session.history());
        let _ = self
            .ctx
            .publish_event(EventKind::SessionHistoryResponseEvent(Response::reply(
                &request, history,
            )));
    }
}

#[async_trait]
impl<C: Clock + Send> Module for LiveSession<C> {
    async fn run(&mut self) -> std::result::Result<(), ()> {
        info!("Live session started");
        loop {
            let event = match self.ctx.receiver.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    error!("Live session lagged behind, {skipped} events lost");
                    continue;
                }
                Err(RecvError::Closed) => {
                    error!("Event bus closed, stopping live session");
                    break;
                }
            };
            match event.kind {
                EventKind::QuitEvent => break,
                EventKind::ConnectedEvent => {
                    info!("Telemetry source connected");
                    self.session.on_connected();
                }
                EventKind::DisconnectedEvent => {
                    info!("Telemetry source disconnected, discarding live state");
                    self.session.on_disconnected();
                }
                EventKind::ResetEvent => {
                    info!("Live state reset");
                    self.session.reset();
                }
                EventKind::TelemetryRecordEvent(record) => self.on_record(record),
                EventKind::HistorySnapshotEvent(snapshot) => self.on_history(snapshot),
                EventKind::ArmStartFinishRequestEvent(request) => self.on_arm(request),
                EventKind::ClearStartFinishEvent => self.session.clear_start_finish(),
                EventKind::TelemetrySnapshotRequestEvent(request) => {
                    debug!("Telemetry snapshot requested by {}", request.sender_addr);
                    self.on_snapshot_request(request);
                }
                EventKind::ChartRequestEvent(request) => self.on_chart_request(request),
                EventKind::SessionHistoryRequestEvent(request) => self.on_history_request(request),
                _ => (),
            }
        }
        info!("Live session stopped");
        Ok(())
    }
}
