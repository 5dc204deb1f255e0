use crate::RestCtx;
use common::{channel::Channel, lap::ArmStartFinish, position::Position};
use module_core::{EventKind, EventKindType, Request, payload_ref};
use rocket::{
    Route, State, delete, get,
    http::Status,
    post,
    response::content::RawJson,
    routes,
    serde::json::Json,
};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, sync::Arc};
use telemetry_store::chart::{ChartView, XAxis};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

type SharedCtx = State<Arc<Mutex<RestCtx>>>;

/// Optional body of `POST /v1/start_finish`.
///
/// Without a coordinate the line is armed at the latest position of the vehicle.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StartFinishBody {
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius_m: Option<f64>,
}

impl From<StartFinishBody> for ArmStartFinish {
    fn from(body: StartFinishBody) -> Self {
        let position = match (body.latitude, body.longitude) {
            (Some(latitude), Some(longitude)) => Some(Position {
                latitude,
                longitude,
            }),
            _ => None,
        };
        ArmStartFinish {
            position,
            radius_m: body.radius_m,
        }
    }
}

pub(crate) fn routes() -> Vec<Route> {
    routes![
        get_telemetry,
        get_chart,
        get_session_history,
        post_start_finish,
        post_start_finish_at_vehicle,
        delete_start_finish
    ]
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<RawJson<String>, Status> {
    serde_json::to_string(value).map(RawJson).map_err(|e| {
        error!("Failed to serialize response: {e}");
        Status::InternalServerError
    })
}

/// Route: GET /v1/telemetry
///
/// Snapshot of the live session: rolling buffers, path, lap status and the
/// latest enriched sample.
#[get("/v1/telemetry")]
pub(crate) async fn get_telemetry(ctx: &SharedCtx) -> Result<RawJson<String>, Status> {
    let event = ctx
        .lock()
        .await
        .request(
            |id, addr| {
                EventKind::TelemetrySnapshotRequestEvent(Request::empty_request(id, addr))
            },
            EventKindType::TelemetrySnapshotResponseEvent,
        )
        .await?;
    match payload_ref!(event.kind, EventKind::TelemetrySnapshotResponseEvent) {
        Some(response) => to_json(response.data.as_ref()),
        None => Err(Status::InternalServerError),
    }
}

/// Route: GET /v1/chart?x=<time|distance|channel>&y=<channel>...
///
/// `x` defaults to time. Unknown axis or channel names are rejected with 400.
#[get("/v1/chart?<x>&<y>")]
pub(crate) async fn get_chart(
    ctx: &SharedCtx,
    x: Option<&str>,
    y: Vec<&str>,
) -> Result<RawJson<String>, Status> {
    let x = match x {
        Some(x) => XAxis::from_str(x).map_err(|_| {
            warn!("Chart request with unknown x axis {x}");
            Status::BadRequest
        })?,
        None => XAxis::Time,
    };
    let channels = y
        .iter()
        .map(|name| {
            Channel::from_str(name).map_err(|_| {
                warn!("Chart request with unknown channel {name}");
                Status::BadRequest
            })
        })
        .collect::<Result<Vec<_>, Status>>()?;
    let view = ChartView::new(x, channels);

    let event = ctx
        .lock()
        .await
        .request(
            |id, addr| {
                EventKind::ChartRequestEvent(Arc::new(Request {
                    id,
                    sender_addr: addr,
                    data: view,
                }))
            },
            EventKindType::ChartResponseEvent,
        )
        .await?;
    match payload_ref!(event.kind, EventKind::ChartResponseEvent) {
        Some(response) => to_json(response.data.as_ref()),
        None => Err(Status::InternalServerError),
    }
}

/// Route: GET /v1/session/history
///
/// The recent enriched samples, oldest first.
#[get("/v1/session/history")]
pub(crate) async fn get_session_history(ctx: &SharedCtx) -> Result<RawJson<String>, Status> {
    let event = ctx
        .lock()
        .await
        .request(
            |id, addr| EventKind::SessionHistoryRequestEvent(Request::empty_request(id, addr)),
            EventKindType::SessionHistoryResponseEvent,
        )
        .await?;
    match payload_ref!(event.kind, EventKind::SessionHistoryResponseEvent) {
        Some(response) => to_json(response.data.as_slice()),
        None => Err(Status::InternalServerError),
    }
}

async fn arm_start_finish(
    ctx: &SharedCtx,
    arm: ArmStartFinish,
) -> Result<RawJson<String>, Status> {
    let event = ctx
        .lock()
        .await
        .request(
            |id, addr| {
                EventKind::ArmStartFinishRequestEvent(Arc::new(Request {
                    id,
                    sender_addr: addr,
                    data: arm,
                }))
            },
            EventKindType::ArmStartFinishResponseEvent,
        )
        .await?;
    match payload_ref!(event.kind, EventKind::ArmStartFinishResponseEvent) {
        Some(response) => match &response.data {
            Some(line) => {
                info!("Start/finish line armed at {:?}", line.position);
                to_json(line)
            }
            None => Err(Status::Conflict),
        },
        None => Err(Status::InternalServerError),
    }
}

/// Route: POST /v1/start_finish
///
/// Arms the start/finish line and answers with the armed line. Answers 409 if
/// no coordinate is given and the vehicle position is not known yet.
#[post("/v1/start_finish", format = "json", data = "<body>")]
pub(crate) async fn post_start_finish(
    ctx: &SharedCtx,
    body: Option<Json<StartFinishBody>>,
) -> Result<RawJson<String>, Status> {
    let body = body.map(Json::into_inner).unwrap_or_default();
    arm_start_finish(ctx, body.into()).await
}

/// Same as [`post_start_finish`] for requests without JSON body.
#[post("/v1/start_finish", rank = 2)]
pub(crate) async fn post_start_finish_at_vehicle(
    ctx: &SharedCtx,
) -> Result<RawJson<String>, Status> {
    arm_start_finish(ctx, ArmStartFinish::at_vehicle()).await
}

/// Route: DELETE /v1/start_finish
#[delete("/v1/start_finish")]
pub(crate) async fn delete_start_finish(ctx: &SharedCtx) -> Status {
    match ctx
        .lock()
        .await
        .publish(EventKind::ClearStartFinishEvent)
    {
        Ok(()) => {
            info!("Start/finish line cleared");
            Status::NoContent
        }
        Err(status) => status,
    }
}
