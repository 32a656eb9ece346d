use std::convert::Infallible;
use std::sync::Arc;

use serde::Serialize;
use warp::http::{HeaderMap, StatusCode};
use warp::path::{self, param};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::error::RaffleError;
use crate::rooms::RoomRegistry;

/// Header carrying the target room on `/api/put`
pub const ROOM_ID_HEADER: &str = "roomID";

/// Header carrying the entry text on `/api/put`, percent-encoded UTF-8
pub const ENTRY_HEADER: &str = "entry";

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    rooms: usize,
}

/// `GET|POST /api/create`: new room, redirect to its add page
pub fn create_room_route(
    registry: Arc<RoomRegistry>,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "create")
        .and(warp::get().or(warp::post()).unify())
        .and(with_registry(registry))
        .and_then(handle_create_room)
}

/// `POST /api/put` with the room id and entry in headers
pub fn put_entry_route(
    registry: Arc<RoomRegistry>,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("api" / "put")
        .and(warp::post())
        .and(warp::header::headers_cloned())
        .and(with_registry(registry))
        .and_then(handle_put_entry)
}

/// `GET /api/count/{room_id}`
pub fn count_route(
    registry: Arc<RoomRegistry>,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    api_room_path("count")
        .and(warp::get())
        .and(with_registry(registry))
        .and_then(handle_count)
}

/// `GET /api/draw/{room_id}`
pub fn draw_route(
    registry: Arc<RoomRegistry>,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    api_room_path("draw")
        .and(warp::get())
        .and(with_registry(registry))
        .and_then(handle_draw)
}

/// `/api/{action}/{room_id}`. A missing or empty id extracts as `""` so the
/// handler answers it like any other unknown room.
fn api_room_path(
    action: &'static str,
) -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    let base = warp::path("api").and(warp::path(action));

    base.clone()
        .and(param::<String>())
        .and(path::end())
        .or(base.and(path::end()).map(String::new))
        .unify()
}

pub fn health_route(
    registry: Arc<RoomRegistry>,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("health")
        .and(warp::get())
        .and(with_registry(registry))
        .and_then(|registry: Arc<RoomRegistry>| async move {
            let report = HealthReport {
                status: "healthy",
                service: "Raffle Server",
                version: env!("CARGO_PKG_VERSION"),
                rooms: registry.room_count().await,
            };
            Ok::<_, Infallible>(warp::reply::json(&report))
        })
}

async fn handle_create_room(registry: Arc<RoomRegistry>) -> Result<Response, Infallible> {
    match registry.create_room().await {
        Ok(room_id) => Ok(redirect_to(format!("/add/{}", room_id))),
        Err(e) => Ok(error_reply(e)),
    }
}

async fn handle_put_entry(
    headers: HeaderMap,
    registry: Arc<RoomRegistry>,
) -> Result<Response, Infallible> {
    let room_id = header_text(&headers, ROOM_ID_HEADER);
    let entry = decode_entry(header_text(&headers, ENTRY_HEADER));

    match registry.append(&room_id, entry).await {
        Ok(()) => Ok(StatusCode::OK.into_response()),
        Err(e) => Ok(error_reply(e)),
    }
}

async fn handle_count(room_id: String, registry: Arc<RoomRegistry>) -> Result<Response, Infallible> {
    match registry.count(&room_id).await {
        Ok(count) => Ok(count.to_string().into_response()),
        Err(e) => Ok(error_reply(e)),
    }
}

async fn handle_draw(room_id: String, registry: Arc<RoomRegistry>) -> Result<Response, Infallible> {
    match registry.draw(&room_id).await {
        Ok(entry) => Ok(entry.unwrap_or_default().into_response()),
        Err(e) => Ok(error_reply(e)),
    }
}

/// Header value as text; absent headers read as empty
fn header_text(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .unwrap_or_default()
}

/// Undoes client-side percent-encoding. Text that is not valid encoded
/// UTF-8 is kept as sent.
fn decode_entry(raw: String) -> String {
    match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw,
    }
}

pub(crate) fn redirect_to(location: String) -> Response {
    warp::reply::with_header(
        warp::reply::with_status(warp::reply(), StatusCode::FOUND),
        "location",
        location,
    )
    .into_response()
}

fn error_reply(err: RaffleError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!(error = %err, "Room operation failed");
    } else {
        tracing::debug!(error = %err, "Rejected room operation");
    }
    warp::reply::with_status(err.to_string(), status).into_response()
}

pub(crate) fn with_registry(
    registry: Arc<RoomRegistry>,
) -> impl Filter<Extract = (Arc<RoomRegistry>,), Error = Infallible> + Clone {
    warp::any().map(move || registry.clone())
}
