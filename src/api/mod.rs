pub mod page_routes;
pub mod rate_limit;
pub mod room_routes;

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::rooms::RoomRegistry;
use rate_limit::{ClientRateLimiter, RateLimited};

/// Every page and API route behind the per-client rate limit
pub fn routes(
    registry: Arc<RoomRegistry>,
    template_dir: PathBuf,
    limiter: Option<Arc<ClientRateLimiter>>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let templates = Arc::new(template_dir);

    let api = room_routes::create_room_route(registry.clone())
        .or(room_routes::put_entry_route(registry.clone()))
        .or(room_routes::count_route(registry.clone()))
        .or(room_routes::draw_route(registry.clone()))
        .or(room_routes::health_route(registry.clone()));

    let pages = page_routes::index_page(templates.clone())
        .or(page_routes::error_page(templates.clone()))
        .or(page_routes::add_page(registry.clone(), templates.clone()))
        .or(page_routes::draw_page(registry, templates));

    rate_limit::rate_limit(limiter)
        .and(api.or(pages))
        .with(warp::trace::request())
        .recover(handle_rejection)
}

/// Turns rejections into plain-text status replies
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found")
    } else if err.find::<RateLimited>().is_some() {
        (StatusCode::TOO_MANY_REQUESTS, "Too many requests")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
    } else {
        tracing::warn!(rejection = ?err, "Unhandled rejection");
        (StatusCode::BAD_REQUEST, "Bad request")
    };

    Ok(warp::reply::with_status(message, status))
}
