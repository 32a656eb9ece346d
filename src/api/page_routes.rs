use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Reply};

use super::room_routes::{redirect_to, with_registry};
use crate::rooms::RoomRegistry;

/// Placeholder replaced with the room id in room templates
const ROOM_ID_PLACEHOLDER: &str = "{{ID}}";

pub fn index_page(
    templates: Arc<PathBuf>,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path::end()
        .and(warp::get())
        .and(with_templates(templates))
        .and_then(|templates: Arc<PathBuf>| serve_static(templates, "index.html"))
}

pub fn error_page(
    templates: Arc<PathBuf>,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("error")
        .and(warp::get())
        .and(with_templates(templates))
        .and_then(|templates: Arc<PathBuf>| serve_static(templates, "error.html"))
}

/// `GET /add/{room_id}`
pub fn add_page(
    registry: Arc<RoomRegistry>,
    templates: Arc<PathBuf>,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("add" / String)
        .and(warp::get())
        .and(with_registry(registry))
        .and(with_templates(templates))
        .and_then(|room_id: String, registry: Arc<RoomRegistry>, templates: Arc<PathBuf>| {
            render_room_page(room_id, registry, templates, "add.html")
        })
}

/// `GET /draw/{room_id}`
pub fn draw_page(
    registry: Arc<RoomRegistry>,
    templates: Arc<PathBuf>,
) -> impl Filter<Extract = impl Reply, Error = warp::Rejection> + Clone {
    warp::path!("draw" / String)
        .and(warp::get())
        .and(with_registry(registry))
        .and(with_templates(templates))
        .and_then(|room_id: String, registry: Arc<RoomRegistry>, templates: Arc<PathBuf>| {
            render_room_page(room_id, registry, templates, "draw.html")
        })
}

async fn serve_static(templates: Arc<PathBuf>, name: &'static str) -> Result<Response, Infallible> {
    match load_template(&templates, name).await {
        Ok(body) => Ok(warp::reply::html(body).into_response()),
        Err(e) => {
            tracing::error!(template = name, error = %e, "Failed to load page");
            Ok(warp::reply::with_status("Page unavailable", StatusCode::INTERNAL_SERVER_ERROR)
                .into_response())
        }
    }
}

/// Renders a room page, or sends the client to `/error` if the room is gone
async fn render_room_page(
    room_id: String,
    registry: Arc<RoomRegistry>,
    templates: Arc<PathBuf>,
    name: &'static str,
) -> Result<Response, Infallible> {
    if !registry.exists(&room_id).await {
        tracing::debug!(room_id = %room_id, page = name, "Page requested for unknown room");
        return Ok(redirect_to("/error".to_string()));
    }

    match load_template(&templates, name).await {
        Ok(template) => Ok(warp::reply::html(render(&template, &room_id)).into_response()),
        Err(e) => {
            tracing::error!(template = name, error = %e, "Failed to load page");
            Ok(redirect_to("/error".to_string()))
        }
    }
}

async fn load_template(dir: &Path, name: &str) -> std::io::Result<String> {
    tokio::fs::read_to_string(dir.join(name)).await
}

fn render(template: &str, room_id: &str) -> String {
    template.replace(ROOM_ID_PLACEHOLDER, room_id)
}

fn with_templates(
    templates: Arc<PathBuf>,
) -> impl Filter<Extract = (Arc<PathBuf>,), Error = Infallible> + Clone {
    warp::any().map(move || templates.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_replaces_every_placeholder() {
        let page = render("<a href=\"/draw/{{ID}}\">{{ID}}</a>", "abc123");
        assert_eq!(page, "<a href=\"/draw/abc123\">abc123</a>");
    }

    #[test]
    fn test_render_without_placeholder() {
        assert_eq!(render("<p>static</p>", "abc123"), "<p>static</p>");
    }
}
