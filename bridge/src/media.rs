//! Media publisher: serves published artifacts by name.
//!
//! Only well-formed artifact names are looked up, so nothing outside the media
//! root is reachable. `ServeFile` handles conditional and range requests.

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use callflow_core::ArtifactName;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, error, warn};

use crate::AppState;

const NOT_FOUND: &str = "File not found";

pub async fn serve_media(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    req: Request,
) -> Response {
    let name: ArtifactName = match filename.parse() {
        Ok(name) => name,
        Err(e) => {
            warn!(target = "media", file = %filename, error = %e, "Rejected media request");
            return (StatusCode::NOT_FOUND, NOT_FOUND).into_response();
        }
    };

    let path = state.flow.store().path(&name);
    if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
        debug!(target = "media", file = %name, "Media not published");
        return (StatusCode::NOT_FOUND, NOT_FOUND).into_response();
    }

    let mime = name
        .format()
        .content_type()
        .parse::<mime::Mime>()
        .unwrap_or(mime::APPLICATION_OCTET_STREAM);
    match ServeFile::new_with_mime(&path, &mime).oneshot(req).await {
        Ok(res) => {
            debug!(target = "media", file = %name, status = %res.status(), "Served media");
            res.map(Body::new).into_response()
        }
        Err(e) => {
            error!(target = "media", file = %name, error = %e, "Failed to serve media");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
