use std::time::Instant;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use log::{info, warn};

pub(crate) async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis();
    if status.is_server_error() {
        warn!("{method} {path} -> {} ({elapsed_ms}ms)", status.as_u16());
    } else {
        info!("{method} {path} -> {} ({elapsed_ms}ms)", status.as_u16());
    }
    response
}
