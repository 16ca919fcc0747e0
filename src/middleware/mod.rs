use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderName, Method},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

pub const FIELDS_HEADER: &str = "x-fields";
const FORWARDED_FOR: &str = "x-forwarded-for";

// Откуда пришёл запрос: X-Forwarded-For, иначе адрес соединения
fn client_addr(req: &Request) -> String {
    if let Some(forwarded) = req.headers().get(FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        if !forwarded.is_empty() {
            return forwarded.to_string();
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Логирует каждый запрос и ответ: метод, путь, клиент, статус, длительность.
pub async fn request_logging(
    State(state): State<Arc<crate::AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[request] {} {} from {}", method, path, client_addr(&req));
    if state.config.app.debug {
        for (name, value) in req.headers() {
            debug!("[header] {}: {:?}", name, value);
        }
    }

    let response = next.run(req).await;

    let status = response.status();
    info!(
        "[response] {} {} - {} {} - {}ms",
        method,
        path,
        status.as_u16(),
        status.canonical_reason().unwrap_or(""),
        started.elapsed().as_millis()
    );
    response
}

/// CORS: любые источники, методы CRUD и заголовок X-Fields.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(FIELDS_HEADER)])
}
