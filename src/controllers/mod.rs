pub mod resources;

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::models::{Room, Seat};

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(resources::routes::<Seat>())
        .merge(resources::routes::<Room>())
}
