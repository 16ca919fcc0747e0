pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod query;
pub mod repository;
pub mod services;

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use models::{Room, Seat};
use repository::{PgRepository, Repository};
use services::jobs::Notifier;

// Shared state для всего приложения, создаётся один раз при старте
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub seats: Arc<dyn Repository<Seat>>,
    pub rooms: Arc<dyn Repository<Room>>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(config: config::Config, db: database::Database, notifier: Arc<dyn Notifier>) -> Arc<Self> {
        Arc::new(Self {
            config,
            seats: Arc::new(PgRepository::<Seat>::new(db.clone())),
            rooms: Arc::new(PgRepository::<Room>::new(db)),
            notifier,
        })
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(controllers::routes())
        .layer(middleware::cors_layer())
        .layer(axum::middleware::from_fn_with_state(state.clone(), middleware::request_logging))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
