use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod cabins;
pub mod error;
pub mod payments;
pub mod reservations;
pub mod state;
pub mod webhooks;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    Router::new()
        .merge(reservations::routes())
        .merge(payments::routes())
        .merge(webhooks::routes())
        .merge(cabins::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
