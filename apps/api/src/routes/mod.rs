pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::complaints::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/complaints",
            get(handlers::handle_list)
                .post(handlers::handle_submit)
                .put(handlers::handle_update),
        )
        .route("/complaints/stats", get(handlers::handle_stats))
        .route(
            "/complaints/:id/messages",
            get(handlers::handle_list_messages).post(handlers::handle_post_message),
        )
        .route("/admin/check", get(handlers::handle_admin_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
