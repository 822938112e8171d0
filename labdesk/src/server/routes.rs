//! Router configuration.

use super::state::AppState;
use crate::api::{availability, conversations, registration, requests, stock, websocket};
use crate::stock::{Equipment, HasRegistry, Material, Reactive, StockItem, StockRegistries};
use axum::{
    routing::{get, post},
    Router,
};
use labdesk_web::{handlers::health_check, request_trace_layer};
use tower_http::trace::TraceLayer;

/// Build the complete router.
///
/// - `GET /health` (no identity required)
/// - `/api/...` resource endpoints
/// - `GET /ws/requests/:id` room subscription
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Stock
        .nest("/equipments", stock_routes::<Equipment>())
        .nest("/materials", stock_routes::<Material>())
        .nest("/reactives", stock_routes::<Reactive>())
        // Availability dry run
        .route("/availability", post(availability::check))
        // Requests
        .route("/requests", post(requests::create).get(requests::list))
        .route(
            "/requests/:id",
            get(requests::get)
                .patch(requests::update)
                .delete(requests::delete),
        )
        .route("/requests/:id/approve", post(requests::approve))
        .route("/requests/:id/reject", post(requests::reject))
        .route("/requests/:id/complete", post(requests::complete))
        .route("/requests/:id/assign", post(requests::assign))
        // Conversations
        .route("/conversations/:id", get(conversations::get))
        .route("/conversations/:id/messages", post(conversations::add_message))
        .route("/conversations/:id/read", post(conversations::read))
        .route("/conversations/:id/delivered", post(conversations::delivered))
        // Registration
        .route("/register-tokens", post(registration::issue_token))
        .route(
            "/register-tokens/:id",
            get(registration::get_token).delete(registration::revoke_token),
        )
        .route("/register", post(registration::register));

    Router::new()
        .route("/health", get(health_check))
        .route("/ws/requests/:id", get(websocket::request_room))
        .nest("/api", api_routes)
        .layer(request_trace_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn stock_routes<T>() -> Router<AppState>
where
    T: StockItem,
    StockRegistries: HasRegistry<T>,
{
    Router::new()
        .route("/", get(stock::list::<T>).post(stock::create::<T>))
        .route(
            "/:id",
            get(stock::get::<T>)
                .put(stock::update::<T>)
                .delete(stock::delete::<T>),
        )
}
