use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::compression::CompressionLayer;
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    create_url_handler, delete_user_urls_handler, list_user_urls_handler, ping_handler,
    resolve_handler, shorten_batch_handler, shorten_handler,
};
use crate::identity::identity_middleware;
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/", post(create_url_handler))
            .route("/ping", get(ping_handler))
            .route("/{code}", get(resolve_handler))
            .nest(
                "/api",
                Router::new()
                    .route("/shorten", post(shorten_handler))
                    .route("/shorten/batch", post(shorten_batch_handler))
                    .route(
                        "/user/urls",
                        get(list_user_urls_handler)
                            .post(delete_user_urls_handler)
                            .delete(delete_user_urls_handler),
                    ),
            )
            .layer(middleware::from_fn(identity_middleware))
            .layer(RequestDecompressionLayer::new())
            .layer(CompressionLayer::new())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
