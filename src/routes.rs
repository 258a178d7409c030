// src/routes.rs

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::get,
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::{AppState, ServerConfig},
    docs,
    handlers,
};

/// Limite do corpo JSON (10 MiB).
pub const BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;

/// Monta o router completo da API.
pub fn router(state: AppState, server: &ServerConfig) -> Router {
    // Rotas internas (consumidas pelo front-end)
    let stock_routes = Router::new()
        .route(
            "/stock-movement",
            get(handlers::stock_movement::list_stock_movements)
                .post(handlers::stock_movement::create_stock_movement),
        )
        .route(
            "/stock-movement/{id}",
            get(handlers::stock_movement::get_stock_movement),
        )
        .route(
            "/stock-current",
            get(handlers::stock_movement::get_current_stock),
        )
        .method_not_allowed_fallback(handlers::system::not_found);

    Router::new()
        .route("/health", get(handlers::system::health))
        .nest(&format!("/api/{}/internal", server.api_version), stock_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::openapi(&server.api_version)))
        .fallback(handlers::system::not_found)
        .method_not_allowed_fallback(handlers::system::not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Origem CORS ignorada (inválida): {}", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    layer.allow_origin(AllowOrigin::list(allowed))
}
