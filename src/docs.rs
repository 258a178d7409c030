// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::OpenApi as OpenApiDocument;
use crate::common;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "StockBox API", description = "Movimentações e saldo de estoque"),
    paths(
        // --- System ---
        handlers::system::health,
    ),
    components(
        schemas(
            // --- Envelope ---
            common::response::ErrorBody,
            handlers::system::HealthStatus,

            // --- Stock ---
            models::stock_movement::MovementType,
            models::stock_movement::SortOrder,
            models::stock_movement::StockStatus,
            models::stock_movement::MovementCreated,
            models::stock_movement::StockMovement,
            models::stock_movement::Pagination,
            models::stock_movement::MovementPage,
            models::stock_movement::CurrentStock,
            models::stock_movement::CurrentStockReport,

            // --- Payloads ---
            handlers::stock_movement::CreateStockMovementPayload,
        )
    ),
    tags(
        (name = "System", description = "Saúde da API"),
        (name = "Stock Movements", description = "Movimentações e estoque atual")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

// Rotas internas, relativas a `/api/{versão}/internal`.
#[derive(OpenApi)]
#[openapi(paths(
    handlers::stock_movement::create_stock_movement,
    handlers::stock_movement::list_stock_movements,
    handlers::stock_movement::get_stock_movement,
    handlers::stock_movement::get_current_stock,
))]
struct StockMovementApi;

/// Documento completo, com as rotas internas sob a versão configurada.
pub fn openapi(api_version: &str) -> OpenApiDocument {
    ApiDoc::openapi().nest(format!("/api/{api_version}/internal"), StockMovementApi::openapi())
}

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = openapi("v1");
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        assert!(paths.iter().any(|p| p.as_str() == "/health"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/internal/stock-movement"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/internal/stock-movement/{id}"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/internal/stock-current"));
        assert!(doc.components.unwrap().security_schemes.contains_key("api_jwt"));
    }

    #[test]
    fn routes_follow_the_configured_version() {
        let doc = openapi("v2");
        assert!(doc.paths.paths.contains_key("/api/v2/internal/stock-current"));
        assert!(!doc.paths.paths.keys().any(|p| p.contains("/v1/")));
    }
}
