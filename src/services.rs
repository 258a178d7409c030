pub mod stock_movement_service;
pub use stock_movement_service::StockMovementService;
