pub mod api;
pub mod cache;

pub use api::{ClientError, StockBoxClient};
pub use cache::CachedStockBoxClient;
