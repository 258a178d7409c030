//! StockBox: API de movimentações de estoque sobre procedures do PostgreSQL,
//! com cliente HTTP tipado e apresentação para terminal.

pub mod client;
pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod presentation;
pub mod routes;
pub mod services;
