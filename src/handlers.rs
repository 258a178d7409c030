pub mod stock_movement;
pub mod system;
