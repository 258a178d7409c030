pub mod stock_movement;
