pub mod strategy;
pub mod symbol;
pub mod backtest;
pub mod market;
pub mod trade;
pub mod auth;

pub use strategy::*;
pub use symbol::*;
pub use backtest::*;
pub use market::*;
pub use trade::*;
pub use auth::*;
