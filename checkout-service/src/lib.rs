pub mod app;
pub mod cart;
pub mod error;
pub mod ledger;
pub mod order_handlers;
pub mod pricing;
pub mod repo;

pub use app::AppState;
