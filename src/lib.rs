// src/lib.rs

pub mod config;
pub mod docs;
pub mod error;
pub mod gamification;
pub mod handlers;
pub mod live;
pub mod models;
pub mod rewards;
pub mod routes;
pub mod srs;
pub mod state;
pub mod studio;
pub mod utils;

pub use routes::create_router;
pub use state::AppState;
