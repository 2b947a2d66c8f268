//! Greeting and metrics endpoints

pub mod handlers;
pub mod routes;

pub use routes::system_routes;
