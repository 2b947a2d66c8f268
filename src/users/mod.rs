//! # Users Module
//!
//! This module handles user accounts:
//! - The credential store over SQLite
//! - Registration with password policy checks
//! - Password changes and OAuth link upkeep

pub mod handlers;
pub mod models;
pub mod routes;
pub mod service;
pub mod store;
pub mod validators;


pub use models::User;
pub use routes::users_routes;
pub use service::UsersService;
pub use store::{CredentialStore, SqliteCredentialStore};
