//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - Password and OAuth login, token refresh and logout
//! - JWT issuance and verification, password hashing
//! - Token revocation backed by a TTL cache
//! - The access gate and `AuthedUser` extractor for protected routes

pub mod extractors;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod oauth_mapper;
pub mod revocation;
pub mod routes;
pub mod service;
pub mod tokens;

#[cfg(test)]
mod tests;

pub use extractors::AuthedUser;
pub use gate::{auth_gate, default_public_routes, PublicRoutes};
pub use revocation::{InMemoryRevocationCache, RedisRevocationCache, RevocationCache};
pub use routes::auth_routes;
pub use service::AuthService;
pub use tokens::TokenService;
