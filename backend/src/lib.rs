//! Session Auth Backend Library
//!
//! Credential hashing, signed session tokens, server-side session tracking
//! and the HTTP surface over them. Exposed as a library for tests.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
