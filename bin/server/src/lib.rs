//! hours API server.
//!
//! Serves the sign-in exchange, session-cookie authentication, profile
//! management, and course permission administration over HTTP.

pub mod auth;
pub mod config;
pub mod error;
