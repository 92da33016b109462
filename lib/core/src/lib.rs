//! Core domain types for the hours platform.
//!
//! This crate provides the foundational identifier types shared by the
//! access library and the server.

pub mod id;

pub use id::{CourseId, ParseIdError, UserId};
