//! Shared helpers

pub mod auth;
