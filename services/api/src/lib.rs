//! services/api/src/lib.rs
//!
//! The API service crate: configuration, adapters for the store and the
//! language-model collaborators, the session/progression engine, and the
//! Axum web layer. The `api` binary wires these together.

pub mod adapters;
pub mod config;
pub mod engine;
pub mod error;
pub mod web;
