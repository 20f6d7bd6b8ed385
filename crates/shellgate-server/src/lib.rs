//! Shellgate HTTP server.
//!
//! Wires the core bridge library onto an Axum server: bearer-token auth,
//! a file-backed credential store, and the three terminal endpoints
//! (`connect` as a live byte stream, `input`, `close`).

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod store;
