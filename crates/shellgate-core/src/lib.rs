//! Core library for Shellgate.
//!
//! Contains the credential model, the secret-sealing crypto, the SSH
//! transport abstraction and its russh implementation, the output/input
//! byte relays, the process-wide connection registry, and the session
//! lifecycle controller. This crate knows nothing about HTTP; the server
//! crate adapts its operations onto request handlers.

pub mod controller;
pub mod credential;
pub mod crypto;
pub mod error;
pub mod registry;
pub mod relay;
pub mod session;
pub mod ssh;
pub mod transport;
