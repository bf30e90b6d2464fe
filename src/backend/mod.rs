//! # Backend Module
//!
//! HTTP plumbing shared by the reminder and task gateways: session token
//! handling, the authenticated reqwest client and the gateway error type.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod auth;
pub mod client;
pub mod error;

pub use auth::{SessionToken, TokenProvider};
pub use client::BackendClient;
pub use error::GatewayError;
