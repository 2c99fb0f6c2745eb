//! Typed HTTP client for the camrig capture backend.
//!
//! Covers the camera registry, per-camera control, capture, image and
//! directory management, system status and MQTT bridge endpoints.
//! Idempotent reads are retried with backoff; every request carries a
//! timeout.

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod retry;

pub use client::BackendClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use retry::RetryConfig;
