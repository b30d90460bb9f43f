//! Catalog module: album model, HTTP client and the loaded catalog

pub mod client;
pub mod models;
pub mod provider;

pub use client::ApiClient;
pub use models::*;
pub use provider::{Catalog, SearchHit};
