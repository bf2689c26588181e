//! `tradewind-storefront` — the request-facing order operations surface.
//!
//! This is the interface boundary toward the out-of-scope API layer: it
//! resolves the session's active order, enforces ownership guards, re-runs
//! the pricing pipeline after each mutation, and drives lifecycle
//! transitions. Persistence happens through the [`OrderRepository`]
//! contract; a pipeline run that fails is never persisted.

pub mod catalog;
pub mod config;
pub mod error;
pub mod repository;
pub mod service;

pub use catalog::{ProductCatalog, StaticCatalog, VariantDetail};
pub use config::OrderOptions;
pub use error::{OrderServiceError, OrderServiceResult};
pub use repository::{InMemoryOrderRepository, OrderRepository};
pub use service::OrderService;
