//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `MarketDataProvider`: market snapshots and related-market quotes
//! - `Notifier`: lifecycle event delivery to monitoring/UI consumers

pub mod market_data;
pub mod notifier;
