//! Adapters Layer - Port Implementations
//!
//! Concrete implementations of the ports: the HTTP gateway for market
//! data, notifier backends, and JSONL persistence.

pub mod gateway;
pub mod notify;
pub mod persistence;
