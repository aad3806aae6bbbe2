//! API Routes
//!
//! Route handlers organized by functionality.

pub mod auth;
pub mod buckets;
pub mod builder;
pub mod flux;
pub mod grafana;
pub mod health;
pub mod query;
