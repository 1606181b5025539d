//! Test Utilities Crate
//!
//! Shared test infrastructure for the billing test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common entities
//! - `builders`: Builder patterns for test data construction
//! - `memory`: In-memory `BillingStore` with optimistic concurrency
//!   checks and fault injection
//! - `assertions`: Custom assertion helpers for money values

pub mod fixtures;
pub mod builders;
pub mod memory;
pub mod assertions;

pub use fixtures::*;
pub use builders::*;
pub use memory::InMemoryBillingStore;
pub use assertions::*;
