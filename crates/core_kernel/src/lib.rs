//! Core Kernel - Foundational types for the flight school billing system
//!
//! This crate provides the fundamental building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers for domain entities

pub mod money;
pub mod identifiers;
pub mod error;

pub use money::{Money, Currency, MoneyError};
pub use identifiers::{InvoiceId, PaymentId, MemberId, BookingId, StaffId};
pub use error::CoreError;
