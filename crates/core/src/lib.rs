//! Convention Core - Shared domain types.
//!
//! This crate holds the domain model used by every convention component:
//! - `tickets` - Public ticket shop (multi-step purchase wizard)
//! - `cli` - Migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types, validation and pure predicates - no
//! I/O, no database access, no HTTP. Persistence lives behind the store
//! trait in the tickets crate.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, contact data, prices
//! - [`shop`] - Events, products, orders, line items, customers, stock check
//! - [`enrollment`] - Attendee enrollment settings per event
//! - [`labour`] - Volunteer signup extras and their choice lists

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod enrollment;
pub mod labour;
pub mod shop;
pub mod types;

pub use types::*;
