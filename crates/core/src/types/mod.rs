//! Core value types.
//!
//! Type-safe wrappers for identifiers, contact details and money.

pub mod contact;
pub mod id;
pub mod price;

pub use contact::{Email, EmailError, PhoneError, PhoneNumber, PostalCode, PostalCodeError};
pub use id::*;
pub use price::{CurrencyCode, Price};
