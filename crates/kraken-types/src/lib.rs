//! Shared types for the Kraken REST client
//!
//! This crate holds the pieces of the SDK that carry no I/O: the Kraken
//! error-code table and the call-budget model behind client-side throttling.
//! It has minimal dependencies and can be used independently.
//!
//! # Key Types
//!
//! - [`KrakenApiError`], [`KrakenErrorCode`] - Kraken error strings parsed into codes
//! - [`RecoveryStrategy`] - What a caller may do about an error
//! - [`CallBudget`], [`CallBudgetConfig`], [`Tier`] - Kraken's decaying API call counter

pub mod call_budget;
pub mod error_codes;

pub use call_budget::*;
pub use error_codes::*;
