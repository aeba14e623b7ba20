//! Domain layer for the subscription tracker.
//!
//! Holds the subscription model, `MM-YYYY` date handling, request validation,
//! settings, and the overlap engine that turns a user's subscriptions into a
//! spend summary.

pub mod error;
pub mod models;
pub mod month_year;
pub mod overlap;
pub mod settings;
pub mod validation;

pub use error::{Result, TrackerError};
