//! Storage and service layer for the subscription tracker.
//!
//! Provides the repository seam with in-memory and JSONL-file backends, and
//! the service that validates requests and runs spend summaries.

pub mod repository;
pub mod service;
pub mod store;

pub use tracker_core as core;
