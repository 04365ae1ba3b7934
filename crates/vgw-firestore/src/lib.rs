//! Firestore REST API client.
//!
//! This crate provides:
//! - A Firestore document client with retries, token caching and emulator support
//! - Typed repositories for video records and configuration documents
//! - Optimistic-concurrency writes guarded by document update times

pub mod client;
pub mod error;
pub mod metrics;
pub mod repos;
pub mod retry;
pub mod token_cache;
pub mod types;

#[cfg(test)]
mod client_tests;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use repos::{ConfigRepository, VideoRepository, CONFIG_SETS_COLLECTION, VIDEOS_COLLECTION};
pub use retry::RetryConfig;
pub use types::{Document, FromFirestoreValue, Precondition, ToFirestoreValue, Value};
