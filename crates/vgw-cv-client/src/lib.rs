//! Client for the computer-vision worker.
//!
//! The worker runs object detection asynchronously. This crate only asks it
//! to start or cancel a job for a video; progress is written by the worker
//! to the video record.

pub mod client;
pub mod error;
pub mod metrics;
pub mod types;

pub use client::{CvClient, CvClientConfig};
pub use error::{CvError, CvResult};
pub use types::{CvOperation, CvRoutes, HealthResponse};
