//! Shared data models for the vision gateway.
//!
//! This crate provides Serde-serializable types for:
//! - Document identifiers
//! - Object-detection job states and the stored-code registry
//! - Video records and configuration documents
//! - Route templates

pub mod config_set;
pub mod detection;
pub mod object_id;
pub mod route;
pub mod video;

// Re-export common types
pub use config_set::{ConfigDocument, ConfigField, DuplicateKey};
pub use detection::{DetectionAction, DetectionStatus, RegistryError, StatusCodes, StatusRegistry};
pub use object_id::{InvalidObjectId, ObjectId};
pub use route::{format_route, format_video_route, has_placeholder, VIDEO_ID_PARAM};
pub use video::{VideoRecord, DETECTION_STATUS_FIELD};
