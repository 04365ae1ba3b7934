//! Business logic services.

pub mod detection_gate;

pub use detection_gate::{DetectionGate, DetectionState, DetectionWorker, GateError};
