//! Request handlers.

pub mod config_sets;
pub mod extract;
pub mod health;
pub mod object_detection;

pub use config_sets::*;
pub use health::*;
pub use object_detection::*;
