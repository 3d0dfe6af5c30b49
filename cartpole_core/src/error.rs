//! Error types for the cart-pole controller

use thiserror::Error;

/// Controller errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    #[error("Body '{0}' is not present in the physics world")]
    UnknownBody(String),

    #[error("Invalid slider '{name}': {reason}")]
    InvalidSlider { name: String, reason: String },
}

/// Result type for controller operations
pub type ControlResult<T> = Result<T, ControlError>;
