//! Runtime error types.

use thiserror::Error;

/// Errors that can occur while the runtime drives a chain.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A handler panicked; the chain was unwound.
    #[error("Handler panicked: {message}")]
    HandlerPanicked { message: String },

    /// The blocking task running the chain did not complete.
    #[error("Dispatch task failed: {0}")]
    Join(String),
}

impl RuntimeError {
    /// Builds a `HandlerPanicked` error from a panic payload.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::HandlerPanicked { message }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_panic_payloads() {
        let static_str: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(
            RuntimeError::from_panic(static_str.as_ref()),
            RuntimeError::HandlerPanicked {
                message: "boom".to_string()
            }
        );

        let owned: Box<dyn std::any::Any + Send> = Box::new(format!("code {}", 7));
        assert_eq!(
            RuntimeError::from_panic(owned.as_ref()).to_string(),
            "Handler panicked: code 7"
        );

        let other: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert!(matches!(
            RuntimeError::from_panic(other.as_ref()),
            RuntimeError::HandlerPanicked { message } if message.contains("non-string")
        ));
    }
}
