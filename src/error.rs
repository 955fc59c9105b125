use thiserror::Error;

use crate::backend::ShaderStage;
use crate::render::ObjectId;

/// Failure raised by a renderer operation.
///
/// Every variant is fatal to the call that produced it; the renderer never
/// retries or recovers locally.
#[derive(Debug, Error)]
pub enum RendererError {
    /// Missing or invalid container element.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Surface or context setup failed, including missing GPU context support.
    #[error("initialization failed: {0}")]
    Initialization(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("{stage} shader failed to compile: {log}")]
    ShaderCompilation { stage: ShaderStage, log: String },
    #[error("shader program failed to link: {0}")]
    ShaderLink(String),
    /// An operation ran before the lifecycle step it depends on.
    #[error("{operation} requires {requirement}")]
    NotInitialized {
        operation: &'static str,
        requirement: &'static str,
    },
    #[error("object identifier {0} is already registered")]
    IdentifierCollision(ObjectId),
    #[error("failed to allocate GPU resource: {0}")]
    ResourceAllocation(String),
    /// Unexpected failure while issuing draw calls.
    #[error("render failed: {0}")]
    Render(String),
}

impl RendererError {
    pub(crate) fn not_initialized(operation: &'static str) -> Self {
        Self::NotInitialized {
            operation,
            requirement: "an initialized renderer",
        }
    }
}

pub type Result<T, E = RendererError> = std::result::Result<T, E>;

/// Failure reported by a host or graphics backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_step() {
        let err = RendererError::not_initialized("render");
        assert_eq!(err.to_string(), "render requires an initialized renderer");

        let err = RendererError::ShaderCompilation {
            stage: ShaderStage::Fragment,
            log: "missing main".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "fragment shader failed to compile: missing main"
        );

        let err = RendererError::IdentifierCollision(ObjectId::new(4));
        assert_eq!(err.to_string(), "object identifier 4 is already registered");
    }
}
