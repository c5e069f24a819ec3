use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Failed to transform pose from frame '{from}' into frame '{to}': {reason}")]
    TransformFailed {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Pose is in frame '{actual}' but the costmap uses frame '{expected}'")]
    FrameMismatch { expected: String, actual: String },

    #[error("Position ({x:.3}, {y:.3}) is off the costmap")]
    OffMap { x: f64, y: f64 },

    #[error("No path found: {reason}")]
    NoPath { reason: String },

    #[error("Controller rejected plans: {reason}")]
    ControllerRejected { reason: String },

    #[error("Controller failure: {reason}")]
    ControllerFailure { reason: String },

    #[error("Unknown {kind} plugin: {name}")]
    UnknownPlugin { kind: String, name: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
}

impl DomainError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        DomainError::InvalidRequest {
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Navigation service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
pub type ApplicationResult<T> = Result<T, ApplicationError>;
