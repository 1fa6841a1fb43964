use thiserror::Error;

/// Errors raised while building, differentiating, evaluating or stepping a model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("variable {0} already created")]
    DuplicateVariable(String),

    #[error("d/dt already provided for variable {0}")]
    DuplicateDerivative(String),

    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    #[error("variable {0} is not registered with this model")]
    UnknownVariable(String),

    #[error("unsupported differentiation through {0}")]
    UnsupportedDifferentiation(String),

    #[error("domain error: {0}")]
    Domain(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
