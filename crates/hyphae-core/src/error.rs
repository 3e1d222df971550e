use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A configuration value is out of range or inconsistent.
    InvalidConfig(String),
    /// The activation source failed or produced malformed data.
    Activation(String),
    /// Two organs share a name, so matrix indices would be ambiguous.
    DuplicateOrgan(String),
    /// A matrix does not match the organ roster it was paired with.
    ShapeMismatch { expected: usize, found: usize },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            EngineError::Activation(msg) => write!(f, "activation source failed: {msg}"),
            EngineError::DuplicateOrgan(name) => write!(f, "duplicate organ name: {name}"),
            EngineError::ShapeMismatch { expected, found } => {
                write!(f, "shape mismatch: expected {expected}x{expected}, found {found}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

pub type Result<T> = std::result::Result<T, EngineError>;
