use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubsetSumError {
    #[error("Arithmetic failure: {0}")]
    ArithmeticFailure(String),

    #[error("Binding violation: commitment {index} does not open to its claimed value")]
    BindingViolation { index: usize },

    #[error("Permutation mismatch at position {index}")]
    PermutationMismatch { index: usize },

    #[error("Invalid challenge: {0} (expected 0 or 1)")]
    InvalidChallenge(u8),

    #[error("Degenerate instance: {0}")]
    DegenerateInstance(String),

    #[error("Final aggregate check failed")]
    FinalCheckFailed,

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid length: expected {expected}, got {got}")]
    LengthMismatch {
        expected: usize,
        got: usize,
    },

    #[error("Parameter file error: {0}")]
    ParameterFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SubsetSumError>;

impl From<rand::Error> for SubsetSumError {
    fn from(err: rand::Error) -> Self {
        Self::ArithmeticFailure(format!("Random source failure: {}", err))
    }
}
