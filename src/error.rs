use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used across the network crate.
pub type Result<T> = std::result::Result<T, NetworkError>;

/// Errors raised while loading data, building or training a network.
#[derive(Debug)]
pub enum NetworkError {
    Io(io::Error),
    MalformedDataset {
        path: String,
        reason: String,
    },
    InvalidLabel {
        label: u8,
    },
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidTopology(String),
    InvalidLearningRate(f64),
    ZeroBatchSize,
    EmptyTrainingSet,
    SampleOutOfRange {
        index: usize,
        len: usize,
    },
    UnknownActivation(String),
    UnknownInitialization(String),
    Initialization(String),
    NoAccumulatedSamples,
}

impl Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::Io(err) => write!(f, "I/O error: {err}"),
            NetworkError::MalformedDataset { path, reason } => {
                write!(f, "Malformed dataset file {path}: {reason}")
            }
            NetworkError::InvalidLabel { label } => {
                write!(f, "Label {label} is outside of the digit range 0-9")
            }
            NetworkError::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            NetworkError::InvalidTopology(reason) => write!(f, "Invalid topology: {reason}"),
            NetworkError::InvalidLearningRate(rate) => {
                write!(f, "Learning rate must be finite and non-negative, got {rate}")
            }
            NetworkError::ZeroBatchSize => write!(f, "Batch size must be greater than 0"),
            NetworkError::EmptyTrainingSet => write!(f, "Cannot train on an empty training set"),
            NetworkError::SampleOutOfRange { index, len } => {
                write!(f, "Sample {index} is out of range for {len} training images")
            }
            NetworkError::UnknownActivation(name) => {
                write!(f, "Activation function '{name}' not recognized")
            }
            NetworkError::UnknownInitialization(name) => {
                write!(f, "Initialization function '{name}' not recognized")
            }
            NetworkError::Initialization(reason) => {
                write!(f, "Failed to build weight distribution: {reason}")
            }
            NetworkError::NoAccumulatedSamples => write!(
                f,
                "Tried to apply a parameter update before any sample was accumulated"
            ),
        }
    }
}

impl Error for NetworkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NetworkError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for NetworkError {
    fn from(err: io::Error) -> Self {
        NetworkError::Io(err)
    }
}
