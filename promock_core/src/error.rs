use thiserror::Error;

#[derive(Error, Debug)]
pub enum MockError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MockError>;

/// A single exposition line that could not be understood.
///
/// Line numbers are 1-based. These never abort a load; the parser records
/// them and moves on to the next line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: missing metric name")]
    MissingName { line: usize },

    #[error("line {line}: invalid metric name '{name}'")]
    InvalidName { line: usize, name: String },

    #[error("line {line}: missing value")]
    MissingValue { line: usize },

    #[error("line {line}: invalid value '{value}'")]
    InvalidValue { line: usize, value: String },

    #[error("line {line}: invalid timestamp '{value}'")]
    InvalidTimestamp { line: usize, value: String },

    #[error("line {line}: invalid label: {reason}")]
    InvalidLabel { line: usize, reason: String },

    #[error("line {line}: unterminated label set")]
    UnterminatedLabels { line: usize },

    #[error("line {line}: unexpected trailing input '{rest}'")]
    TrailingInput { line: usize, rest: String },

    #[error("line {line}: invalid metadata: {reason}")]
    InvalidMetadata { line: usize, reason: String },

    #[error("line {line}: not valid UTF-8")]
    InvalidEncoding { line: usize },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::MissingName { line }
            | ParseError::InvalidName { line, .. }
            | ParseError::MissingValue { line }
            | ParseError::InvalidValue { line, .. }
            | ParseError::InvalidTimestamp { line, .. }
            | ParseError::InvalidLabel { line, .. }
            | ParseError::UnterminatedLabels { line }
            | ParseError::TrailingInput { line, .. }
            | ParseError::InvalidMetadata { line, .. }
            | ParseError::InvalidEncoding { line } => *line,
        }
    }
}
