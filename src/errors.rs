/// Domain-specific error types for the scoring engine.
/// Validation failures are per-record and recoverable: the batch must
/// continue after reporting them. Configuration failures halt up front.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid field '{field}': {message}")]
    Validation { field: &'static str, message: String },

    #[error("record {index}: {source}")]
    Record {
        index: usize,
        #[source]
        source: Box<EngineError>,
    },

    #[error("csv error: {0}")]
    Csv(String),

    #[error("io error: {0}")]
    Io(String),
}

impl EngineError {
    /// Attach a record index to a per-record failure.
    pub fn at_record(self, index: usize) -> Self {
        EngineError::Record {
            index,
            source: Box::new(self),
        }
    }

    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<csv::Error> for EngineError {
    fn from(e: csv::Error) -> Self {
        EngineError::Csv(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Config(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
