use thiserror::Error;


pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("can't parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("frame has {i} I and {q} Q samples, expected {expected}")]
    FrameLength { expected: usize, i: usize, q: usize },

    #[error("doppler history has {actual} samples, expected {expected}")]
    HistoryLength { expected: usize, actual: usize },

    #[error("frame source: {0}")]
    Source(String),

    #[error("telemetry: {0}")]
    Telemetry(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
