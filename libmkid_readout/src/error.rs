use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Byte stream is full; dropped a write of {0} bytes")]
    Full(usize),
    #[error("Byte stream peer disconnected")]
    Disconnected,
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("Control plane failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("START control file did not contain a destination directory")]
    EmptyStart,
}

#[derive(Debug, Error)]
pub enum IngestorError {
    #[error("Ingestor failed to bind UDP port {0}: {1}")]
    BindError(u16, std::io::Error),
    #[error("Ingestor could not size the socket receive buffer: {0}")]
    BufferSizeError(std::io::Error),
    #[error("Ingestor failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Ingestor failed because both byte streams disconnected")]
    StreamsClosed,
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("Recorder failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Recorder failed due to control plane error: {0}")]
    ControlError(#[from] ControlError),
    #[error("Recorder failed due to byte stream error: {0}")]
    StreamError(#[from] StreamError),
}

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("Aggregator failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Aggregator failed due to byte stream error: {0}")]
    StreamError(#[from] StreamError),
    #[error("Aggregator failed due to control plane error: {0}")]
    ControlError(#[from] ControlError),
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Supervisor failed due to control plane error: {0}")]
    ControlError(#[from] ControlError),
    #[error("Supervisor failed due to Ingestor error: {0}")]
    IngestorError(#[from] IngestorError),
    #[error("Supervisor failed due to Recorder error: {0}")]
    RecorderError(#[from] RecorderError),
    #[error("Supervisor failed due to Aggregator error: {0}")]
    AggregatorError(#[from] AggregatorError),
    #[error("Supervisor failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("The {0} worker panicked")]
    WorkerPanic(&'static str),
}
