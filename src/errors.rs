use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum HarnessError {
    #[error("Error: configuration file {path} does not exist!")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to read configuration file {path}: {source}")]
    ConfigReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed configuration file {path} (line {line}): {detail}")]
    ConfigSyntaxError {
        path: PathBuf,
        line: usize,
        detail: String,
    },

    #[error("Configuration file {path} does not set 'maxtime' in [DEFAULT]")]
    MissingMaxTime { path: PathBuf },

    #[error("Configuration file {path}: 'maxtime' must be a positive integer, got '{value}'")]
    InvalidMaxTime { path: PathBuf, value: String },

    #[error("Error: {path} exists but is not a directory!")]
    ResultsNotDirectory { path: PathBuf },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to open result file {path}: {source}")]
    OpenResultError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write result file {path}: {source}")]
    WriteResultError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to start benchmark {program}: {source}")]
    SpawnError {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed waiting for benchmark {program}: {source}")]
    WaitError {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read settings file {path}: {detail}")]
    SettingsError { path: PathBuf, detail: String },

    #[error("Iteration count must be a positive integer")]
    InvalidIterations,
}
