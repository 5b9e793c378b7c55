use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailDownloaderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// True when the filesystem rejected the name as too long.
    pub fn is_name_too_long(&self) -> bool {
        let source = match self {
            StorageError::CreateDirectory { source, .. } => source,
            StorageError::WriteFile { source, .. } => source,
        };
        source.kind() == ErrorKind::InvalidFilename || is_enametoolong(source)
    }
}

#[cfg(target_os = "linux")]
fn is_enametoolong(err: &std::io::Error) -> bool {
    const ENAMETOOLONG: i32 = 36;
    err.raw_os_error() == Some(ENAMETOOLONG)
}

#[cfg(not(target_os = "linux"))]
fn is_enametoolong(_err: &std::io::Error) -> bool {
    false
}

pub type Result<T> = std::result::Result<T, MailDownloaderError>;
