//! Downloads attachments from an IMAP mailbox over a date range and renders
//! each message body to PDF.

pub mod config;
pub mod email;
pub mod error;
pub mod filter;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod secrets;
pub mod storage;

pub use config::{load_config, validate_config, Config, ConfigOverrides};
pub use email::{ImapClient, Mail, MailStreamFetcher, MimeDecomposer};
pub use error::{ConfigError, MailDownloaderError, Result, StorageError};
pub use filter::FilterRule;
pub use logging::{init_logging, LogFormat};
pub use pipeline::{download, Pipeline, PipelineConfig, RunReport};
pub use render::{Renderer, WkhtmltopdfRenderer};
pub use secrets::{resolve_secret, SecretError};
pub use storage::FileStorage;
