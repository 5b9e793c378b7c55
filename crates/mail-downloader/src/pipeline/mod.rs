pub mod config;
pub mod error;
pub mod progress;
pub mod report;
pub mod runner;
pub mod session;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use progress::{BarProgress, NoopProgress, ProgressEvent, ProgressReporter, RunPhase};
pub use report::{PdfError, RunReport};
pub use runner::{download, drain, Pipeline};
pub use session::MailSession;
