use std::path::PathBuf;

use chrono::NaiveDate;

use crate::config::{Config, ImapSettings};
use crate::email::{CharsetRegistry, EmailError};
use crate::filter::FilterRule;

use super::error::PipelineError;

/// Settings the pipeline needs, resolved from a validated [`Config`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub imap: ImapSettings,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub mimetypes: FilterRule,
    pub subjects: FilterRule,
    pub output_directory: PathBuf,
    pub charset_aliases: Vec<(String, String)>,
    pub channel_capacity: usize,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let (from, to) = match (config.range.from, config.range.to) {
            (Some(from), Some(to)) => (from, to),
            _ => {
                return Err(PipelineError::Config(
                    "date range needs both from and to".to_string(),
                ))
            }
        };

        Ok(Self {
            imap: config.imap.clone(),
            from,
            to,
            mimetypes: config.attachments.mimetypes.clone(),
            subjects: config.mails.subjects.clone(),
            output_directory: config.output.directory.clone(),
            charset_aliases: config
                .charsets
                .aliases
                .iter()
                .map(|(alias, target)| (alias.clone(), target.clone()))
                .collect(),
            channel_capacity: config.fetch.channel_capacity.max(1),
        })
    }

    /// Default aliases plus the configured ones.
    pub fn charset_registry(&self) -> Result<CharsetRegistry, EmailError> {
        let mut registry = CharsetRegistry::with_defaults();
        for (alias, target) in &self.charset_aliases {
            registry.register_label(alias, target)?;
        }
        Ok(registry)
    }
}
