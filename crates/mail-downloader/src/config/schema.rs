use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::filter::FilterRule;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub imap: ImapSettings,
    #[serde(default)]
    pub range: DateRange,
    #[serde(default)]
    pub attachments: AttachmentsConfig,
    #[serde(default)]
    pub mails: MailsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub charsets: CharsetsConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

/// Mailbox connection settings.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImapSettings {
    /// IMAP server hostname (e.g., "imap.gmail.com").
    #[serde(default)]
    pub server: String,

    /// IMAPS port (default: 993). Plain-text IMAP is not supported.
    #[serde(default = "default_imap_port")]
    pub port: u16,

    /// Login name, usually the email address. Also the first output path segment.
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub password_file: Option<String>,

    #[serde(default)]
    pub password_env_var: Option<String>,

    /// Mailbox to open read-only (default: "INBOX").
    #[serde(default = "default_inbox")]
    pub mailbox: String,
}

fn default_imap_port() -> u16 {
    993
}

fn default_inbox() -> String {
    "INBOX".to_string()
}

impl Default for ImapSettings {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: default_imap_port(),
            username: String::new(),
            password: None,
            password_file: None,
            password_env_var: None,
            mailbox: default_inbox(),
        }
    }
}

impl fmt::Debug for ImapSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_file", &self.password_file)
            .field("password_env_var", &self.password_env_var)
            .field("mailbox", &self.mailbox)
            .finish()
    }
}

/// Calendar date range; `from` is inclusive, `to` exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateRange {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AttachmentsConfig {
    /// Matched against the detected attachment mimetype.
    #[serde(default = "FilterRule::match_all")]
    pub mimetypes: FilterRule,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            mimetypes: FilterRule::match_all(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MailsConfig {
    /// Matched against the subject to decide whether a PDF is rendered.
    #[serde(default = "FilterRule::match_all")]
    pub subjects: FilterRule,
}

impl Default for MailsConfig {
    fn default() -> Self {
        Self {
            subjects: FilterRule::match_all(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("files")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

/// Options passed to the HTML to PDF renderer, fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RendererConfig {
    #[serde(default = "default_renderer_command")]
    pub command: String,

    #[serde(default)]
    pub landscape: bool,

    #[serde(default = "default_true")]
    pub print_background: bool,

    /// `None` leaves the page size to the document and the renderer.
    #[serde(default)]
    pub page_size: Option<String>,
}

fn default_renderer_command() -> String {
    "wkhtmltopdf".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            command: default_renderer_command(),
            landscape: false,
            print_background: true,
            page_size: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CharsetsConfig {
    /// Extra charset labels, mapped to an encoding label `encoding_rs` knows.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FetchConfig {
    /// Bound of the channel between the fetch task and the pipeline.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}
