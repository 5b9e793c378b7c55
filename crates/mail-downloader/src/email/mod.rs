//! Mailbox access and MIME decomposition.
//!
//! [`ImapClient`] talks to the server, [`MailStreamFetcher`] turns the fetch
//! stream into [`Mail`] records and [`MimeDecomposer`] splits each message into
//! inline bodies and attachments.

pub mod charset;
pub mod client;
pub mod decompose;
pub mod detect;
pub mod error;
pub mod fetcher;
pub mod message;
pub mod parser;
pub mod seqset;

pub use charset::CharsetRegistry;
pub use client::ImapClient;
pub use decompose::{sanitize_filename, synthetic_filename, MimeDecomposer};
pub use detect::{detect, ContentType};
pub use error::{EmailError, Result};
pub use fetcher::MailStreamFetcher;
pub use message::{Address, Attachment, EnvelopeMeta, Mail, MailContent, RawMessage};
pub use parser::{parse_message, MessageParts, PartDisposition, PartReadError, RawPart};
pub use seqset::SequenceSet;
