//! Mail records produced by the fetcher and consumed by the pipeline.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use mail_parser::MessageParser;

use super::error::EmailError;

/// One sender/recipient address from the envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub name: Option<String>,
    pub mailbox: Option<String>,
    pub host: Option<String>,
}

impl Address {
    pub fn new(name: Option<&str>, mailbox: Option<&str>, host: Option<&str>) -> Self {
        Self {
            name: name.map(str::to_string),
            mailbox: mailbox.map(str::to_string),
            host: host.map(str::to_string),
        }
    }

    /// `mailbox@host`, or whichever half is known.
    pub fn address(&self) -> String {
        match (&self.mailbox, &self.host) {
            (Some(mailbox), Some(host)) => format!("{}@{}", mailbox, host),
            (Some(mailbox), None) => mailbox.clone(),
            (None, Some(host)) => host.clone(),
            (None, None) => String::new(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) if !name.is_empty() => write!(f, "{} <{}>", name, self.address()),
            _ => f.write_str(&self.address()),
        }
    }
}

/// Envelope metadata as reported by the server.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeMeta {
    pub message_id: String,
    pub subject: String,
    pub from: Vec<Address>,
    pub date: Option<DateTime<FixedOffset>>,
}

/// A message as delivered by the fetch stream, before decomposition.
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub uid: u32,
    pub envelope: EnvelopeMeta,
    pub internal_date: Option<DateTime<FixedOffset>>,
    /// The `BODY[]` section; `None` if the server omitted it.
    pub body: Option<Vec<u8>>,
}

/// One extracted attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Sanitized filename; never contains a path separator.
    pub filename: String,
    pub body: Vec<u8>,
    pub mimetype: String,
}

/// Decomposed message content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailContent {
    /// Decoded inline parts in MIME part order.
    pub bodies: Vec<Vec<u8>>,
    /// Attachments in MIME part order.
    pub attachments: Vec<Attachment>,
}

/// One retrieved message.
#[derive(Debug)]
pub struct Mail {
    pub uid: u32,
    pub message_id: String,
    pub subject: String,
    pub from: Vec<Address>,
    pub date: DateTime<FixedOffset>,
    /// Decomposed content, or why decomposition failed for this message.
    pub content: Result<MailContent, EmailError>,
}

impl Mail {
    /// Creates a record from envelope metadata with empty content.
    pub fn from_raw(raw: &RawMessage) -> Self {
        let date = raw
            .envelope
            .date
            .or(raw.internal_date)
            .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH.fixed_offset());

        Self {
            uid: raw.uid,
            message_id: raw.envelope.message_id.clone(),
            subject: raw.envelope.subject.clone(),
            from: raw.envelope.from.clone(),
            date,
            content: Ok(MailContent::default()),
        }
    }

    pub fn error(&self) -> Option<&EmailError> {
        self.content.as_ref().err()
    }

    pub fn bodies(&self) -> &[Vec<u8>] {
        self.content
            .as_ref()
            .map(|c| c.bodies.as_slice())
            .unwrap_or_default()
    }

    pub fn attachments(&self) -> &[Attachment] {
        self.content
            .as_ref()
            .map(|c| c.attachments.as_slice())
            .unwrap_or_default()
    }

    /// First sender, which decides the output directory.
    pub fn primary_sender(&self) -> Option<&Address> {
        self.from.first()
    }

    /// Address of the first sender, or an empty string.
    pub fn sender_address(&self) -> String {
        self.primary_sender()
            .map(Address::address)
            .unwrap_or_default()
    }

    /// Multi-line description used when a message is skipped.
    pub fn error_text(&self) -> String {
        let error = self
            .error()
            .map(ToString::to_string)
            .unwrap_or_default();
        format!(
            "Error: {}\nSubject: {}\nFrom: {}\nDate: {}\n",
            error,
            self.subject,
            self.sender_address(),
            self.date.to_rfc2822()
        )
    }
}

/// Decodes an RFC 2047 header value (`=?utf-8?q?...?=`) into text.
pub fn decode_header_text(raw: &[u8]) -> String {
    let mut header = b"Subject: ".to_vec();
    header.extend_from_slice(raw);
    header.extend_from_slice(b"\r\n\r\n");

    MessageParser::default()
        .parse(&header)
        .and_then(|message| message.subject().map(str::to_string))
        .unwrap_or_else(|| String::from_utf8_lossy(raw).into_owned())
}

/// Parses an envelope date, accepting anything the `Date:` header parser does.
pub fn parse_envelope_date(raw: &[u8]) -> Option<DateTime<FixedOffset>> {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date);
    }

    let header = format!("Date: {}\r\n\r\n", text);
    let message = MessageParser::default().parse(header.as_bytes())?;
    let date = message.date()?;
    DateTime::parse_from_rfc3339(&date.to_rfc3339()).ok()
}
