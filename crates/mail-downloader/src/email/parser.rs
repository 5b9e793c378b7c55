//! MIME part iteration on top of `mail-parser`.
//!
//! [`MessageParts`] walks the leaf parts of a parsed message in MIME order and
//! classifies each one as inline body content or as an attachment.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use log::debug;
use mail_parser::{HeaderName, Message, MessageParser, MessagePart, MimeHeaders, PartType};
use thiserror::Error;

use super::charset::CharsetRegistry;
use super::error::{EmailError, Result};

/// Lenient base64 used when re-decoding raw part bodies.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// How a part presents itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartDisposition {
    /// Displayed as message body.
    Inline,
    /// Carries a file. The declared filename may be empty.
    Attachment { filename: String },
}

/// Why a part body could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PartReadError {
    /// The body ended early or its transfer encoding was damaged.
    #[error("part body is truncated")]
    Truncated,

    #[error("{0}")]
    Failed(String),
}

/// One leaf MIME part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPart {
    pub disposition: PartDisposition,
    /// Declared `type/subtype`, if any.
    pub declared_type: Option<String>,
    pub content: std::result::Result<Vec<u8>, PartReadError>,
}

impl RawPart {
    pub fn inline(content: impl Into<Vec<u8>>) -> Self {
        Self {
            disposition: PartDisposition::Inline,
            declared_type: None,
            content: Ok(content.into()),
        }
    }

    pub fn attachment(filename: &str, content: impl Into<Vec<u8>>) -> Self {
        Self {
            disposition: PartDisposition::Attachment {
                filename: filename.to_string(),
            },
            declared_type: None,
            content: Ok(content.into()),
        }
    }

    pub fn with_declared_type(mut self, mime: &str) -> Self {
        self.declared_type = Some(mime.to_string());
        self
    }
}

/// Parses a raw RFC 5322 message.
///
/// The parser accepts any byte blob, so a message is only taken as MIME when
/// at least one header has a standard name.
pub fn parse_message(raw: &[u8]) -> Result<Message<'_>> {
    if raw.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(EmailError::ParseError("message body is empty".to_string()));
    }

    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| EmailError::ParseError("Failed to parse email message".to_string()))?;

    let has_known_header = message
        .headers()
        .iter()
        .any(|header| !matches!(header.name, HeaderName::Other(_)));
    if !has_known_header {
        return Err(EmailError::ParseError("no RFC 5322 header found".to_string()));
    }

    Ok(message)
}

/// Iterator over the leaf parts of a parsed message.
pub struct MessageParts<'a, 'x> {
    message: &'a Message<'x>,
    charsets: &'a CharsetRegistry,
    next: usize,
}

impl<'a, 'x> MessageParts<'a, 'x> {
    pub fn new(message: &'a Message<'x>, charsets: &'a CharsetRegistry) -> Self {
        Self {
            message,
            charsets,
            next: 0,
        }
    }

    fn read_part(&self, part: &MessagePart<'_>) -> RawPart {
        RawPart {
            disposition: classify(part),
            declared_type: declared_type(part),
            content: self.read_content(part),
        }
    }

    fn read_content(
        &self,
        part: &MessagePart<'_>,
    ) -> std::result::Result<Vec<u8>, PartReadError> {
        if part.is_encoding_problem {
            return Err(PartReadError::Truncated);
        }

        match &part.body {
            PartType::Text(text) | PartType::Html(text) => {
                match part
                    .content_type()
                    .and_then(|ct| ct.attribute("charset"))
                    .filter(|label| self.charsets.is_registered(label))
                {
                    Some(label) => self.redecode(part, label),
                    None => Ok(text.as_bytes().to_vec()),
                }
            }
            PartType::Binary(data) | PartType::InlineBinary(data) => Ok(data.to_vec()),
            PartType::Message(nested) => Ok(nested.raw_message().to_vec()),
            PartType::Multipart(_) => Ok(Vec::new()),
        }
    }

    /// Decodes a text part whose charset label only the registry knows.
    fn redecode(
        &self,
        part: &MessagePart<'_>,
        label: &str,
    ) -> std::result::Result<Vec<u8>, PartReadError> {
        let raw = self
            .message
            .raw_message()
            .get(part.offset_body as usize..part.offset_end as usize)
            .ok_or(PartReadError::Truncated)?;

        let bytes = decode_transfer_encoding(raw, part.content_transfer_encoding())?;
        let text = self
            .charsets
            .decode(label, &bytes)
            .ok_or_else(|| PartReadError::Failed(format!("no decoder for charset '{}'", label)))?;

        debug!("Re-decoded part with registered charset '{}'", label);
        Ok(text.into_bytes())
    }
}

impl Iterator for MessageParts<'_, '_> {
    type Item = RawPart;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(part) = self.message.parts.get(self.next) {
            self.next += 1;
            if matches!(part.body, PartType::Multipart(_)) {
                continue;
            }
            return Some(self.read_part(part));
        }
        None
    }
}

/// Inline unless the part says `attachment` or names a file without saying
/// `inline`.
fn classify(part: &MessagePart<'_>) -> PartDisposition {
    let disposition = part
        .content_disposition()
        .map(|d| d.ctype().to_ascii_lowercase());
    let filename = part.attachment_name();

    match (disposition.as_deref(), filename) {
        (Some("inline"), _) => PartDisposition::Inline,
        (Some("attachment"), name) | (_, name @ Some(_)) => PartDisposition::Attachment {
            filename: name.unwrap_or_default().to_string(),
        },
        _ => PartDisposition::Inline,
    }
}

fn declared_type(part: &MessagePart<'_>) -> Option<String> {
    part.content_type().map(|ct| match ct.subtype() {
        Some(subtype) => format!("{}/{}", ct.ctype(), subtype).to_ascii_lowercase(),
        None => ct.ctype().to_ascii_lowercase(),
    })
}

fn decode_transfer_encoding(
    raw: &[u8],
    encoding: Option<&str>,
) -> std::result::Result<Vec<u8>, PartReadError> {
    match encoding.map(|e| e.trim().to_ascii_lowercase()).as_deref() {
        Some("base64") => {
            let compact: Vec<u8> = raw
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            LENIENT_BASE64
                .decode(compact)
                .map_err(|e| PartReadError::Failed(format!("invalid base64 body: {}", e)))
        }
        Some("quoted-printable") => Ok(decode_quoted_printable(raw)),
        _ => Ok(raw.to_vec()),
    }
}

fn decode_quoted_printable(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] != b'=' {
            out.push(raw[i]);
            i += 1;
            continue;
        }

        match (raw.get(i + 1), raw.get(i + 2)) {
            // soft line break
            (Some(b'\r'), Some(b'\n')) => i += 3,
            (Some(b'\n'), _) => i += 2,
            (Some(&hi), Some(&lo)) => match (hex_value(hi), hex_value(lo)) {
                (Some(hi), Some(lo)) => {
                    out.push(hi << 4 | lo);
                    i += 3;
                }
                _ => {
                    out.push(b'=');
                    i += 1;
                }
            },
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }
    out
}

fn hex_value(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|v| v as u8)
}
