//! Splits a message into inline bodies and attachments.

use tracing::{debug, warn};
use uuid::Uuid;

use super::detect::{detect, extension_for_mime};
use super::error::{EmailError, Result};
use super::message::{Attachment, MailContent};
use super::parser::{PartDisposition, PartReadError, RawPart};

/// Decomposes the parts of one message.
#[derive(Debug, Clone, Copy)]
pub struct MimeDecomposer {
    uid: u32,
}

impl MimeDecomposer {
    pub fn new(uid: u32) -> Self {
        Self { uid }
    }

    /// Consumes `parts` in MIME order.
    ///
    /// A truncated inline part is skipped. Any other read failure discards
    /// everything collected so far and is returned as the message error.
    pub fn decompose<I>(&self, parts: I) -> Result<MailContent>
    where
        I: IntoIterator<Item = RawPart>,
    {
        let mut content = MailContent::default();

        for part in parts {
            match part.disposition {
                PartDisposition::Inline => match part.content {
                    Ok(body) => content.bodies.push(body),
                    Err(PartReadError::Truncated) => {
                        warn!(uid = self.uid, "Skipping truncated inline part");
                    }
                    Err(e) => return Err(self.part_error(e)),
                },
                PartDisposition::Attachment { filename } => {
                    let body = part.content.map_err(|e| self.part_error(e))?;
                    let attachment =
                        self.attachment(&filename, part.declared_type.as_deref(), body);
                    debug!(
                        uid = self.uid,
                        filename = %attachment.filename,
                        mimetype = %attachment.mimetype,
                        "Extracted attachment"
                    );
                    content.attachments.push(attachment);
                }
            }
        }

        Ok(content)
    }

    fn attachment(
        &self,
        declared: &str,
        declared_type: Option<&str>,
        body: Vec<u8>,
    ) -> Attachment {
        let detected = detect(&body);
        let (mimetype, extension) = match declared_type {
            Some(declared_type) if detected.is_generic() && !declared_type.is_empty() => (
                declared_type.to_string(),
                extension_for_mime(declared_type).unwrap_or_default(),
            ),
            _ => (detected.mime().to_string(), detected.extension()),
        };

        let filename = match sanitize_filename(declared) {
            Some(name) => name,
            None => synthetic_filename(self.uid, extension),
        };

        Attachment {
            filename,
            body,
            mimetype,
        }
    }

    fn part_error(&self, err: PartReadError) -> EmailError {
        EmailError::PartRead {
            uid: self.uid,
            reason: err.to_string(),
        }
    }
}

/// Makes a declared name safe to use as a single path component.
///
/// Drops replacement characters and control characters and turns path
/// separators into `-`. Returns `None` when nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let sanitized: String = name
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER && !c.is_control())
        .map(|c| if c == '/' || c == '\\' { '-' } else { c })
        .collect();

    match sanitized.trim() {
        "" | "." | ".." => None,
        _ => Some(sanitized),
    }
}

/// `{uid}-{uuid}{.ext}`; the extension is omitted when unknown.
pub fn synthetic_filename(uid: u32, extension: &str) -> String {
    let token = Uuid::new_v4();
    if extension.is_empty() {
        format!("{}-{}", uid, token)
    } else {
        format!("{}-{}.{}", uid, token, extension)
    }
}
