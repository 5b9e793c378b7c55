//! Builders for raw messages as the fetch stream delivers them.

#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset};

use mail_downloader::email::{Address, EnvelopeMeta, RawMessage};

const BOUNDARY: &str = "=_part_boundary_42";

/// One MIME part of a built message.
pub enum Part {
    Html(String),
    Text(String),
    Attachment {
        filename: Option<String>,
        content_type: String,
        body: Vec<u8>,
    },
}

/// Builder for `RawMessage` values with a multipart/mixed body.
pub struct MessageBuilder {
    uid: u32,
    subject: String,
    mailbox: String,
    host: Option<String>,
    date: String,
    parts: Vec<Part>,
}

impl MessageBuilder {
    pub fn new(uid: u32) -> Self {
        Self {
            uid,
            subject: "Invoice".to_string(),
            mailbox: "billing".to_string(),
            host: Some("shop.example".to_string()),
            date: "Tue, 5 Mar 2024 10:00:00 +0000".to_string(),
            parts: Vec::new(),
        }
    }

    pub fn subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }

    pub fn host(mut self, host: Option<&str>) -> Self {
        self.host = host.map(str::to_string);
        self
    }

    /// RFC 2822 date used for both the header and the envelope.
    pub fn date(mut self, date: &str) -> Self {
        self.date = date.to_string();
        self
    }

    pub fn html(mut self, body: &str) -> Self {
        self.parts.push(Part::Html(body.to_string()));
        self
    }

    pub fn text(mut self, body: &str) -> Self {
        self.parts.push(Part::Text(body.to_string()));
        self
    }

    pub fn attachment(mut self, filename: Option<&str>, content_type: &str, body: &[u8]) -> Self {
        self.parts.push(Part::Attachment {
            filename: filename.map(str::to_string),
            content_type: content_type.to_string(),
            body: body.to_vec(),
        });
        self
    }

    pub fn body(&self) -> Vec<u8> {
        let sender = match &self.host {
            Some(host) => format!("{}@{}", self.mailbox, host),
            None => self.mailbox.clone(),
        };

        let mut out = String::new();
        out.push_str(&format!("From: {}\r\n", sender));
        out.push_str(&format!("Date: {}\r\n", self.date));
        out.push_str(&format!("Subject: {}\r\n", self.subject));
        out.push_str("MIME-Version: 1.0\r\n");
        out.push_str(&format!(
            "Content-Type: multipart/mixed; boundary=\"{}\"\r\n\r\n",
            BOUNDARY
        ));

        for part in &self.parts {
            out.push_str(&format!("--{}\r\n", BOUNDARY));
            match part {
                Part::Html(body) => {
                    out.push_str("Content-Type: text/html; charset=utf-8\r\n\r\n");
                    out.push_str(body);
                }
                Part::Text(body) => {
                    out.push_str("Content-Type: text/plain; charset=utf-8\r\n\r\n");
                    out.push_str(body);
                }
                Part::Attachment {
                    filename,
                    content_type,
                    body,
                } => {
                    out.push_str(&format!("Content-Type: {}\r\n", content_type));
                    match filename {
                        Some(name) => out.push_str(&format!(
                            "Content-Disposition: attachment; filename=\"{}\"\r\n",
                            name
                        )),
                        None => out.push_str("Content-Disposition: attachment\r\n"),
                    }
                    out.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
                    out.push_str(&STANDARD.encode(body));
                }
            }
            out.push_str("\r\n");
        }
        out.push_str(&format!("--{}--\r\n", BOUNDARY));

        out.into_bytes()
    }

    pub fn build(self) -> RawMessage {
        let body = self.body();
        let date: Option<DateTime<FixedOffset>> = DateTime::parse_from_rfc2822(&self.date).ok();

        RawMessage {
            uid: self.uid,
            envelope: EnvelopeMeta {
                message_id: format!("<{}@test.example>", self.uid),
                subject: self.subject,
                from: vec![Address::new(
                    None,
                    Some(&self.mailbox),
                    self.host.as_deref(),
                )],
                date,
            },
            internal_date: None,
            body: Some(body),
        }
    }
}

/// Smallest byte sequence `infer` recognises as PNG.
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0, 0, 0, 13, b'I', b'H', b'D', b'R']);
    bytes
}

/// Bytes `infer` recognises as PDF.
pub fn pdf_bytes() -> Vec<u8> {
    b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF\n".to_vec()
}
