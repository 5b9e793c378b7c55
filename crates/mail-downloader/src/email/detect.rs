//! Content type detection from bytes.
//!
//! Sender supplied Content-Type headers are not trusted for classification.
//! Detection order: HTML tag signatures, binary magic numbers, plain text.
//! Bytes that look like text only take a magic-number match for text based
//! formats, so a body starting with "BM" stays text instead of becoming BMP.

/// Bytes inspected for text/binary classification.
const SNIFF_LEN: usize = 4096;

/// Leading tags that identify an HTML document (matched case-insensitively).
const HTML_SIGNATURES: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Magic-number matches accepted for bytes without binary content.
const TEXT_BASED_TYPES: &[&str] = &[
    "application/pdf",
    "application/postscript",
    "application/rtf",
];

/// A detected content type and its preferred file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentType {
    mime: &'static str,
    extension: &'static str,
}

impl ContentType {
    pub const HTML: ContentType = ContentType {
        mime: "text/html",
        extension: "html",
    };
    pub const PLAIN: ContentType = ContentType {
        mime: "text/plain",
        extension: "txt",
    };
    pub const OCTET_STREAM: ContentType = ContentType {
        mime: "application/octet-stream",
        extension: "",
    };

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    /// Extension without the leading dot; empty when unknown.
    pub fn extension(&self) -> &'static str {
        self.extension
    }

    pub fn is(&self, mime: &str) -> bool {
        self.mime.eq_ignore_ascii_case(mime.trim())
    }

    /// True when nothing more specific than `application/octet-stream` was found.
    pub fn is_generic(&self) -> bool {
        *self == Self::OCTET_STREAM
    }
}

/// Detects the content type of `bytes`.
pub fn detect(bytes: &[u8]) -> ContentType {
    if looks_like_html(bytes) {
        return ContentType::HTML;
    }

    let is_text = looks_like_text(bytes);

    let magic = infer::get(bytes).filter(|kind| !is_text || is_text_based(kind.mime_type()));
    if let Some(kind) = magic {
        return ContentType {
            mime: kind.mime_type(),
            extension: kind.extension(),
        };
    }

    if is_text {
        return ContentType::PLAIN;
    }

    ContentType::OCTET_STREAM
}

/// Preferred extension for a declared mime type, e.g. `image/png` -> `png`.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or(mime).trim();
    mime_guess::get_mime_extensions_str(essence).and_then(|exts| exts.first().copied())
}

fn looks_like_html(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let bytes = &bytes[start..];

    if bytes.starts_with(b"<!--") {
        return true;
    }

    HTML_SIGNATURES.iter().any(|signature| {
        bytes.len() > signature.len()
            && bytes[..signature.len()].eq_ignore_ascii_case(signature)
            && is_tag_terminator(bytes[signature.len()])
    })
}

fn is_tag_terminator(byte: u8) -> bool {
    byte == b'>' || byte.is_ascii_whitespace()
}

fn looks_like_text(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(SNIFF_LEN)];
    !sample.iter().any(|&b| is_binary_byte(b))
}

fn is_text_based(mime: &str) -> bool {
    mime.starts_with("text/") || TEXT_BASED_TYPES.contains(&mime)
}

fn is_binary_byte(byte: u8) -> bool {
    matches!(byte, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
