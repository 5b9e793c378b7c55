use std::fmt;

use chrono::{DateTime, FixedOffset};

use crate::email::Mail;
use crate::render::RenderFailure;

/// A mail for which no PDF could be produced.
#[derive(Debug)]
pub struct PdfError {
    pub uid: u32,
    pub sender: String,
    pub date: DateTime<FixedOffset>,
    pub subject: String,
    pub cause: RenderFailure,
}

impl PdfError {
    pub fn new(mail: &Mail, cause: RenderFailure) -> Self {
        Self {
            uid: mail.uid,
            sender: mail.sender_address(),
            date: mail.date,
            subject: mail.subject.clone(),
            cause,
        }
    }
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.cause)?;
        writeln!(f, "From: {}", self.sender)?;
        writeln!(f, "Date: {}", self.date.to_rfc2822())?;
        write!(f, "Subject: {}", self.subject)
    }
}

/// Outcome of a run that finished without a fatal error.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Records drained from the fetch stream.
    pub received: usize,
    /// Records skipped because decomposition failed.
    pub message_errors: usize,
    pub attachments_written: usize,
    pub attachments_filtered: usize,
    /// Attachments whose name the filesystem rejected as too long.
    pub attachments_name_too_long: usize,
    pub pdfs_written: usize,
    /// Records whose subject did not match the subject rule.
    pub subjects_skipped: usize,
    pub pdf_errors: Vec<PdfError>,
}

impl RunReport {
    pub fn has_pdf_errors(&self) -> bool {
        !self.pdf_errors.is_empty()
    }

    /// One-line tally for the end of a run.
    pub fn summary(&self) -> String {
        format!(
            "{} messages, {} skipped with errors, {} attachments written ({} filtered, {} names too long), {} PDFs written, {} subjects not matched, {} PDF errors",
            self.received,
            self.message_errors,
            self.attachments_written,
            self.attachments_filtered,
            self.attachments_name_too_long,
            self.pdfs_written,
            self.subjects_skipped,
            self.pdf_errors.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::{Address, RawMessage};
    use chrono::TimeZone;

    #[test]
    fn test_pdf_error_display() {
        let mut mail = Mail::from_raw(&RawMessage {
            uid: 9,
            envelope: Default::default(),
            internal_date: None,
            body: None,
        });
        mail.subject = "Order shipped".to_string();
        mail.from = vec![Address::new(None, Some("news"), Some("shop.example"))];
        mail.date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 5, 10, 0, 0)
            .unwrap();

        let error = PdfError::new(&mail, RenderFailure::NoRenderableBody);
        let text = error.to_string();

        assert!(text.starts_with("Error: no renderable body\n"));
        assert!(text.contains("From: news@shop.example"));
        assert!(text.contains("Date: Tue, 5 Mar 2024 10:00:00 +0000"));
        assert!(text.ends_with("Subject: Order shipped"));
    }

    #[test]
    fn test_summary() {
        let report = RunReport {
            received: 3,
            pdfs_written: 2,
            ..Default::default()
        };
        assert!(report.summary().starts_with("3 messages"));
        assert!(report.summary().contains("2 PDFs written"));
        assert!(!report.has_pdf_errors());
    }
}
