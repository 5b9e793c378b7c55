//! Test harness for the output stage of a run.
//!
//! Messages go through the same fetcher and pipeline code a real run uses;
//! only the IMAP session and the renderer binary are replaced.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use assert_fs::TempDir;
use async_trait::async_trait;
use chrono::NaiveDate;

use mail_downloader::config::ImapSettings;
use mail_downloader::email::{CharsetRegistry, Mail, MailStreamFetcher, RawMessage};
use mail_downloader::pipeline::{NoopProgress, Pipeline, PipelineConfig, RunReport};
use mail_downloader::render::{RenderError, Renderer};
use mail_downloader::FilterRule;

pub const USERNAME: &str = "me@example.com";

/// Renderer that prefixes the markup with a PDF header, or fails on demand.
#[derive(Default)]
pub struct FakeRenderer {
    fail: bool,
    calls: Mutex<Vec<Vec<u8>>>,
}

impl FakeRenderer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Markup received by each render call, in order.
    pub fn calls(&self) -> Vec<Vec<u8>> {
        self.calls.lock().expect("renderer lock").clone()
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(&self, markup: &[u8]) -> Result<Vec<u8>, RenderError> {
        self.calls.lock().expect("renderer lock").push(markup.to_vec());
        if self.fail {
            return Err(RenderError::Exit {
                status: "exit status: 1".to_string(),
                message: "Failed loading page".to_string(),
            });
        }
        let mut pdf = b"%PDF-1.4\n".to_vec();
        pdf.extend_from_slice(markup);
        Ok(pdf)
    }
}

/// Isolated output directory plus the settings a run would use.
pub struct TestHarness {
    pub output: TempDir,
    pub renderer: Arc<FakeRenderer>,
    mimetypes: FilterRule,
    subjects: FilterRule,
    charset_aliases: Vec<(String, String)>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_renderer(FakeRenderer::default())
    }

    pub fn with_renderer(renderer: FakeRenderer) -> Self {
        Self {
            output: TempDir::new().expect("Failed to create temp directory"),
            renderer: Arc::new(renderer),
            mimetypes: FilterRule::match_all(),
            subjects: FilterRule::match_all(),
            charset_aliases: Vec::new(),
        }
    }

    pub fn mimetypes<S: AsRef<str>>(mut self, groups: &[S]) -> Self {
        self.mimetypes = FilterRule::new(groups);
        self
    }

    pub fn subjects<S: AsRef<str>>(mut self, groups: &[S]) -> Self {
        self.subjects = FilterRule::new(groups);
        self
    }

    pub fn charset_alias(mut self, alias: &str, target: &str) -> Self {
        self.charset_aliases
            .push((alias.to_string(), target.to_string()));
        self
    }

    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            imap: ImapSettings {
                server: "imap.test.example".to_string(),
                username: USERNAME.to_string(),
                password: Some("secret".to_string()),
                ..Default::default()
            },
            from: NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date"),
            to: NaiveDate::from_ymd_opt(2024, 4, 1).expect("valid date"),
            mimetypes: self.mimetypes.clone(),
            subjects: self.subjects.clone(),
            output_directory: self.output.path().to_path_buf(),
            charset_aliases: self.charset_aliases.clone(),
            channel_capacity: 4,
        }
    }

    /// Builds records the way the fetch task does.
    pub fn build_mails(&self, raw: &[RawMessage]) -> Vec<Mail> {
        let config = self.config();
        let charsets = config.charset_registry().expect("known charset aliases");
        let fetcher = MailStreamFetcher::new(Arc::new(charsets));
        raw.iter()
            .map(|message| fetcher.build_mail(message).expect("message has a body"))
            .collect()
    }

    /// Runs the output stage over `raw` and returns the report.
    pub async fn process(&self, raw: &[RawMessage]) -> RunReport {
        let mails = self.build_mails(raw);
        let renderer: Arc<dyn Renderer> = self.renderer.clone();
        let pipeline = Pipeline::new(self.config(), renderer).expect("pipeline");
        pipeline
            .process_batch(&mails, &NoopProgress)
            .await
            .expect("no fatal storage error")
    }

    pub fn registry(&self) -> CharsetRegistry {
        self.config().charset_registry().expect("known charset aliases")
    }
}
