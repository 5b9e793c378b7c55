use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{validate_config, Config};
use crate::email::{CharsetRegistry, ImapClient, Mail, MailStreamFetcher, SequenceSet};
use crate::render::{render_mail, Renderer, WkhtmltopdfRenderer};
use crate::storage::FileStorage;

use super::config::PipelineConfig;
use super::error::PipelineError;
use super::progress::{ProgressEvent, ProgressReporter, RunPhase};
use super::report::{PdfError, RunReport};
use super::session::MailSession;

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    charsets: Arc<CharsetRegistry>,
    renderer: Arc<dyn Renderer>,
    storage: FileStorage,
}

impl Pipeline {
    /// Builds the charset registry once; it is shared read-only with the
    /// fetch task afterwards.
    pub fn new(config: PipelineConfig, renderer: Arc<dyn Renderer>) -> Result<Self, PipelineError> {
        let charsets = config
            .charset_registry()
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        let storage = FileStorage::new(&config.output_directory);

        Ok(Self {
            config: Arc::new(config),
            charsets: Arc::new(charsets),
            renderer,
            storage,
        })
    }

    /// Runs search, fetch and output for the configured date range.
    pub async fn run(&self, progress: &dyn ProgressReporter) -> Result<RunReport, PipelineError> {
        let span = info_span!(
            "run",
            username = %self.config.imap.username,
            mailbox = %self.config.imap.mailbox,
            from = %self.config.from,
            to = %self.config.to,
        );
        self.run_inner(progress).instrument(span).await
    }

    async fn run_inner(&self, progress: &dyn ProgressReporter) -> Result<RunReport, PipelineError> {
        progress.report(ProgressEvent::Phase {
            phase: RunPhase::Fetching,
            total: None,
        });

        let mut client = ImapClient::new(self.config.imap.clone());
        client.connect().await.map_err(PipelineError::Session)?;

        let uids = match self.search(&mut client).await {
            Ok(uids) => uids,
            Err(e) => {
                close_session(&mut client).await;
                return Err(e);
            }
        };

        if uids.is_empty() {
            info!("No messages in range");
            close_session(&mut client).await;
            progress.report(ProgressEvent::Phase {
                phase: RunPhase::Done,
                total: None,
            });
            return Ok(RunReport::default());
        }

        let mails = self
            .fetch_all(client, SequenceSet::from_uids(&uids), progress)
            .await?;

        let report = self.process_batch(&mails, progress).await?;

        progress.report(ProgressEvent::Phase {
            phase: RunPhase::Done,
            total: None,
        });
        Ok(report)
    }

    /// Fetches `uids` on a spawned task while draining its records here.
    ///
    /// The session is closed before the fetch result is inspected, so a fetch
    /// error still logs out. No record is returned when the fetch failed.
    async fn fetch_all<S: MailSession>(
        &self,
        mut session: S,
        uids: SequenceSet,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<Mail>, PipelineError> {
        progress.report(ProgressEvent::Phase {
            phase: RunPhase::Draining,
            total: Some(uids.len()),
        });

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let fetcher = MailStreamFetcher::new(Arc::clone(&self.charsets));
        let producer = tokio::spawn(
            async move {
                let result = session.fetch_into(&fetcher, &uids, tx).await;
                (session, result)
            }
            .in_current_span(),
        );

        let mails = drain(rx, progress).await;

        let (mut session, fetched) = producer
            .await
            .map_err(|e| PipelineError::Producer(e.to_string()))?;
        // No network activity after this point.
        close_session(&mut session).await;
        let fetched = fetched.map_err(PipelineError::Fetch)?;
        debug!(fetched, drained = mails.len(), "Fetch task finished");

        Ok(mails)
    }

    async fn search(&self, client: &mut ImapClient) -> Result<Vec<u32>, PipelineError> {
        let count = client
            .examine_folder(&self.config.imap.mailbox)
            .await
            .map_err(PipelineError::Session)?;
        debug!(count, "Mailbox opened");

        client
            .search_between(self.config.from, self.config.to)
            .await
            .map_err(PipelineError::Session)
    }

    /// Writes attachments and PDFs for every record, in order.
    ///
    /// Returns early only on a fatal storage error.
    pub async fn process_batch(
        &self,
        mails: &[Mail],
        progress: &dyn ProgressReporter,
    ) -> Result<RunReport, PipelineError> {
        progress.report(ProgressEvent::Phase {
            phase: RunPhase::Processing,
            total: Some(mails.len()),
        });

        let mut report = RunReport {
            received: mails.len(),
            ..Default::default()
        };

        for mail in mails {
            let span = info_span!("process_mail", uid = mail.uid);
            self.process_mail(mail, &mut report).instrument(span).await?;
            progress.report(ProgressEvent::Advance);
        }

        progress.report(ProgressEvent::Phase {
            phase: RunPhase::Reporting,
            total: None,
        });
        info!("{}", report.summary());
        Ok(report)
    }

    async fn process_mail(&self, mail: &Mail, report: &mut RunReport) -> Result<(), PipelineError> {
        if mail.error().is_some() {
            warn!("Skipping message\n{}", mail.error_text());
            report.message_errors += 1;
            return Ok(());
        }

        let directory = self
            .storage
            .mail_directory(&self.config.imap.username, mail);

        self.write_attachments(mail, &directory, report)?;

        if !self.config.subjects.matches(&mail.subject) {
            debug!(subject = %mail.subject, "Subject does not match, no PDF");
            report.subjects_skipped += 1;
            return Ok(());
        }

        match render_mail(self.renderer.as_ref(), mail).await {
            Ok(pdf) => {
                let path = self.storage.write_pdf(&directory, mail.uid, &pdf)?;
                info!(path = %path.display(), "Wrote PDF");
                report.pdfs_written += 1;
            }
            Err(cause) => {
                warn!(error = %cause, subject = %mail.subject, "No PDF for message");
                report.pdf_errors.push(PdfError::new(mail, cause));
            }
        }

        Ok(())
    }

    fn write_attachments(
        &self,
        mail: &Mail,
        directory: &Path,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        for attachment in mail.attachments() {
            if !self.config.mimetypes.matches(&attachment.mimetype) {
                debug!(
                    filename = %attachment.filename,
                    mimetype = %attachment.mimetype,
                    "Attachment type not selected"
                );
                report.attachments_filtered += 1;
                continue;
            }

            match self.storage.write_attachment(directory, attachment) {
                Ok(path) => {
                    info!(path = %path.display(), "Wrote attachment");
                    report.attachments_written += 1;
                }
                Err(e) if e.is_name_too_long() => {
                    warn!(
                        filename = %attachment.filename,
                        error = %e,
                        "Attachment name too long, skipped"
                    );
                    report.attachments_name_too_long += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Collects records until the producer closes the channel.
pub async fn drain(mut rx: mpsc::Receiver<Mail>, progress: &dyn ProgressReporter) -> Vec<Mail> {
    let mut mails = Vec::new();
    while let Some(mail) = rx.recv().await {
        progress.report(ProgressEvent::Advance);
        mails.push(mail);
    }
    mails
}

async fn close_session<S: MailSession>(session: &mut S) {
    if let Err(e) = session.logout().await {
        warn!(error = %e, "Logout failed");
    }
}

/// Validates `config` and runs one download with the configured renderer.
pub async fn download(
    config: &Config,
    progress: &dyn ProgressReporter,
) -> crate::Result<RunReport> {
    validate_config(config)?;
    let pipeline_config = PipelineConfig::from_config(config)?;
    let renderer = Arc::new(WkhtmltopdfRenderer::new(&config.renderer));
    let pipeline = Pipeline::new(pipeline_config, renderer)?;
    Ok(pipeline.run(progress).await?)
}
