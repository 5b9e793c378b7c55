use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::email::{EmailError, ImapClient, Mail, MailStreamFetcher, SequenceSet};

/// The mailbox side of a run once the UIDs are known.
///
/// The session is moved into the fetch task and handed back when the fetch
/// ends, so it can be closed after the channel is drained.
#[async_trait]
pub trait MailSession: Send + 'static {
    /// Sends one record per fetched message on `tx`; returns the count sent.
    async fn fetch_into(
        &mut self,
        fetcher: &MailStreamFetcher,
        uids: &SequenceSet,
        tx: mpsc::Sender<Mail>,
    ) -> Result<usize, EmailError>;

    async fn logout(&mut self) -> Result<(), EmailError>;
}

#[async_trait]
impl MailSession for ImapClient {
    async fn fetch_into(
        &mut self,
        fetcher: &MailStreamFetcher,
        uids: &SequenceSet,
        tx: mpsc::Sender<Mail>,
    ) -> Result<usize, EmailError> {
        fetcher.fetch(self, uids, tx).await
    }

    async fn logout(&mut self) -> Result<(), EmailError> {
        self.disconnect().await
    }
}
