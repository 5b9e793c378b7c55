//! Background producer that turns fetched messages into [`Mail`] records.

use std::pin::pin;
use std::sync::Arc;

use chrono::DateTime;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::charset::CharsetRegistry;
use super::client::ImapClient;
use super::decompose::MimeDecomposer;
use super::error::{EmailError, Result};
use super::message::{Mail, RawMessage};
use super::parser::{parse_message, MessageParts};
use super::seqset::SequenceSet;

/// Fetches messages and emits one [`Mail`] per delivered message.
#[derive(Debug, Clone)]
pub struct MailStreamFetcher {
    charsets: Arc<CharsetRegistry>,
}

impl MailStreamFetcher {
    pub fn new(charsets: Arc<CharsetRegistry>) -> Self {
        Self { charsets }
    }

    /// Fetches `uids` and sends every record on `tx`.
    ///
    /// Returns the number of records sent. The channel closes when `tx` is
    /// dropped, which happens when this returns.
    #[instrument(name = "fetch", skip_all, fields(requested = uids.len()))]
    pub async fn fetch(
        &self,
        client: &mut ImapClient,
        uids: &SequenceSet,
        tx: mpsc::Sender<Mail>,
    ) -> Result<usize> {
        if uids.is_empty() {
            return Ok(0);
        }

        let stream = client.fetch_stream(uids).await?;
        let sent = self.pump(stream, &tx).await?;

        if sent < uids.len() {
            warn!(
                requested = uids.len(),
                received = sent,
                "Server returned fewer messages than requested"
            );
        } else {
            info!(received = sent, "Fetch complete");
        }
        Ok(sent)
    }

    /// Drives `stream` to completion, forwarding one record per message.
    ///
    /// Stops at the first stream error or at a message without a body
    /// section; both end the whole fetch.
    pub async fn pump<S>(&self, stream: S, tx: &mpsc::Sender<Mail>) -> Result<usize>
    where
        S: Stream<Item = Result<RawMessage>>,
    {
        let mut stream = pin!(stream);
        let mut sent = 0;

        while let Some(item) = stream.next().await {
            let raw = item?;
            let mail = self.build_mail(&raw)?;
            tx.send(mail).await.map_err(|_| EmailError::ChannelClosed)?;
            sent += 1;
        }

        Ok(sent)
    }

    /// Builds the record for one message. Only a missing body section is an
    /// error; parse and decomposition failures are stored on the record.
    pub fn build_mail(&self, raw: &RawMessage) -> Result<Mail> {
        let body = raw
            .body
            .as_deref()
            .ok_or(EmailError::MissingBody { uid: raw.uid })?;

        let mut mail = Mail::from_raw(raw);

        let message = match parse_message(body) {
            Ok(message) => message,
            Err(e) => {
                warn!(uid = raw.uid, error = %e, "Message body is not valid MIME");
                mail.content = Err(e);
                return Ok(mail);
            }
        };

        if raw.envelope.date.is_none() {
            if let Some(date) = message
                .date()
                .and_then(|d| DateTime::parse_from_rfc3339(&d.to_rfc3339()).ok())
            {
                mail.date = date;
            }
        }

        let parts = MessageParts::new(&message, &self.charsets);
        mail.content = MimeDecomposer::new(raw.uid).decompose(parts);

        match &mail.content {
            Ok(content) => debug!(
                uid = raw.uid,
                bodies = content.bodies.len(),
                attachments = content.attachments.len(),
                "Decomposed message"
            ),
            Err(e) => warn!(uid = raw.uid, error = %e, "Message decomposition failed"),
        }

        Ok(mail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::message::{Address, EnvelopeMeta};
    use chrono::{Datelike, TimeZone, Utc};
    use futures_util::stream;

    const SIMPLE: &[u8] = b"From: Shop <billing@shop.example>\r\n\
Date: Tue, 5 Mar 2024 10:00:00 +0000\r\n\
Subject: Invoice\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<html><body>Total: 10 EUR</body></html>\r\n";

    fn fetcher() -> MailStreamFetcher {
        MailStreamFetcher::new(Arc::new(CharsetRegistry::with_defaults()))
    }

    fn raw(uid: u32, body: Option<&[u8]>) -> RawMessage {
        RawMessage {
            uid,
            envelope: EnvelopeMeta {
                message_id: format!("<{}@shop.example>", uid),
                subject: "Invoice".to_string(),
                from: vec![Address::new(Some("Shop"), Some("billing"), Some("shop.example"))],
                date: Some(
                    Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0)
                        .unwrap()
                        .fixed_offset(),
                ),
            },
            internal_date: None,
            body: body.map(<[u8]>::to_vec),
        }
    }

    #[test]
    fn test_build_mail_copies_envelope_and_decomposes() {
        let mail = fetcher().build_mail(&raw(11, Some(SIMPLE))).unwrap();

        assert_eq!(mail.uid, 11);
        assert_eq!(mail.subject, "Invoice");
        assert_eq!(mail.sender_address(), "billing@shop.example");
        assert!(mail.error().is_none());
        assert_eq!(mail.bodies().len(), 1);
        assert!(mail.attachments().is_empty());
    }

    #[test]
    fn test_missing_body_is_fatal() {
        let result = fetcher().build_mail(&raw(12, None));
        assert!(matches!(result, Err(EmailError::MissingBody { uid: 12 })));
    }

    #[test]
    fn test_unparseable_body_is_recorded_on_mail() {
        let mail = fetcher().build_mail(&raw(13, Some(b"   ".as_slice()))).unwrap();

        assert!(matches!(mail.error(), Some(EmailError::ParseError(_))));
        assert_eq!(mail.subject, "Invoice");
    }

    #[test]
    fn test_garbage_body_is_a_message_error() {
        for (uid, body) in [
            (15, b"\x00\x01\x02 garbage".as_slice()),
            (16, b"this is not a mime message at all".as_slice()),
            (17, b"\xff\xfe\xfd".as_slice()),
        ] {
            let mail = fetcher().build_mail(&raw(uid, Some(body))).unwrap();

            assert!(
                matches!(mail.error(), Some(EmailError::ParseError(_))),
                "uid {} not marked as failed",
                uid
            );
            assert!(mail.bodies().is_empty());
        }
    }

    #[test]
    fn test_date_header_used_when_envelope_has_none() {
        let mut message = raw(14, Some(SIMPLE));
        message.envelope.date = None;
        message.internal_date = Some(
            Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0)
                .unwrap()
                .fixed_offset(),
        );

        let mail = fetcher().build_mail(&message).unwrap();
        assert_eq!(mail.date.month(), 3);
        assert_eq!(mail.date.day(), 5);
    }

    #[tokio::test]
    async fn test_pump_emits_every_record_in_stream_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let items = vec![
            Ok(raw(3, Some(SIMPLE))),
            Ok(raw(1, Some(b" ".as_slice()))),
            Ok(raw(2, Some(SIMPLE))),
        ];

        let sent = fetcher().pump(stream::iter(items), &tx).await.unwrap();
        drop(tx);

        assert_eq!(sent, 3);
        let mut uids = Vec::new();
        while let Some(mail) = rx.recv().await {
            uids.push(mail.uid);
        }
        assert_eq!(uids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_pump_stops_on_stream_error() {
        let (tx, mut rx) = mpsc::channel(8);
        let items = vec![
            Ok(raw(1, Some(SIMPLE))),
            Err(EmailError::ProtocolError("connection reset".to_string())),
            Ok(raw(2, Some(SIMPLE))),
        ];

        let result = fetcher().pump(stream::iter(items), &tx).await;
        drop(tx);

        assert!(matches!(result, Err(EmailError::ProtocolError(_))));
        assert_eq!(rx.recv().await.map(|m| m.uid), Some(1));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_pump_stops_on_missing_body() {
        let (tx, _rx) = mpsc::channel(8);
        let items = vec![Ok(raw(1, None)), Ok(raw(2, Some(SIMPLE)))];

        let result = fetcher().pump(stream::iter(items), &tx).await;
        assert!(matches!(result, Err(EmailError::MissingBody { uid: 1 })));
    }

    #[tokio::test]
    async fn test_pump_reports_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let result = fetcher()
            .pump(stream::iter(vec![Ok(raw(1, Some(SIMPLE)))]), &tx)
            .await;
        assert!(matches!(result, Err(EmailError::ChannelClosed)));
    }
}
