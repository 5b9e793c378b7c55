//! IMAP client for the mailbox being downloaded.

use async_imap::imap_proto::{Address as ImapAddress, Envelope};
use async_imap::types::Fetch;
use async_imap::Session;
use async_native_tls::TlsConnector;
use chrono::NaiveDate;
use futures_util::{Stream, StreamExt};
use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};

use crate::config::ImapSettings;

use super::error::{EmailError, Result};
use super::message::{decode_header_text, parse_envelope_date, Address, EnvelopeMeta, RawMessage};
use super::seqset::SequenceSet;

/// Type alias for the underlying async stream (using async-std compatible TcpStream).
type AsyncTcpStream = async_io::Async<std::net::TcpStream>;

/// Type alias for the TLS stream used by the IMAP session.
type TlsStream = async_native_tls::TlsStream<AsyncTcpStream>;

/// Data items requested for every message. `BODY.PEEK[]` leaves `\Seen` alone.
const FETCH_ITEMS: &str = "(UID ENVELOPE INTERNALDATE BODY.PEEK[])";

/// IMAP client that reads one mailbox.
pub struct ImapClient {
    session: Option<Session<TlsStream>>,
    settings: ImapSettings,
    current_folder: Option<String>,
}

impl ImapClient {
    pub fn new(settings: ImapSettings) -> Self {
        Self {
            session: None,
            settings,
            current_folder: None,
        }
    }

    /// Connects over TLS and logs in.
    pub async fn connect(&mut self) -> Result<()> {
        if self.session.is_some() {
            debug!("Already connected to IMAP server");
            return Ok(());
        }

        let password = self.get_password()?;

        let addr = format!("{}:{}", self.settings.server, self.settings.port);
        info!("Connecting to IMAP server at {}", addr);

        // Establish TCP connection using std::net and wrap with async-io
        let std_stream = std::net::TcpStream::connect(&addr)
            .map_err(|e| EmailError::ConnectionFailed(e.to_string()))?;
        std_stream
            .set_nonblocking(true)
            .map_err(|e| EmailError::ConnectionFailed(e.to_string()))?;
        let tcp_stream = async_io::Async::new(std_stream)
            .map_err(|e| EmailError::ConnectionFailed(e.to_string()))?;

        let tls_stream = TlsConnector::new()
            .connect(&self.settings.server, tcp_stream)
            .await?;

        let client = async_imap::Client::new(tls_stream);
        let session = self.login(client, &password).await?;

        info!("Logged in as {}", self.settings.username);
        self.session = Some(session);
        Ok(())
    }

    async fn login(
        &self,
        client: async_imap::Client<TlsStream>,
        password: &SecretString,
    ) -> Result<Session<TlsStream>> {
        client
            .login(&self.settings.username, password.expose_secret())
            .await
            .map_err(|(e, _)| EmailError::AuthenticationFailed(e.to_string()))
    }

    fn get_password(&self) -> Result<SecretString> {
        crate::secrets::resolve_secret(
            self.settings.password.as_deref(),
            self.settings.password_file.as_deref(),
            self.settings.password_env_var.as_deref(),
        )
        .map_err(|e| EmailError::CredentialsNotFound(e.to_string()))
    }

    fn session(&mut self) -> Result<&mut Session<TlsStream>> {
        self.session
            .as_mut()
            .ok_or_else(|| EmailError::ConnectionFailed("Not connected".to_string()))
    }

    /// Opens a folder in read-only mode using EXAMINE (not SELECT) and returns
    /// its message count.
    pub async fn examine_folder(&mut self, folder: &str) -> Result<u32> {
        let session = self.session()?;

        info!("Examining folder: {}", folder);

        let mailbox = session.examine(folder).await.map_err(|e| {
            if e.to_string().contains("Mailbox doesn't exist") || e.to_string().contains("NO") {
                EmailError::FolderNotFound(folder.to_string())
            } else {
                EmailError::ProtocolError(e.to_string())
            }
        })?;

        self.current_folder = Some(folder.to_string());
        debug!("Folder '{}' holds {} messages", folder, mailbox.exists);
        Ok(mailbox.exists)
    }

    pub fn current_folder(&self) -> Option<&str> {
        self.current_folder.as_deref()
    }

    /// UIDs of messages dated on or after `from` and before `to`, ascending.
    pub async fn search_between(&mut self, from: NaiveDate, to: NaiveDate) -> Result<Vec<u32>> {
        let session = self.session()?;

        let query = date_range_query(from, to);
        debug!("Searching with query: {}", query);

        let uids = session.uid_search(&query).await?;

        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();
        debug!("Found {} messages between {} and {}", uid_list.len(), from, to);
        Ok(uid_list)
    }

    /// Fetches envelope, internal date and full body of every UID in `uids`.
    ///
    /// Messages arrive in server order. A protocol error is yielded as an
    /// `Err` item.
    pub async fn fetch_stream(
        &mut self,
        uids: &SequenceSet,
    ) -> Result<impl Stream<Item = Result<RawMessage>> + Send + '_> {
        let session = self.session()?;

        debug!("Fetching {} messages with UIDs: {}", uids.len(), uids);

        let messages = session.uid_fetch(uids.to_string(), FETCH_ITEMS).await?;

        Ok(messages.map(|item| {
            let fetch = item?;
            raw_message(&fetch)
        }))
    }

    /// Logs out and drops the session.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            info!("Disconnecting from IMAP server");
            session.logout().await?;
        }
        self.current_folder = None;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

impl Drop for ImapClient {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("ImapClient dropped without explicit disconnect - session will be closed");
        }
    }
}

/// `SINCE from BEFORE to`; IMAP compares dates without time or zone.
pub fn date_range_query(from: NaiveDate, to: NaiveDate) -> String {
    format!(
        "SINCE {} BEFORE {}",
        from.format("%d-%b-%Y"),
        to.format("%d-%b-%Y")
    )
}

fn raw_message(fetch: &Fetch) -> Result<RawMessage> {
    let uid = fetch.uid.ok_or_else(|| {
        EmailError::ProtocolError(format!(
            "FETCH response for message {} carries no UID",
            fetch.message
        ))
    })?;

    Ok(RawMessage {
        uid,
        envelope: fetch.envelope().map(envelope_meta).unwrap_or_default(),
        internal_date: fetch.internal_date(),
        body: fetch.body().map(<[u8]>::to_vec),
    })
}

fn envelope_meta(envelope: &Envelope<'_>) -> EnvelopeMeta {
    EnvelopeMeta {
        message_id: envelope
            .message_id
            .as_deref()
            .map(|id| String::from_utf8_lossy(id).trim().to_string())
            .unwrap_or_default(),
        subject: envelope
            .subject
            .as_deref()
            .map(decode_header_text)
            .unwrap_or_default(),
        from: envelope
            .from
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(address)
            .collect(),
        date: envelope.date.as_deref().and_then(parse_envelope_date),
    }
}

fn address(addr: &ImapAddress<'_>) -> Address {
    Address {
        name: addr.name.as_deref().map(decode_header_text),
        mailbox: addr
            .mailbox
            .as_deref()
            .map(|m| String::from_utf8_lossy(m).into_owned()),
        host: addr
            .host
            .as_deref()
            .map(|h| String::from_utf8_lossy(h).into_owned()),
    }
}
