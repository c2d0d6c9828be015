//! Mailbox access — capability traits plus the real IMAP implementation.
//!
//! The poll cycle only sees the `Mailbox`/`MailboxSession` traits, so tests
//! inject in-memory fakes. `ImapMailbox` speaks raw IMAP over rustls with
//! UID semantics and `BODY.PEEK[]` fetches, leaving server-side \Seen state
//! untouched.

use std::io::Write as IoWrite;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mail_parser::MessageParser;
use secrecy::{ExposeSecret, SecretString};

use crate::config::AgentConfig;
use crate::error::MailboxError;
use crate::text;

/// A fetched message. Immutable; discarded after processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    /// Mailbox-assigned UID, strictly increasing, the sole identity key.
    pub uid: u32,
    pub subject: String,
    pub sender: String,
    pub date: String,
    pub body: String,
}

/// Something that can open an authenticated mailbox session.
#[async_trait]
pub trait Mailbox: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn MailboxSession>, MailboxError>;
}

/// One open mailbox session. Read-only: listing and fetching must not
/// alter server-side message state.
#[async_trait]
pub trait MailboxSession: Send {
    /// UIDs strictly greater than `last_uid`, sorted ascending.
    async fn uids_after(&mut self, last_uid: u32) -> Result<Vec<u32>, MailboxError>;

    /// Fetch the full message for `uid`.
    async fn fetch(&mut self, uid: u32) -> Result<MailMessage, MailboxError>;

    /// Tear down the session. Called on both success and failure paths;
    /// must not fail.
    async fn close(&mut self);
}

// ── IMAP implementation ─────────────────────────────────────────────

const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// IMAP-over-TLS mailbox.
pub struct ImapMailbox {
    host: String,
    port: u16,
    address: String,
    password: SecretString,
}

impl ImapMailbox {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            host: config.imap_host.clone(),
            port: config.imap_port,
            address: config.mailbox_address.clone(),
            password: config.mailbox_password.clone(),
        }
    }
}

#[async_trait]
impl Mailbox for ImapMailbox {
    async fn connect(&self) -> Result<Box<dyn MailboxSession>, MailboxError> {
        let host = self.host.clone();
        let port = self.port;
        let address = self.address.clone();
        let password = self.password.clone();

        // Blocking TLS/IMAP handshake off the async runtime.
        let session = tokio::task::spawn_blocking(move || {
            ImapSession::open(&host, port, &address, password.expose_secret())
        })
        .await
        .map_err(|e| MailboxError::Protocol(format!("connect task panicked: {e}")))??;

        Ok(Box::new(session))
    }
}

/// One authenticated IMAP session over rustls.
struct ImapSession {
    tls: rustls::StreamOwned<rustls::ClientConnection, TcpStream>,
    tag_counter: u32,
}

/// Untagged lines plus whether the tagged completion was OK.
struct ImapResponse {
    lines: Vec<String>,
    ok: bool,
}

impl ImapSession {
    fn open(
        host: &str,
        port: u16,
        address: &str,
        password: &str,
    ) -> Result<Self, MailboxError> {
        let tcp = TcpStream::connect((host, port)).map_err(|e| MailboxError::Connect {
            host: host.to_string(),
            reason: e.to_string(),
        })?;
        tcp.set_read_timeout(Some(READ_TIMEOUT))?;

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        );
        let server_name = rustls_pki_types::ServerName::try_from(host.to_string())
            .map_err(|e| MailboxError::Connect {
                host: host.to_string(),
                reason: e.to_string(),
            })?;
        let conn = rustls::ClientConnection::new(tls_config, server_name)?;

        let mut session = Self {
            tls: rustls::StreamOwned::new(conn, tcp),
            tag_counter: 0,
        };

        // Server greeting precedes any command.
        session.read_line()?;

        let login = session.command(&format!("LOGIN \"{address}\" \"{password}\""))?;
        if !login.ok {
            return Err(MailboxError::AuthFailed {
                address: address.to_string(),
            });
        }

        let select = session.command("SELECT \"INBOX\"")?;
        if !select.ok {
            return Err(MailboxError::SelectFailed {
                mailbox: "INBOX".to_string(),
            });
        }

        Ok(session)
    }

    /// Read one CRLF-terminated line, CRLF included.
    fn read_line(&mut self) -> Result<String, MailboxError> {
        let mut buf = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            match std::io::Read::read(&mut self.tls, &mut byte) {
                Ok(0) => {
                    return Err(MailboxError::Protocol("connection closed".to_string()));
                }
                Ok(_) => {
                    buf.push(byte[0]);
                    if buf.ends_with(b"\r\n") {
                        return Ok(String::from_utf8_lossy(&buf).to_string());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Send a tagged command and read lines up to its tagged completion.
    fn command(&mut self, cmd: &str) -> Result<ImapResponse, MailboxError> {
        self.tag_counter += 1;
        let tag = format!("A{}", self.tag_counter);

        let full = format!("{tag} {cmd}\r\n");
        IoWrite::write_all(&mut self.tls, full.as_bytes())?;
        IoWrite::flush(&mut self.tls)?;

        let done_prefix = format!("{tag} ");
        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            if line.starts_with(&done_prefix) {
                let ok = line[done_prefix.len()..].starts_with("OK");
                return Ok(ImapResponse { lines, ok });
            }
            lines.push(line);
        }
    }
}

#[async_trait]
impl MailboxSession for ImapSession {
    async fn uids_after(&mut self, last_uid: u32) -> Result<Vec<u32>, MailboxError> {
        // Requires the multi-thread runtime; the cycle is sequential so a
        // blocked worker thread is acceptable here.
        tokio::task::block_in_place(|| {
            let range_start = last_uid.saturating_add(1);
            let resp = self.command(&format!("UID SEARCH UID {range_start}:*"))?;
            if !resp.ok {
                return Err(MailboxError::Protocol("UID SEARCH failed".to_string()));
            }
            Ok(parse_search_uids(&resp.lines, last_uid))
        })
    }

    async fn fetch(&mut self, uid: u32) -> Result<MailMessage, MailboxError> {
        tokio::task::block_in_place(|| {
            let resp = self.command(&format!("UID FETCH {uid} (BODY.PEEK[])"))?;
            if !resp.ok {
                return Err(MailboxError::Fetch {
                    uid,
                    reason: "server rejected UID FETCH".to_string(),
                });
            }

            let raw = fetch_payload(&resp.lines).ok_or_else(|| MailboxError::Fetch {
                uid,
                reason: "no payload in FETCH response".to_string(),
            })?;

            let parsed = MessageParser::default()
                .parse(raw.as_bytes())
                .ok_or_else(|| MailboxError::Fetch {
                    uid,
                    reason: "unparseable message".to_string(),
                })?;

            Ok(MailMessage {
                uid,
                subject: text::normalize(parsed.subject().unwrap_or_default()),
                sender: text::normalize(&format_sender(&parsed)),
                date: parsed.date().map(|d| d.to_rfc3339()).unwrap_or_default(),
                body: text::extract_text(&parsed),
            })
        })
    }

    async fn close(&mut self) {
        let _ = tokio::task::block_in_place(|| {
            let _ = self.command("CLOSE");
            self.command("LOGOUT")
        });
    }
}

/// Decoded display form of the From header: `Name <addr>`, bare address,
/// or "unknown".
fn format_sender(parsed: &mail_parser::Message) -> String {
    let Some(addr) = parsed.from().and_then(|a| a.first()) else {
        return "unknown".to_string();
    };
    let address = addr.address().unwrap_or_default();
    match addr.name() {
        Some(name) if !name.is_empty() => format!("{name} <{address}>"),
        _ if !address.is_empty() => address.to_string(),
        _ => "unknown".to_string(),
    }
}

/// Collect UIDs from `* SEARCH` lines, keeping only those past the cursor.
///
/// `UID SEARCH UID n:*` returns the highest existing UID even when the
/// range is empty, so filtering is not optional.
fn parse_search_uids(lines: &[String], last_uid: u32) -> Vec<u32> {
    let mut uids: Vec<u32> = Vec::new();
    for line in lines {
        if let Some(rest) = line.strip_prefix("* SEARCH") {
            uids.extend(
                rest.split_whitespace()
                    .filter_map(|tok| tok.parse::<u32>().ok())
                    .filter(|&uid| uid > last_uid),
            );
        }
    }
    uids.sort_unstable();
    uids.dedup();
    uids
}

/// The literal body of a FETCH response: everything between the untagged
/// `* n FETCH` opener and the closing `)` line.
fn fetch_payload(lines: &[String]) -> Option<String> {
    if lines.len() < 3 {
        return None;
    }
    Some(lines[1..lines.len() - 1].concat())
}
