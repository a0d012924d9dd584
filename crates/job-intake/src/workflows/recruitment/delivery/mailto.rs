use std::io;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use async_trait::async_trait;
use tracing::{info, warn};

use super::super::compose::OutboundMessage;
use super::{DeliveryAck, DeliveryError, DeliveryGateway, DeliveryStrategy, Verification};

/// Hands a `mailto:` URI to whatever opens mail on this machine.
pub trait MailClientLauncher: Send + Sync {
    fn launch(&self, uri: &str) -> io::Result<()>;
}

/// Which launcher a mailto gateway hands its URI to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MailClientKind {
    #[default]
    System,
    LogOnly,
}

impl MailClientKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "system" | "desktop" => Some(Self::System),
            "log" | "log_only" | "headless" => Some(Self::LogOnly),
            _ => None,
        }
    }
}

/// Opens the URI with the platform's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMailClient;

impl MailClientLauncher for SystemMailClient {
    fn launch(&self, uri: &str) -> io::Result<()> {
        spawn_reaped(opener(uri)).map(|_| ())
    }
}

/// Spawns the opener and waits for it on a background thread so the exited
/// process is always reaped.
pub(crate) fn spawn_reaped(
    mut command: Command,
) -> io::Result<JoinHandle<io::Result<ExitStatus>>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    thread::Builder::new()
        .name("mail-client-opener".to_string())
        .spawn(move || {
            let status = child.wait();
            if let Err(err) = &status {
                warn!(error = %err, "mail client opener could not be awaited");
            }
            status
        })
}

#[cfg(target_os = "macos")]
fn opener(uri: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(uri);
    command
}

#[cfg(target_os = "windows")]
fn opener(uri: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", "", uri]);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener(uri: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(uri);
    command
}

/// Records the URI in the log instead of opening anything. Used on headless
/// hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyLauncher;

impl MailClientLauncher for LogOnlyLauncher {
    fn launch(&self, uri: &str) -> io::Result<()> {
        info!(uri_length = uri.len(), "mailto handoff recorded without a mail client");
        Ok(())
    }
}

/// `mailto:{recipient}?subject=..&body=..` with both query values
/// percent-encoded.
pub fn mailto_uri(recipient: &str, subject: &str, body: &str) -> String {
    format!(
        "mailto:{recipient}?subject={}&body={}",
        urlencoding::encode(subject),
        urlencoding::encode(body)
    )
}

/// Local mail-client handoff. Attachments cannot travel this way, so they are
/// named in the body and reported back on the ack.
pub struct MailtoGateway<L = SystemMailClient> {
    launcher: L,
}

impl<L: MailClientLauncher> MailtoGateway<L> {
    pub fn new(launcher: L) -> Self {
        Self { launcher }
    }

    pub fn uri_for(&self, message: &OutboundMessage) -> String {
        let mut body = message.body.clone();
        let labels = message.attachment_labels();
        if !labels.is_empty() {
            body.push_str(&format!(
                "\nAttachments not included (please send separately): {}\n",
                labels.join(", ")
            ));
        }
        mailto_uri(&message.to, &message.subject, &body)
    }
}

#[async_trait]
impl<L: MailClientLauncher> DeliveryGateway for MailtoGateway<L> {
    fn strategy(&self) -> DeliveryStrategy {
        DeliveryStrategy::Mailto
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryAck, DeliveryError> {
        let uri = self.uri_for(message);
        if let Err(err) = self.launcher.launch(&uri) {
            warn!(error = %err, "mail client could not be opened");
        }

        let undelivered_attachments = message.attachment_labels();
        info!(
            subject = %message.subject,
            undelivered = undelivered_attachments.len(),
            verified = false,
            "message handed to local mail client"
        );
        Ok(DeliveryAck {
            strategy: DeliveryStrategy::Mailto,
            verification: Verification::Unverified,
            chunks: 1,
            undelivered_attachments,
        })
    }
}
