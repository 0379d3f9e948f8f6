//! Gmail REST transport. The bearer token is acquired out-of-band
//! (OAuth consent flow) and handed in through configuration.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{MailTransport, OutgoingMessage, ServiceError};

const GMAIL_SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";
const SERVICE: &str = "mail";

#[derive(Debug, Serialize)]
struct SendRequest {
    raw: String,
}

pub struct GmailTransport {
    client: Client,
    access_token: String,
    sender: Option<String>,
    send_url: String,
}

impl GmailTransport {
    pub fn new(access_token: String, sender: Option<String>) -> Result<Self, ServiceError> {
        Self::with_send_url(access_token, sender, GMAIL_SEND_URL.to_string())
    }

    pub fn with_send_url(
        access_token: String,
        sender: Option<String>,
        send_url: String,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;
        Ok(Self {
            client,
            access_token,
            sender,
            send_url,
        })
    }
}

#[async_trait]
impl MailTransport for GmailTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), ServiceError> {
        let raw = URL_SAFE.encode(render_rfc822(self.sender.as_deref(), message));

        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(&self.access_token)
            .json(&SendRequest { raw })
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(SERVICE, status.as_u16(), text));
        }

        debug!("Gmail accepted message to {}", message.to);
        Ok(())
    }
}

/// Renders a plain-text RFC 822 message.
fn render_rfc822(sender: Option<&str>, message: &OutgoingMessage) -> String {
    let mut out = String::new();
    if let Some(sender) = sender {
        out.push_str(&format!("From: {}\r\n", header_value(sender)));
    }
    out.push_str(&format!("To: {}\r\n", header_value(&message.to)));
    out.push_str(&format!("Subject: {}\r\n", encode_subject(&message.subject)));
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str("Content-Type: text/plain; charset=\"UTF-8\"\r\n");
    out.push_str("Content-Transfer-Encoding: 8bit\r\n\r\n");
    out.push_str(&message.body);
    out
}

/// Header values may not carry line breaks.
fn header_value(value: &str) -> String {
    value.replace(['\r', '\n'], " ").trim().to_string()
}

/// RFC 2047 encoded-word for non-ASCII subjects.
fn encode_subject(subject: &str) -> String {
    let subject = header_value(subject);
    if subject.is_ascii() {
        subject
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(subject.as_bytes()))
    }
}
