use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::llm_client::LanguageModel;
use crate::models::{Delivery, DeliveryStatus, Prospect, SenderProfile};
use crate::outreach::compose;
use crate::outreach::prompts::{OUTREACH_PROMPT_TEMPLATE, OUTREACH_SYSTEM};
use crate::resolution::validation::is_valid_email;
use crate::services::{MailTransport, OutgoingMessage, ServiceError};
use crate::throttle::Pacer;

/// Per-send options shared by bulk and single sends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendOptions {
    #[serde(default)]
    pub dry_run: bool,
    /// Guide text for the model. Placeholders are filled before prompting.
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
}

/// Drafts messages with the model and hands them to the mail transport.
pub struct OutreachAgent {
    model: Arc<dyn LanguageModel>,
    transport: Option<Arc<dyn MailTransport>>,
    pacer: Arc<dyn Pacer>,
}

impl OutreachAgent {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        transport: Option<Arc<dyn MailTransport>>,
        pacer: Arc<dyn Pacer>,
    ) -> Self {
        Self {
            model,
            transport,
            pacer,
        }
    }

    /// True when real (non-dry-run) sends are possible.
    pub fn can_transmit(&self) -> bool {
        self.transport.is_some()
    }

    /// Drafts the full body for one prospect. Fails on an empty draft.
    pub async fn generate(
        &self,
        prospect: &Prospect,
        sender: &SenderProfile,
        template: Option<&str>,
    ) -> Result<String, ServiceError> {
        info!("Generating email for {}", prospect.full_name());

        let job_title_line = prospect
            .job_title
            .as_deref()
            .map(|t| format!("Their role: {t}."))
            .unwrap_or_default();
        let sender_block = sender_block(sender);
        let template_block = template
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| {
                format!(
                    "Use this template as a guide:\n{}\n",
                    compose::substitute(t, prospect, sender)
                )
            })
            .unwrap_or_default();

        let prompt = OUTREACH_PROMPT_TEMPLATE
            .replace("{full_name}", &prospect.full_name())
            .replace("{first_name}", &prospect.first_name)
            .replace("{company_name}", &prospect.company_name)
            .replace("{job_title_line}", &job_title_line)
            .replace("{sender_block}", &sender_block)
            .replace("{template_block}", &template_block);

        let draft = self.model.complete(&prompt, OUTREACH_SYSTEM).await?;
        if compose::strip_salutation(&draft).is_empty() {
            return Err(ServiceError::Decode {
                service: "llm",
                message: "generated message was empty after the greeting".to_string(),
            });
        }

        Ok(compose::finish_body(&draft, prospect, sender))
    }

    /// Generates and (unless dry run) transmits one message. Never fails: the
    /// outcome is recorded in the returned `Delivery`.
    pub async fn generate_and_send(
        &self,
        index: usize,
        prospect: &Prospect,
        sender: &SenderProfile,
        options: &SendOptions,
    ) -> Delivery {
        let mut delivery = Delivery {
            index,
            email: prospect.email.clone(),
            status: DeliveryStatus::Skipped,
            detail: String::new(),
            dry_run: options.dry_run,
            subject: None,
            body: None,
        };

        let Some(to) = prospect.email.as_deref().map(str::trim) else {
            delivery.detail = "no email address".to_string();
            return delivery;
        };
        if !is_valid_email(to) {
            error!("Invalid email address: {}", to);
            delivery.status = DeliveryStatus::Failed;
            delivery.detail = format!("invalid email address: {to}");
            return delivery;
        }

        let body = match self
            .generate(prospect, sender, options.template.as_deref())
            .await
        {
            Ok(body) => body,
            Err(e) => {
                error!("Error generating email for {}: {e}", prospect.full_name());
                delivery.status = DeliveryStatus::Failed;
                delivery.detail = format!("generation failed: {e}");
                return delivery;
            }
        };
        let subject = compose::subject(options.subject.as_deref(), prospect, sender);
        delivery.subject = Some(subject.clone());
        delivery.body = Some(body.clone());

        if options.dry_run {
            info!("[DRY RUN] Would send email to {}", to);
            info!("Subject: {}", subject);
            info!("Body:\n{}", body);
            delivery.status = DeliveryStatus::Sent;
            delivery.detail = "dry run: not transmitted".to_string();
            return delivery;
        }

        let Some(transport) = self.transport.as_ref() else {
            delivery.status = DeliveryStatus::Failed;
            delivery.detail = "no mail transport configured".to_string();
            return delivery;
        };

        let message = OutgoingMessage {
            to: to.to_string(),
            subject,
            body,
        };
        match transport.send(&message).await {
            Ok(()) => {
                info!("Sent to: {} ({})", prospect.full_name(), to);
                delivery.status = DeliveryStatus::Sent;
                delivery.detail = "sent".to_string();
            }
            Err(e) => {
                warn!("Send to {} failed: {e}", to);
                delivery.status = DeliveryStatus::Failed;
                delivery.detail = e.to_string();
            }
        }
        delivery
    }

    /// Waits out one pacing delay. Returns false if cancelled while waiting.
    pub async fn pace(&self, cancel: &CancellationToken) -> bool {
        let delay = self.pacer.next_delay();
        info!("Waiting {:.1}s before the next send...", delay.as_secs_f64());
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = cancel.cancelled() => false,
        }
    }
}

fn sender_block(sender: &SenderProfile) -> String {
    let mut lines = Vec::new();
    if !sender.name.trim().is_empty() {
        lines.push(format!("The sender is {}.", sender.name.trim()));
    }
    if !sender.skills.trim().is_empty() {
        lines.push(format!("Their skills: {}.", sender.skills.trim()));
    }
    if !sender.goal.trim().is_empty() {
        lines.push(format!("They are looking for: {}.", sender.goal.trim()));
    }
    lines.join("\n")
}
