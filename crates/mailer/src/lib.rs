//! Background mail delivery.
//!
//! Controllers push [`MailJob`]s onto a [`MailQueue`] and return immediately;
//! a single worker task renders each job and hands it to a [`Mailer`].

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{
    domain::DeliveryId,
    protocol::{DeliverymanContact, RecipientSummary},
};
use thiserror::Error;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()>;
}

/// Writes every mail to the log instead of a transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        info!(
            from = %mail.from,
            to = %mail.to,
            subject = %mail.subject,
            body = %mail.body,
            "mail dispatched"
        );
        Ok(())
    }
}

/// Keeps sent mails in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl MemoryMailer {
    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        self.sent.lock().await.push(mail.clone());
        Ok(())
    }
}

/// Tells the courier that a delivery assigned to them was cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationMail {
    pub delivery_id: DeliveryId,
    pub deliveryman: Option<DeliverymanContact>,
    pub recipient: Option<RecipientSummary>,
    pub product: String,
}

impl CancellationMail {
    pub const KEY: &'static str = "CancellationMail";

    /// `None` when the delivery has no courier to write to.
    pub fn render(&self, from: &str) -> Option<OutgoingMail> {
        let deliveryman = self.deliveryman.as_ref()?;
        let recipient = self
            .recipient
            .as_ref()
            .map(|r| r.name.as_str())
            .unwrap_or("the recipient");

        let body = format!(
            "Hello {name},\n\n\
             Delivery #{id} of \"{product}\" to {recipient} has been cancelled.\n\
             Please do not pick up or drop off this order.\n",
            name = deliveryman.name,
            id = self.delivery_id.0,
            product = self.product,
        );

        Some(OutgoingMail {
            from: from.to_string(),
            to: format!("{} <{}>", deliveryman.name, deliveryman.email),
            subject: "Delivery cancelled".to_string(),
            body,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "key", content = "data")]
pub enum MailJob {
    #[serde(rename = "CancellationMail")]
    Cancellation(CancellationMail),
}

impl MailJob {
    pub fn key(&self) -> &'static str {
        match self {
            MailJob::Cancellation(_) => CancellationMail::KEY,
        }
    }

    fn render(&self, from: &str) -> Option<OutgoingMail> {
        match self {
            MailJob::Cancellation(mail) => mail.render(from),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MailQueueConfig {
    pub from_address: String,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for MailQueueConfig {
    fn default() -> Self {
        Self {
            from_address: "Delivery Team <noreply@delivery.local>".into(),
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("mail queue worker has stopped")]
    Closed,
}

#[derive(Clone)]
pub struct MailQueue {
    tx: mpsc::UnboundedSender<MailJob>,
}

impl MailQueue {
    /// Spawns the worker. It runs until every `MailQueue` clone is dropped,
    /// after draining jobs already queued.
    pub fn start(mailer: Arc<dyn Mailer>, config: MailQueueConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(rx, mailer, config));
        (Self { tx }, worker)
    }

    pub fn enqueue(&self, job: MailJob) -> Result<(), QueueError> {
        let key = job.key();
        self.tx.send(job).map_err(|_| QueueError::Closed)?;
        info!(job = key, "mail job queued");
        Ok(())
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<MailJob>,
    mailer: Arc<dyn Mailer>,
    config: MailQueueConfig,
) {
    while let Some(job) = rx.recv().await {
        process_job(mailer.as_ref(), &config, &job).await;
    }
    info!("mail queue closed; worker exiting");
}

/// Returns whether the mail went out.
async fn process_job(mailer: &dyn Mailer, config: &MailQueueConfig, job: &MailJob) -> bool {
    let Some(mail) = job.render(&config.from_address) else {
        warn!(job = job.key(), "mail job has no addressee; skipping");
        return false;
    };

    let max_attempts = config.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match mailer.send(&mail).await {
            Ok(()) => {
                info!(job = job.key(), to = %mail.to, attempt, "mail job processed");
                return true;
            }
            Err(error) if attempt < max_attempts => {
                warn!(job = job.key(), attempt, %error, "mail send failed; retrying");
                tokio::time::sleep(config.retry_delay).await;
            }
            Err(error) => {
                error!(job = job.key(), attempt, %error, "mail send failed; giving up");
            }
        }
    }
    false
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
