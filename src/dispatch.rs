use tokio::sync::Mutex;

use crate::curator::Curator;
use crate::digest::DigestSender;
use crate::domain::send_status::SendStatus;
use crate::store::{StoreError, SubscriptionStore};
use crate::utils::error_chain_fmt;

/// What a digest run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunReport {
    NoSubscribers,
    NoArticles,
    Delivered { sent: usize, failed: usize },
}

#[derive(thiserror::Error)]
pub enum DispatchError {
    #[error("A digest run is already in progress.")]
    AlreadyRunning,
    #[error("Failed to access the subscription store.")]
    Store(#[from] StoreError),
}

impl std::fmt::Debug for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Sends the daily digest to every active subscriber. Shared by the scheduler
/// and the manual send endpoint; the run lock keeps their runs from
/// overlapping.
pub struct DigestJob {
    store: SubscriptionStore,
    curator: Curator,
    sender: DigestSender,
    subject: String,
    run_lock: Mutex<()>,
}

impl DigestJob {
    pub fn new(
        store: SubscriptionStore,
        curator: Curator,
        sender: DigestSender,
        subject: String,
    ) -> Self {
        Self {
            store,
            curator,
            sender,
            subject,
            run_lock: Mutex::new(()),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[tracing::instrument(name = "Run the digest", skip(self))]
    pub async fn run(&self) -> Result<RunReport, DispatchError> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| DispatchError::AlreadyRunning)?;

        tracing::info!("Starting digest run");

        let subscribers = self.store.list_active().await?;
        if subscribers.is_empty() {
            tracing::info!("No active subscribers found");
            return Ok(RunReport::NoSubscribers);
        }

        let art_forms = self.store.list_active_art_forms().await?;
        let articles = self.curator.curate(&art_forms).await;
        if articles.is_empty() {
            tracing::error!("No articles found for the digest");
            return Ok(RunReport::NoArticles);
        }

        let mut sent = 0;
        let mut failed = 0;

        for subscriber in &subscribers {
            let status = match self
                .sender
                .send(
                    &subscriber.email,
                    &self.subject,
                    &articles,
                    subscriber.name.as_ref(),
                )
                .await
            {
                Ok(()) => {
                    sent += 1;
                    SendStatus::Sent
                }
                Err(err) => {
                    tracing::error!(
                        error = ?err,
                        "Failed to send the digest to {}",
                        subscriber.email
                    );
                    failed += 1;
                    SendStatus::Failed
                }
            };

            self.store
                .record_send(subscriber.id, &articles, &self.subject, status)
                .await?;
        }

        tracing::info!("Digest sent to {} subscribers, {} failed", sent, failed);

        Ok(RunReport::Delivered { sent, failed })
    }
}
