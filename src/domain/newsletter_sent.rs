use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::article::Article;
use crate::domain::send_status::SendStatus;

/// One delivery attempt of a digest to one subscriber.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NewsletterSent {
    pub id: Uuid,
    pub subscriber_id: Uuid,
    pub articles: Vec<Article>,
    pub subject: String,
    pub status: SendStatus,
    pub sent_at: DateTime<Utc>,
}
