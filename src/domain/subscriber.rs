use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::preferences::Preferences;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_name::SubscriberName;

#[derive(Debug, Clone, serde::Serialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub name: Option<SubscriberName>,
    pub preferences: Preferences,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
