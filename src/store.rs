use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::art_form::{default_art_forms, ArtForm, ArtFormName, NewArtForm};
use crate::domain::article::Article;
use crate::domain::new_subscriber::NewSubscriber;
use crate::domain::newsletter_sent::NewsletterSent;
use crate::domain::preferences::Preferences;
use crate::domain::send_status::SendStatus;
use crate::domain::subscriber::Subscriber;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_name::SubscriberName;
use crate::utils::error_chain_fmt;

/// Subscribers, art forms and the log of sent newsletters, backed by SQLite.
///
/// Every public operation commits on its own, so the web handlers and the
/// digest job can share one store.
#[derive(Clone)]
pub struct SubscriptionStore {
    pool: SqlitePool,
}

/// Result of a subscribe submission. `existed` tells a re-subscription apart
/// from a brand new subscriber.
#[derive(Debug)]
pub struct UpsertedSubscriber {
    pub subscriber: Subscriber,
    pub existed: bool,
}

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("{0} is not an active art form")]
    UnknownArtForm(String),
    #[error("An art form named {0} already exists")]
    DuplicateArtForm(String),
    #[error("Stored record is invalid: {0}")]
    InvalidRecord(String),
    #[error("Failed to execute a database query.")]
    Database(#[from] sqlx::Error),
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl StoreError {
    /// Errors caused by the caller's input rather than by the database.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StoreError::UnknownArtForm(_) | StoreError::DuplicateArtForm(_)
        )
    }
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    name: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ArtFormRow {
    id: Uuid,
    name: String,
    keywords: Json<Vec<String>>,
    active: bool,
    description: Option<String>,
}

#[derive(sqlx::FromRow)]
struct NewsletterSentRow {
    id: Uuid,
    subscriber_id: Uuid,
    articles: Json<Vec<Article>>,
    subject: String,
    status: String,
    sent_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct PreferenceRow {
    subscriber_id: Uuid,
    name: String,
}

impl SubscriberRow {
    fn into_subscriber(self, preferences: Preferences) -> Result<Subscriber, StoreError> {
        let email = SubscriberEmail::parse(self.email).map_err(StoreError::InvalidRecord)?;
        let name = SubscriberName::parse_optional(self.name).map_err(StoreError::InvalidRecord)?;

        Ok(Subscriber {
            id: self.id,
            email,
            name,
            preferences,
            active: self.active,
            created_at: self.created_at,
        })
    }
}

impl TryFrom<ArtFormRow> for ArtForm {
    type Error = StoreError;

    fn try_from(row: ArtFormRow) -> Result<Self, Self::Error> {
        Ok(ArtForm {
            id: row.id,
            name: ArtFormName::parse(row.name).map_err(StoreError::InvalidRecord)?,
            keywords: row.keywords.0,
            active: row.active,
            description: row.description,
        })
    }
}

impl TryFrom<NewsletterSentRow> for NewsletterSent {
    type Error = StoreError;

    fn try_from(row: NewsletterSentRow) -> Result<Self, Self::Error> {
        Ok(NewsletterSent {
            id: row.id,
            subscriber_id: row.subscriber_id,
            articles: row.articles.0,
            subject: row.subject,
            status: SendStatus::parse(row.status).map_err(StoreError::InvalidRecord)?,
            sent_at: row.sent_at,
        })
    }
}

impl SubscriptionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(
        name = "Upsert a subscriber",
        skip(self, new_subscriber),
        fields(subscriber_email = %new_subscriber.email)
    )]
    pub async fn upsert_subscriber(
        &self,
        new_subscriber: &NewSubscriber,
    ) -> Result<UpsertedSubscriber, StoreError> {
        let mut transaction = self.pool.begin().await?;
        let art_form_ids =
            resolve_active_art_forms(&mut transaction, &new_subscriber.preferences).await?;
        let name = new_subscriber.name.as_ref().map(|name| name.as_ref());

        let existing: Option<SubscriberRow> = sqlx::query_as(
            r#"
            SELECT id, email, name, active, created_at
            FROM subscribers
            WHERE email = $1
            "#,
        )
        .bind(new_subscriber.email.as_ref())
        .fetch_optional(&mut *transaction)
        .await?;

        let existed = existing.is_some();
        let (id, created_at) = match existing {
            Some(row) => {
                sqlx::query("UPDATE subscribers SET name = $1, active = 1 WHERE id = $2")
                    .bind(name)
                    .bind(row.id)
                    .execute(&mut *transaction)
                    .await?;
                (row.id, row.created_at)
            }
            None => {
                let id = Uuid::new_v4();
                let created_at = Utc::now();
                sqlx::query(
                    r#"
                    INSERT INTO subscribers (id, email, name, active, created_at)
                    VALUES ($1, $2, $3, 1, $4)
                    "#,
                )
                .bind(id)
                .bind(new_subscriber.email.as_ref())
                .bind(name)
                .bind(created_at)
                .execute(&mut *transaction)
                .await?;
                (id, created_at)
            }
        };

        sqlx::query("DELETE FROM subscriber_art_forms WHERE subscriber_id = $1")
            .bind(id)
            .execute(&mut *transaction)
            .await?;

        for art_form_id in art_form_ids {
            sqlx::query(
                "INSERT INTO subscriber_art_forms (subscriber_id, art_form_id) VALUES ($1, $2)",
            )
            .bind(id)
            .bind(art_form_id)
            .execute(&mut *transaction)
            .await?;
        }

        transaction.commit().await?;

        Ok(UpsertedSubscriber {
            subscriber: Subscriber {
                id,
                email: new_subscriber.email.clone(),
                name: new_subscriber.name.clone(),
                preferences: new_subscriber.preferences.clone(),
                active: true,
                created_at,
            },
            existed,
        })
    }

    /// Flips the subscriber to inactive. Returns whether the email was known.
    #[tracing::instrument(name = "Deactivate a subscriber", skip(self))]
    pub async fn deactivate(&self, email: &SubscriberEmail) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE subscribers SET active = 0 WHERE email = $1")
            .bind(email.as_ref())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Find a subscriber by email", skip(self))]
    pub async fn find_subscriber(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscriber>, StoreError> {
        let row: Option<SubscriberRow> = sqlx::query_as(
            "SELECT id, email, name, active, created_at FROM subscribers WHERE email = $1",
        )
        .bind(email.as_ref())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let preferences = self.load_subscriber_preferences(row.id).await?;
                row.into_subscriber(preferences).map(Some)
            }
            None => Ok(None),
        }
    }

    #[tracing::instrument(name = "List active subscribers", skip(self))]
    pub async fn list_active(&self) -> Result<Vec<Subscriber>, StoreError> {
        let rows: Vec<SubscriberRow> = sqlx::query_as(
            r#"
            SELECT id, email, name, active, created_at
            FROM subscribers
            WHERE active = 1
            ORDER BY created_at, email
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        let mut preferences = self.load_active_preferences().await?;

        rows.into_iter()
            .map(|row| {
                let subscriber_preferences = preferences.remove(&row.id).unwrap_or_default();
                row.into_subscriber(subscriber_preferences)
            })
            .collect()
    }

    pub async fn count_active(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscribers WHERE active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Appends one row to the send log. Earlier rows are never touched.
    #[tracing::instrument(
        name = "Record a newsletter send",
        skip(self, articles, subject),
        fields(status = %status.as_ref())
    )]
    pub async fn record_send(
        &self,
        subscriber_id: Uuid,
        articles: &[Article],
        subject: &str,
        status: SendStatus,
    ) -> Result<NewsletterSent, StoreError> {
        let id = Uuid::new_v4();
        let sent_at = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO newsletters_sent (id, subscriber_id, articles, subject, status, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(subscriber_id)
        .bind(Json(articles))
        .bind(subject)
        .bind(status.as_ref())
        .bind(sent_at)
        .execute(&self.pool)
        .await?;

        Ok(NewsletterSent {
            id,
            subscriber_id,
            articles: articles.to_vec(),
            subject: subject.to_string(),
            status,
            sent_at,
        })
    }

    /// Newest first.
    pub async fn recent_sends(&self, limit: i64) -> Result<Vec<NewsletterSent>, StoreError> {
        let rows: Vec<NewsletterSentRow> = sqlx::query_as(
            r#"
            SELECT id, subscriber_id, articles, subject, status, sent_at
            FROM newsletters_sent
            ORDER BY sent_at DESC, rowid DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(NewsletterSent::try_from).collect()
    }

    pub async fn list_art_forms(&self) -> Result<Vec<ArtForm>, StoreError> {
        let rows: Vec<ArtFormRow> = sqlx::query_as(
            "SELECT id, name, keywords, active, description FROM art_forms ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ArtForm::try_from).collect()
    }

    pub async fn list_active_art_forms(&self) -> Result<Vec<ArtForm>, StoreError> {
        let rows: Vec<ArtFormRow> = sqlx::query_as(
            r#"
            SELECT id, name, keywords, active, description
            FROM art_forms
            WHERE active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ArtForm::try_from).collect()
    }

    #[tracing::instrument(
        name = "Add an art form",
        skip(self, new_art_form),
        fields(art_form = %new_art_form.name.as_ref())
    )]
    pub async fn add_art_form(&self, new_art_form: &NewArtForm) -> Result<ArtForm, StoreError> {
        let mut transaction = self.pool.begin().await?;
        let art_form = insert_art_form(&mut transaction, new_art_form).await?;
        transaction.commit().await?;

        Ok(art_form)
    }

    /// Soft delete: the art form stays resolvable for past newsletters.
    #[tracing::instrument(name = "Deactivate an art form", skip(self))]
    pub async fn deactivate_art_form(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE art_forms SET active = 0 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Inserts the seven classic art forms when the table is empty and returns
    /// how many were added.
    #[tracing::instrument(name = "Seed default art forms", skip(self))]
    pub async fn seed_default_art_forms(&self) -> Result<usize, StoreError> {
        let mut transaction = self.pool.begin().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM art_forms")
            .fetch_one(&mut *transaction)
            .await?;

        if count > 0 {
            return Ok(0);
        }

        let defaults = default_art_forms();
        for art_form in &defaults {
            insert_art_form(&mut transaction, art_form).await?;
        }
        transaction.commit().await?;

        tracing::info!("Added {} default art forms", defaults.len());

        Ok(defaults.len())
    }

    /// Preferences of every active subscriber, keyed by subscriber id.
    async fn load_active_preferences(&self) -> Result<HashMap<Uuid, Preferences>, StoreError> {
        let rows: Vec<PreferenceRow> = sqlx::query_as(
            r#"
            SELECT links.subscriber_id, art_forms.name
            FROM subscriber_art_forms AS links
            JOIN art_forms ON art_forms.id = links.art_form_id
            JOIN subscribers ON subscribers.id = links.subscriber_id
            WHERE subscribers.active = 1
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut names: HashMap<Uuid, Vec<ArtFormName>> = HashMap::new();
        for row in rows {
            let name = ArtFormName::parse(row.name).map_err(StoreError::InvalidRecord)?;
            names.entry(row.subscriber_id).or_default().push(name);
        }

        Ok(names
            .into_iter()
            .map(|(id, names)| (id, names.into_iter().collect()))
            .collect())
    }

    async fn load_subscriber_preferences(
        &self,
        subscriber_id: Uuid,
    ) -> Result<Preferences, StoreError> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT art_forms.name
            FROM subscriber_art_forms AS links
            JOIN art_forms ON art_forms.id = links.art_form_id
            WHERE links.subscriber_id = $1
            "#,
        )
        .bind(subscriber_id)
        .fetch_all(&self.pool)
        .await?;

        Preferences::parse(names).map_err(StoreError::InvalidRecord)
    }
}

async fn resolve_active_art_forms(
    transaction: &mut Transaction<'_, Sqlite>,
    preferences: &Preferences,
) -> Result<Vec<Uuid>, StoreError> {
    let mut ids = Vec::with_capacity(preferences.len());

    for name in preferences.iter() {
        let id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM art_forms WHERE name = $1 AND active = 1")
                .bind(name.as_ref())
                .fetch_optional(&mut **transaction)
                .await?;

        match id {
            Some(id) => ids.push(id),
            None => return Err(StoreError::UnknownArtForm(name.as_ref().to_string())),
        }
    }

    Ok(ids)
}

async fn insert_art_form(
    transaction: &mut Transaction<'_, Sqlite>,
    new_art_form: &NewArtForm,
) -> Result<ArtForm, StoreError> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO art_forms (id, name, keywords, active, description)
        VALUES ($1, $2, $3, 1, $4)
        "#,
    )
    .bind(id)
    .bind(new_art_form.name.as_ref())
    .bind(Json(&new_art_form.keywords))
    .bind(new_art_form.description.as_deref())
    .execute(&mut **transaction)
    .await
    .map_err(|err| {
        let is_duplicate =
            matches!(&err, sqlx::Error::Database(db_err) if db_err.is_unique_violation());
        if is_duplicate {
            StoreError::DuplicateArtForm(new_art_form.name.as_ref().to_string())
        } else {
            StoreError::Database(err)
        }
    })?;

    Ok(ArtForm {
        id,
        name: new_art_form.name.clone(),
        keywords: new_art_form.keywords.clone(),
        active: true,
        description: new_art_form.description.clone(),
    })
}
