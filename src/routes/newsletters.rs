use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};

use crate::curator::Curator;
use crate::digest::{compose, DigestSender};
use crate::dispatch::{DigestJob, DispatchError, RunReport};
use crate::domain::article::Article;
use crate::routes::StatusMessage;
use crate::store::{StoreError, SubscriptionStore};
use crate::utils::error_chain_fmt;

#[derive(serde::Serialize)]
pub struct SendSummary {
    pub message: String,
    #[serde(flatten)]
    pub report: RunReport,
}

#[derive(serde::Serialize)]
pub struct Preview {
    pub subject: String,
    pub articles: Vec<Article>,
    pub html: String,
    pub text: String,
}

#[derive(serde::Serialize)]
pub struct NewsCheck {
    pub success: bool,
    pub articles: Vec<Article>,
}

#[derive(serde::Serialize)]
pub struct EmailCheck {
    pub success: bool,
}

#[derive(thiserror::Error)]
pub enum PublishNewsletterError {
    #[error("A newsletter is already being sent.")]
    Busy,
    #[error("Failed to send the newsletter.")]
    StoreError(#[source] StoreError),
}

impl std::fmt::Debug for PublishNewsletterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<DispatchError> for PublishNewsletterError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::AlreadyRunning => PublishNewsletterError::Busy,
            DispatchError::Store(err) => PublishNewsletterError::StoreError(err),
        }
    }
}

impl From<StoreError> for PublishNewsletterError {
    fn from(err: StoreError) -> Self {
        PublishNewsletterError::StoreError(err)
    }
}

impl ResponseError for PublishNewsletterError {
    fn status_code(&self) -> StatusCode {
        match self {
            PublishNewsletterError::Busy => StatusCode::CONFLICT,
            PublishNewsletterError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            PublishNewsletterError::Busy => "A newsletter is already being sent.",
            PublishNewsletterError::StoreError(_) => "Error sending newsletter",
        };

        HttpResponse::build(self.status_code()).json(StatusMessage::new(message))
    }
}

#[tracing::instrument(name = "Sending the digest on demand", skip(job))]
pub async fn handle_send_newsletter(
    job: web::Data<DigestJob>,
) -> Result<HttpResponse, PublishNewsletterError> {
    let report = job.run().await?;

    let message = match report {
        RunReport::NoSubscribers => String::from("No active subscribers to send to."),
        RunReport::NoArticles => String::from("No articles found, nothing was sent."),
        RunReport::Delivered { sent, failed } => {
            format!("Newsletter sent to {} subscribers, {} failed.", sent, failed)
        }
    };

    Ok(HttpResponse::Ok().json(SendSummary { message, report }))
}

#[tracing::instrument(name = "Previewing the digest", skip(store, curator, job))]
pub async fn handle_preview_newsletter(
    store: web::Data<SubscriptionStore>,
    curator: web::Data<Curator>,
    job: web::Data<DigestJob>,
) -> Result<HttpResponse, PublishNewsletterError> {
    let art_forms = store.list_active_art_forms().await?;
    let articles = curator.curate(&art_forms).await;
    let body = compose(&articles, None, "#");

    Ok(HttpResponse::Ok().json(Preview {
        subject: job.subject().to_string(),
        articles,
        html: body.html,
        text: body.text,
    }))
}

#[tracing::instrument(name = "Checking the news source", skip(store, curator))]
pub async fn handle_test_news(
    store: web::Data<SubscriptionStore>,
    curator: web::Data<Curator>,
) -> Result<HttpResponse, PublishNewsletterError> {
    let art_forms = store.list_active_art_forms().await?;
    let articles = curator.curate(&art_forms).await;

    Ok(HttpResponse::Ok().json(NewsCheck {
        success: true,
        articles,
    }))
}

#[tracing::instrument(name = "Checking the mail transport", skip(sender))]
pub async fn handle_test_email(sender: web::Data<DigestSender>) -> HttpResponse {
    let success = sender.test_connection().await;

    HttpResponse::Ok().json(EmailCheck { success })
}
