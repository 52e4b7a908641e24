use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};

use crate::domain::new_subscriber::{NewSubscriber, NewSubscriberBody};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::routes::StatusMessage;
use crate::store::{StoreError, SubscriptionStore};
use crate::utils::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Failed to store the subscriber.")]
    StoreError(#[source] StoreError),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<StoreError> for SubscribeError {
    fn from(err: StoreError) -> Self {
        if err.is_validation() {
            SubscribeError::ValidationError(err.to_string())
        } else {
            SubscribeError::StoreError(err)
        }
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscribeError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SubscribeError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            SubscribeError::ValidationError(message) => message.clone(),
            SubscribeError::StoreError(_) => String::from("Something went wrong, please try again."),
        };

        HttpResponse::build(self.status_code()).json(StatusMessage::new(message))
    }
}

#[tracing::instrument(
    name = "Creating a new subscriber handler",
    skip(body, store),
    fields(
        subscriber_email = %body.email,
        art_forms = ?body.art_forms
    )
)]
pub async fn handle_create_subscription(
    body: web::Json<NewSubscriberBody>,
    store: web::Data<SubscriptionStore>,
) -> Result<HttpResponse, SubscribeError> {
    let new_subscriber: NewSubscriber = body
        .into_inner()
        .try_into()
        .map_err(SubscribeError::ValidationError)?;

    let upserted = store.upsert_subscriber(&new_subscriber).await?;

    let message = if upserted.existed {
        "Welcome back! Your art form preferences have been updated."
    } else {
        "Welcome! Your first cultural digest is on its way."
    };

    Ok(HttpResponse::Ok().json(StatusMessage::new(message)))
}

#[tracing::instrument(name = "Unsubscribe handler", skip(store))]
pub async fn handle_unsubscribe(
    email: web::Path<String>,
    store: web::Data<SubscriptionStore>,
) -> Result<HttpResponse, SubscribeError> {
    // A malformed address cannot belong to anyone.
    let found = match SubscriberEmail::parse(email.into_inner()) {
        Ok(email) => store.deactivate(&email).await?,
        Err(_) => false,
    };

    if found {
        Ok(HttpResponse::Ok().json(StatusMessage::new("Unsubscribed successfully!")))
    } else {
        Ok(HttpResponse::NotFound().json(StatusMessage::new("Email not found!")))
    }
}
