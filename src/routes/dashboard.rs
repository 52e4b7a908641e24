use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};

use crate::domain::art_form::ArtForm;
use crate::domain::newsletter_sent::NewsletterSent;
use crate::domain::subscriber::Subscriber;
use crate::routes::StatusMessage;
use crate::store::{StoreError, SubscriptionStore};
use crate::utils::error_chain_fmt;

const RECENT_NEWSLETTERS: i64 = 5;

#[derive(serde::Serialize)]
pub struct Dashboard {
    pub active_subscribers: i64,
    pub recent_newsletters: Vec<NewsletterSent>,
    pub art_forms: Vec<ArtForm>,
}

#[derive(serde::Serialize)]
pub struct SettingsOverview {
    pub subscribers: Vec<Subscriber>,
    pub art_forms: Vec<ArtForm>,
}

#[derive(thiserror::Error)]
#[error("Failed to load the overview.")]
pub struct OverviewError(#[from] StoreError);

impl std::fmt::Debug for OverviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for OverviewError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(StatusMessage::new("Something went wrong, please try again."))
    }
}

#[tracing::instrument(name = "Dashboard handler", skip(store))]
pub async fn handle_dashboard(
    store: web::Data<SubscriptionStore>,
) -> Result<HttpResponse, OverviewError> {
    let dashboard = Dashboard {
        active_subscribers: store.count_active().await?,
        recent_newsletters: store.recent_sends(RECENT_NEWSLETTERS).await?,
        art_forms: store.list_active_art_forms().await?,
    };

    Ok(HttpResponse::Ok().json(dashboard))
}

#[tracing::instrument(name = "Settings handler", skip(store))]
pub async fn handle_settings(
    store: web::Data<SubscriptionStore>,
) -> Result<HttpResponse, OverviewError> {
    let settings = SettingsOverview {
        subscribers: store.list_active().await?,
        art_forms: store.list_art_forms().await?,
    };

    Ok(HttpResponse::Ok().json(settings))
}
