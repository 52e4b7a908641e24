use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use uuid::Uuid;

use crate::domain::art_form::{NewArtForm, NewArtFormBody};
use crate::routes::StatusMessage;
use crate::store::{StoreError, SubscriptionStore};
use crate::utils::error_chain_fmt;

#[derive(thiserror::Error)]
pub enum ArtFormError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Failed to update the art forms.")]
    StoreError(#[source] StoreError),
}

impl std::fmt::Debug for ArtFormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<StoreError> for ArtFormError {
    fn from(err: StoreError) -> Self {
        if err.is_validation() {
            ArtFormError::ValidationError(err.to_string())
        } else {
            ArtFormError::StoreError(err)
        }
    }
}

impl ResponseError for ArtFormError {
    fn status_code(&self) -> StatusCode {
        match self {
            ArtFormError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ArtFormError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ArtFormError::ValidationError(message) => message.clone(),
            ArtFormError::StoreError(_) => String::from("Something went wrong, please try again."),
        };

        HttpResponse::build(self.status_code()).json(StatusMessage::new(message))
    }
}

#[tracing::instrument(name = "Add art form handler", skip(body, store), fields(art_form = %body.name))]
pub async fn handle_add_art_form(
    body: web::Json<NewArtFormBody>,
    store: web::Data<SubscriptionStore>,
) -> Result<HttpResponse, ArtFormError> {
    let new_art_form: NewArtForm = body
        .into_inner()
        .try_into()
        .map_err(ArtFormError::ValidationError)?;

    let art_form = store.add_art_form(&new_art_form).await?;

    Ok(HttpResponse::Created().json(art_form))
}

#[tracing::instrument(name = "Deactivate art form handler", skip(store))]
pub async fn handle_deactivate_art_form(
    id: web::Path<Uuid>,
    store: web::Data<SubscriptionStore>,
) -> Result<HttpResponse, ArtFormError> {
    if store.deactivate_art_form(id.into_inner()).await? {
        Ok(HttpResponse::Ok().json(StatusMessage::new("Art form removed from collection!")))
    } else {
        Ok(HttpResponse::NotFound().json(StatusMessage::new("Art form not found!")))
    }
}
