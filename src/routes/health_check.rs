use actix_web::{HttpRequest, HttpResponse, Responder};

/// Liveness probe; answers without touching the database or the mailer.
#[tracing::instrument(name = "Health Check handler")]
pub async fn health_check(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok()
}
