use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::config::{DatabaseSettings, Settings};
use crate::curator::Curator;
use crate::digest::DigestSender;
use crate::dispatch::DigestJob;
use crate::email_client::{EmailClient, Mailer};
use crate::news_client::NewsClient;
use crate::routes::{
    handle_add_art_form, handle_create_subscription, handle_dashboard, handle_deactivate_art_form,
    handle_preview_newsletter, handle_send_newsletter, handle_settings, handle_test_email,
    handle_test_news, handle_unsubscribe, health_check,
};
use crate::scheduler::{self, SchedulerHandle};
use crate::store::SubscriptionStore;

pub struct Application {
    port: u16,
    server: Server,
    store: SubscriptionStore,
    scheduler: Option<SchedulerHandle>,
}

impl Application {
    /// Builds the application with the SMTP transport described by `config`.
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let sender_email = config.email_client.get_sender_email()?;
        let email_client = EmailClient::new(
            &config.email_client.host,
            config.email_client.port,
            config.email_client.username.clone(),
            config.email_client.password.clone(),
            sender_email,
            config.email_client.sender_name.clone(),
            Some(config.email_client.get_timeout()),
        )?;

        Self::build_with_mailer(config, Arc::new(email_client)).await
    }

    pub async fn build_with_mailer(
        config: Settings,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, anyhow::Error> {
        config.validate()?;

        let db_pool = get_connection_db_pool(&config.database).await?;
        sqlx::migrate!("./migrations").run(&db_pool).await?;

        let store = SubscriptionStore::new(db_pool);
        store.seed_default_art_forms().await?;

        let news_client = NewsClient::new(
            config.news_api.base_url.clone(),
            config.news_api.api_key.clone(),
            Some(config.news_api.get_timeout()),
        )?;
        let curator = Curator::new(news_client);
        let sender = DigestSender::new(mailer, config.get_app_base_url()?);
        let job = Arc::new(DigestJob::new(
            store.clone(),
            curator.clone(),
            sender.clone(),
            config.digest.subject.clone(),
        ));

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(listener, store.clone(), job.clone(), curator, sender)?;

        let scheduler = if config.digest.scheduler_enabled {
            Some(scheduler::start(config.digest.get_schedule()?, job))
        } else {
            None
        };

        Ok(Self {
            port,
            server,
            store,
            scheduler,
        })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn store(&self) -> SubscriptionStore {
        self.store.clone()
    }

    /// Serves requests until the server shuts down, then stops the scheduler.
    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        let result = self.server.await;

        if let Some(scheduler) = self.scheduler {
            scheduler.stop().await;
        }

        result
    }
}

pub fn run(
    listener: TcpListener,
    store: SubscriptionStore,
    job: Arc<DigestJob>,
    curator: Curator,
    sender: DigestSender,
) -> Result<Server, std::io::Error> {
    let store = web::Data::new(store);
    let job = web::Data::from(job);
    let curator = web::Data::new(curator);
    let sender = web::Data::new(sender);

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/", web::get().to(handle_dashboard))
            .route("/health_check", web::get().to(health_check))
            .route("/settings", web::get().to(handle_settings))
            .route("/subscriptions", web::post().to(handle_create_subscription))
            .route("/unsubscribe/{email}", web::get().to(handle_unsubscribe))
            .route("/art_forms", web::post().to(handle_add_art_form))
            .route("/art_forms/{id}", web::delete().to(handle_deactivate_art_form))
            .route("/newsletters/send", web::post().to(handle_send_newsletter))
            .route("/newsletters/preview", web::get().to(handle_preview_newsletter))
            .route("/api/test_news", web::get().to(handle_test_news))
            .route("/api/test_email", web::get().to(handle_test_email))
            .app_data(store.clone())
            .app_data(job.clone())
            .app_data(curator.clone())
            .app_data(sender.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub async fn get_connection_db_pool(config: &DatabaseSettings) -> Result<SqlitePool, anyhow::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(config.get_max_connections())
        .acquire_timeout(std::time::Duration::from_secs(2))
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(config.get_db_options()?)
        .await?;

    Ok(pool)
}
